use std::fmt;
use std::io::{BufRead, Write};

use course_core::model::Credentials;
use services::{
    AppServices, Clock, DashboardView, ProgressTracker, ServicesConfig, Step, config,
};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidSessionTtl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSessionTtl { raw } => {
                write!(f, "invalid --session-ttl value: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- courses   [--db <sqlite_url>]");
    eprintln!(
        "  cargo run -p app -- register  --email <email> --password <pw> --course <name> [--db <sqlite_url>]"
    );
    eprintln!(
        "  cargo run -p app -- dashboard --email <email> --password <pw> [--db <sqlite_url>] [--session-ttl <secs>]"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {}", config::DEFAULT_DB_URL);
    eprintln!("  --session-ttl {}", config::DEFAULT_SESSION_TTL_SECS);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TRACKER_DB_URL, TRACKER_SESSION_TTL_SECS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Courses,
    Register,
    Dashboard,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "courses" => Some(Self::Courses),
            "register" => Some(Self::Register),
            "dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    session_ttl_secs: i64,
    email: Option<String>,
    password: Option<String>,
    course: Option<String>,
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("TRACKER_DB_URL")
            .map_or_else(|| config::DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut session_ttl_secs = match env("TRACKER_SESSION_TTL_SECS") {
            Some(raw) => parse_ttl(raw)?,
            None => config::DEFAULT_SESSION_TTL_SECS,
        };
        let mut email = None;
        let mut password = None;
        let mut course = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--session-ttl" => {
                    session_ttl_secs = parse_ttl(require_value(args, "--session-ttl")?)?;
                }
                "--email" => email = Some(require_value(args, "--email")?),
                "--password" => password = Some(require_value(args, "--password")?),
                "--course" => course = Some(require_value(args, "--course")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            session_ttl_secs,
            email,
            password,
            course,
        })
    }

    fn services_config(&self) -> ServicesConfig {
        ServicesConfig::new(self.db_url.clone(), self.session_ttl_secs)
    }

    fn credentials_fields(&self) -> Result<(&str, &str), ArgsError> {
        let email = self
            .email
            .as_deref()
            .ok_or(ArgsError::MissingFlag { flag: "--email" })?;
        let password = self
            .password
            .as_deref()
            .ok_or(ArgsError::MissingFlag { flag: "--password" })?;
        Ok((email, password))
    }
}

fn parse_ttl(raw: String) -> Result<i64, ArgsError> {
    match raw.trim().parse::<i64>() {
        Ok(secs) if secs >= 0 => Ok(secs),
        _ => Err(ArgsError::InvalidSessionTtl { raw }),
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn render(view: &DashboardView) {
    println!();
    println!("== {} ==", view.course_name);
    match (&view.lesson_title, &view.lesson_content) {
        (Some(title), Some(content)) => {
            println!(
                "Lesson {} of {}: {title}",
                view.display_position(),
                view.total_lessons
            );
            println!("{content}");
        }
        _ => println!("This course has no lessons yet."),
    }
    println!("Progress: {}%", view.percentage);
    if view.course_completed {
        println!("Course completed!");
    }

    let mut actions = vec![format!("next ({})", view.primary_action.label())];
    if view.can_go_back {
        actions.push("prev".into());
    }
    actions.push("logout".into());
    actions.push("quit".into());
    println!("[{}]", actions.join(" | "));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DashboardInput {
    Next,
    Prev,
    Logout,
    Quit,
    Unknown,
}

impl DashboardInput {
    fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "next" | "n" | "complete" | "c" => Self::Next,
            "prev" | "p" | "back" | "b" => Self::Prev,
            "logout" => Self::Logout,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Unknown,
        }
    }
}

async fn run_dashboard(mut tracker: ProgressTracker) -> Result<(), Box<dyn std::error::Error>> {
    tracker.initialize_from_session().await?;

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if let Some(view) = tracker.view() {
            render(&view);
        }
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            return Ok(());
        };

        // Failed actions are reported and the dashboard stays open.
        match DashboardInput::parse(&line) {
            DashboardInput::Next => match tracker.advance().await {
                Ok(Step::Finished) => println!("All lessons complete."),
                Ok(_) => {}
                Err(err) => eprintln!("error: {err}"),
            },
            DashboardInput::Prev => match tracker.retreat() {
                Ok(true) => {}
                Ok(false) => println!("Already on the first lesson."),
                Err(err) => eprintln!("error: {err}"),
            },
            DashboardInput::Logout => {
                tracker.logout().await?;
                println!("Signed out.");
                return Ok(());
            }
            DashboardInput::Quit => return Ok(()),
            DashboardInput::Unknown => println!("Unknown command: {}", line.trim()),
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let first = argv.next();

    let cmd = match first.as_deref() {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    tracing::debug!(db = %parsed.db_url, ?cmd, "starting");

    // Open + migrate SQLite in the binary glue; services never touch the filesystem.
    prepare_sqlite_file(&parsed.db_url)?;
    let services =
        AppServices::new_sqlite(&parsed.services_config(), Clock::default_clock()).await?;

    match cmd {
        Command::Courses => {
            for course in services.registration().list_courses().await? {
                match course.description() {
                    Some(description) => println!("{} - {description}", course.name()),
                    None => println!("{}", course.name()),
                }
            }
            Ok(())
        }
        Command::Register => {
            let (email, password) = parsed.credentials_fields()?;
            let course = parsed.course.as_deref().unwrap_or_default();
            let learner = services
                .registration()
                .register(email, password, course)
                .await?;
            println!("Registered {} for {}", learner.email(), course.trim());
            Ok(())
        }
        Command::Dashboard => {
            let (email, password) = parsed.credentials_fields()?;
            let credentials = Credentials::new(email, password)?;
            services
                .identity()
                .sign_in_with_password(&credentials)
                .await?;
            run_dashboard(services.tracker()).await
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str], env: &[(&str, &str)]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_owned());
        Args::parse(&mut iter, |key| {
            env.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_owned())
        })
    }

    #[test]
    fn flags_override_environment() {
        let args = parse(
            &["--db", "sqlite::memory:", "--session-ttl", "60"],
            &[
                ("TRACKER_DB_URL", "sqlite:///tmp/env.db"),
                ("TRACKER_SESSION_TTL_SECS", "5"),
            ],
        )
        .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.session_ttl_secs, 60);
    }

    #[test]
    fn environment_supplies_defaults() {
        let args = parse(&[], &[("TRACKER_SESSION_TTL_SECS", "120")]).unwrap();
        assert!(args.db_url.starts_with("sqlite://"));
        assert!(args.db_url.ends_with("dev.sqlite3"));
        assert_eq!(args.session_ttl_secs, 120);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse(&["--session-ttl", "-1"], &[]),
            Err(ArgsError::InvalidSessionTtl { .. })
        ));
        assert!(matches!(
            parse(&["--email"], &[]),
            Err(ArgsError::MissingValue { flag: "--email" })
        ));
        assert!(matches!(parse(&["--wat"], &[]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/tracker.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/tracker.db"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }

    #[test]
    fn dashboard_input_accepts_aliases() {
        assert_eq!(DashboardInput::parse(" Next "), DashboardInput::Next);
        assert_eq!(DashboardInput::parse("complete"), DashboardInput::Next);
        assert_eq!(DashboardInput::parse("p"), DashboardInput::Prev);
        assert_eq!(DashboardInput::parse("logout"), DashboardInput::Logout);
        assert_eq!(DashboardInput::parse("q"), DashboardInput::Quit);
        assert_eq!(DashboardInput::parse("dance"), DashboardInput::Unknown);
    }
}
