use thiserror::Error;

use crate::model::ids::LearnerId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearnerError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("unknown learner role: {0}")]
    UnknownRole(String),
}

//
// ─── LEARNER ───────────────────────────────────────────────────────────────────
//

/// Identity of a signed-in learner as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Learner {
    id: LearnerId,
    email: String,
}

impl Learner {
    /// # Errors
    ///
    /// Returns `LearnerError::MissingField` if the email is blank.
    pub fn new(id: LearnerId, email: impl Into<String>) -> Result<Self, LearnerError> {
        let email = normalize_email(&email.into());
        if email.is_empty() {
            return Err(LearnerError::MissingField("email"));
        }
        Ok(Self { id, email })
    }

    #[must_use]
    pub fn id(&self) -> LearnerId {
        self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Emails are compared trimmed and lowercased.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

//
// ─── CREDENTIALS ───────────────────────────────────────────────────────────────
//

/// Email and password pair submitted to sign up or sign in.
///
/// Only presence is checked here; the identity provider owns everything else.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// # Errors
    ///
    /// Returns `LearnerError::MissingField` if the email or password is blank.
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, LearnerError> {
        let email = normalize_email(&email.into());
        if email.is_empty() {
            return Err(LearnerError::MissingField("email"));
        }
        let password = password.into();
        if password.trim().is_empty() {
            return Err(LearnerError::MissingField("password"));
        }
        Ok(Self { email, password })
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

//
// ─── PROFILE ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum LearnerRole {
    #[default]
    Student,
}

impl LearnerRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LearnerRole::Student => "student",
        }
    }

    /// # Errors
    ///
    /// Returns `LearnerError::UnknownRole` for unrecognized values.
    pub fn parse(raw: &str) -> Result<Self, LearnerError> {
        match raw {
            "student" => Ok(LearnerRole::Student),
            other => Err(LearnerError::UnknownRole(other.to_owned())),
        }
    }
}

/// Application-side learner row written at registration.
///
/// `course_selected` holds the course name the learner picked; the dashboard
/// resolves it to a course when the tracker starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerProfile {
    pub learner_id: LearnerId,
    pub email: String,
    pub course_selected: Option<String>,
    pub role: LearnerRole,
}

impl LearnerProfile {
    #[must_use]
    pub fn student(learner: &Learner, course_selected: impl Into<String>) -> Self {
        let course = course_selected.into().trim().to_owned();
        Self {
            learner_id: learner.id(),
            email: learner.email().to_owned(),
            course_selected: Some(course).filter(|c| !c.is_empty()),
            role: LearnerRole::Student,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
