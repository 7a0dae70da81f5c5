use course_core::CourseProgress;
use course_core::model::LessonId;

/// What the dashboard's main button does for the current lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Next,
    Complete,
}

impl PrimaryAction {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Next => "Next",
            Self::Complete => "Complete",
        }
    }
}

/// Presentation-agnostic snapshot of the tracker.
///
/// Holds no formatting; the driver decides how to render the percentage and
/// position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub course_name: String,
    pub lesson_id: Option<LessonId>,
    pub lesson_title: Option<String>,
    pub lesson_content: Option<String>,
    /// Zero-based pointer into the ordered lessons.
    pub position: usize,
    pub total_lessons: usize,
    pub percentage: u8,
    pub course_completed: bool,
    pub can_go_back: bool,
    pub primary_action: PrimaryAction,
}

impl DashboardView {
    #[must_use]
    pub fn from_progress(progress: &CourseProgress) -> Self {
        let lesson = progress.current_lesson();
        let course_completed = progress.is_course_completed();
        let primary_action = if progress.is_last() {
            PrimaryAction::Complete
        } else {
            PrimaryAction::Next
        };

        Self {
            course_name: progress.course().name().to_owned(),
            lesson_id: lesson.map(|l| l.id()),
            lesson_title: lesson.map(|l| l.title().to_owned()),
            lesson_content: lesson.map(|l| l.content().to_owned()),
            position: progress.current_index(),
            total_lessons: progress.total_lessons(),
            percentage: if course_completed {
                100
            } else {
                progress.percentage()
            },
            course_completed,
            can_go_back: !progress.is_first(),
            primary_action,
        }
    }

    /// One-based position for display, 0 when the course has no lessons.
    #[must_use]
    pub fn display_position(&self) -> usize {
        if self.total_lessons == 0 {
            0
        } else {
            self.position + 1
        }
    }
}
