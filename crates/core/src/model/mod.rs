mod course;
mod ids;
mod learner;
mod lesson;
mod progress_record;

pub use ids::{CourseId, LearnerId, LessonId, ParseIdError};

pub use course::{Course, CourseError};
pub use learner::{
    Credentials, Learner, LearnerError, LearnerProfile, LearnerRole, normalize_email,
};
pub use lesson::{Lesson, LessonError, order_lessons};
pub use progress_record::ProgressRecord;
