use thiserror::Error;

use crate::model::{CourseError, LearnerError, LessonError};
use crate::progress::ProgressError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
