use crate::model::ids::{LearnerId, LessonId};

/// Durable fact that a learner has (or has not) completed a lesson.
///
/// Stores key records by `(learner_id, lesson_id)`; writing the same pair
/// twice replaces the earlier row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressRecord {
    pub learner_id: LearnerId,
    pub lesson_id: LessonId,
    pub completed: bool,
}

impl ProgressRecord {
    #[must_use]
    pub fn new(learner_id: LearnerId, lesson_id: LessonId, completed: bool) -> Self {
        Self {
            learner_id,
            lesson_id,
            completed,
        }
    }

    /// A record marking `lesson_id` as completed.
    #[must_use]
    pub fn completed(learner_id: LearnerId, lesson_id: LessonId) -> Self {
        Self::new(learner_id, lesson_id, true)
    }

    #[must_use]
    pub fn key(&self) -> (LearnerId, LessonId) {
        (self.learner_id, self.lesson_id)
    }
}
