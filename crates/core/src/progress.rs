use thiserror::Error;

use crate::model::{
    Course, LearnerId, Lesson, LessonError, LessonId, ProgressRecord, order_lessons,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    InvalidLessonOrder(#[from] LessonError),

    #[error("progress record for lesson {lesson} does not belong to this course or learner")]
    ForeignRecord { lesson: LessonId },
}

//
// ─── STEP ──────────────────────────────────────────────────────────────────────
//

/// Outcome of moving forward after the current lesson is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Pointer moved to the given index.
    Advanced(usize),
    /// Pointer was on the last lesson; the course is now complete.
    Finished,
    /// No lessons to move through.
    Stayed,
}

//
// ─── COURSE PROGRESS ───────────────────────────────────────────────────────────
//

/// Sequential lesson progress for one learner in one course.
///
/// Pure state: callers persist completions first and only then apply them
/// here, so the in-memory record set never holds an unconfirmed write.
///
/// Invariants:
/// - lessons are ordered strictly ascending by order key
/// - records only reference lessons of this course and this learner, one per lesson
/// - `current < lessons.len()` whenever lessons is non-empty, otherwise 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    learner_id: LearnerId,
    course: Course,
    lessons: Vec<Lesson>,
    records: Vec<ProgressRecord>,
    current: usize,
    course_completed: bool,
}

impl CourseProgress {
    /// Builds progress state from the course's lessons and the learner's records.
    ///
    /// Records for other learners or for lessons outside the course are ignored.
    /// The pointer starts at the first lesson without a completed record, or at
    /// 0 if every lesson is complete.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidLessonOrder` if the lessons do not form a
    /// strict order within the course.
    pub fn new(
        learner_id: LearnerId,
        course: Course,
        lessons: Vec<Lesson>,
        records: Vec<ProgressRecord>,
    ) -> Result<Self, ProgressError> {
        let lessons = order_lessons(course.id(), lessons)?;

        let mut kept: Vec<ProgressRecord> = Vec::with_capacity(records.len());
        for record in records {
            if record.learner_id != learner_id
                || !lessons.iter().any(|l| l.id() == record.lesson_id)
            {
                continue;
            }
            match kept.iter_mut().find(|r| r.lesson_id == record.lesson_id) {
                Some(existing) => *existing = record,
                None => kept.push(record),
            }
        }

        let current = lessons
            .iter()
            .position(|lesson| !is_lesson_completed(&kept, lesson.id()))
            .unwrap_or(0);

        Ok(Self {
            learner_id,
            course,
            lessons,
            records: kept,
            current,
            course_completed: false,
        })
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn records(&self) -> &[ProgressRecord] {
        &self.records
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_lesson(&self) -> Option<&Lesson> {
        self.lessons.get(self.current)
    }

    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_course_completed(&self) -> bool {
        self.course_completed
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    /// True when the pointer is on the last lesson (or there are no lessons).
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.lessons.len()
    }

    #[must_use]
    pub fn is_completed(&self, lesson_id: LessonId) -> bool {
        is_lesson_completed(&self.records, lesson_id)
    }

    /// Number of lessons with a completed record.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.records.iter().filter(|r| r.completed).count()
    }

    /// Rounded completion percentage in `0..=100`.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        completion_percentage(self.completed_count(), self.lessons.len())
    }

    /// The record that must be persisted to complete the current lesson.
    ///
    /// Returns `None` when there is no current lesson or it is already complete.
    #[must_use]
    pub fn pending_completion(&self) -> Option<ProgressRecord> {
        let lesson = self.current_lesson()?;
        if self.is_completed(lesson.id()) {
            return None;
        }
        Some(ProgressRecord::completed(self.learner_id, lesson.id()))
    }

    /// Applies a record the store has already accepted.
    ///
    /// Replaces any existing record for the same lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ForeignRecord` if the record is for another
    /// learner or a lesson outside this course.
    pub fn apply_record(&mut self, record: ProgressRecord) -> Result<(), ProgressError> {
        if record.learner_id != self.learner_id
            || !self.lessons.iter().any(|l| l.id() == record.lesson_id)
        {
            return Err(ProgressError::ForeignRecord {
                lesson: record.lesson_id,
            });
        }

        match self
            .records
            .iter_mut()
            .find(|r| r.lesson_id == record.lesson_id)
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        Ok(())
    }

    /// Moves past the current lesson.
    ///
    /// On the last lesson the pointer stays put and the course is marked
    /// complete; calling again there is harmless.
    pub fn step_forward(&mut self) -> Step {
        if self.lessons.is_empty() {
            return Step::Stayed;
        }
        if self.current + 1 < self.lessons.len() {
            self.current += 1;
            Step::Advanced(self.current)
        } else {
            self.course_completed = true;
            Step::Finished
        }
    }

    /// Moves back one lesson. Returns `false` when already on the first lesson.
    pub fn retreat(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }
}

fn is_lesson_completed(records: &[ProgressRecord], lesson_id: LessonId) -> bool {
    records
        .iter()
        .any(|r| r.lesson_id == lesson_id && r.completed)
}

/// `round(100 * completed / total)` with halves rounded up; 0 when `total` is 0.
#[must_use]
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    let rounded = (200 * completed + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, LessonId};

    fn course() -> Course {
        Course::new(CourseId::new(1), "Web Development", None).unwrap()
    }

    fn lessons(n: u64) -> Vec<Lesson> {
        (1..=n)
            .map(|i| {
                Lesson::new(
                    LessonId::new(i),
                    CourseId::new(1),
                    format!("L{i}"),
                    format!("content {i}"),
                    i32::try_from(i * 10).unwrap(),
                )
                .unwrap()
            })
            .collect()
    }

    fn done(learner: LearnerId, lesson: u64) -> ProgressRecord {
        ProgressRecord::completed(learner, LessonId::new(lesson))
    }

    #[test]
    fn percentage_rounds_half_up_and_handles_empty() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(3, 3), 100);
    }

    #[test]
    fn percentage_stays_in_bounds_for_all_subsets() {
        for total in 0..=12 {
            for completed in 0..=total {
                let pct = completion_percentage(completed, total);
                assert!(pct <= 100);
                if total > 0 {
                    let expected = (100.0 * completed as f64 / total as f64).round() as u8;
                    assert_eq!(pct, expected, "{completed}/{total}");
                }
            }
        }
    }

    #[test]
    fn starts_at_first_incomplete_lesson() {
        let learner = LearnerId::generate();
        let progress = CourseProgress::new(
            learner,
            course(),
            lessons(5),
            vec![done(learner, 1), done(learner, 2)],
        )
        .unwrap();

        assert_eq!(progress.current_index(), 2);
        assert_eq!(progress.percentage(), 40);
    }

    #[test]
    fn starts_at_zero_when_everything_is_complete() {
        let learner = LearnerId::generate();
        let records = (1..=3).map(|i| done(learner, i)).collect();
        let progress = CourseProgress::new(learner, course(), lessons(3), records).unwrap();

        assert_eq!(progress.current_index(), 0);
        assert_eq!(progress.percentage(), 100);
        assert_eq!(progress.pending_completion(), None);
    }

    #[test]
    fn uncompleted_records_do_not_count() {
        let learner = LearnerId::generate();
        let progress = CourseProgress::new(
            learner,
            course(),
            lessons(2),
            vec![ProgressRecord::new(learner, LessonId::new(1), false)],
        )
        .unwrap();

        assert_eq!(progress.current_index(), 0);
        assert_eq!(progress.percentage(), 0);
        assert!(progress.pending_completion().is_some());
    }

    #[test]
    fn ignores_records_outside_course_or_learner() {
        let learner = LearnerId::generate();
        let other = LearnerId::generate();
        let progress = CourseProgress::new(
            learner,
            course(),
            lessons(2),
            vec![done(learner, 99), done(other, 1)],
        )
        .unwrap();

        assert!(progress.records().is_empty());
        assert_eq!(progress.percentage(), 0);
    }

    #[test]
    fn apply_record_replaces_existing_entry() {
        let learner = LearnerId::generate();
        let mut progress = CourseProgress::new(
            learner,
            course(),
            lessons(2),
            vec![ProgressRecord::new(learner, LessonId::new(1), false)],
        )
        .unwrap();

        let record = progress.pending_completion().unwrap();
        progress.apply_record(record).unwrap();
        progress.apply_record(record).unwrap();

        assert_eq!(progress.records().len(), 1);
        assert!(progress.is_completed(LessonId::new(1)));
    }

    #[test]
    fn apply_record_rejects_foreign_lessons() {
        let learner = LearnerId::generate();
        let mut progress = CourseProgress::new(learner, course(), lessons(2), vec![]).unwrap();

        let err = progress.apply_record(done(learner, 42)).unwrap_err();
        assert_eq!(
            err,
            ProgressError::ForeignRecord {
                lesson: LessonId::new(42)
            }
        );
    }

    #[test]
    fn pointer_never_leaves_bounds() {
        let learner = LearnerId::generate();
        let mut progress = CourseProgress::new(learner, course(), lessons(3), vec![]).unwrap();

        assert!(!progress.retreat());
        assert_eq!(progress.current_index(), 0);

        assert_eq!(progress.step_forward(), Step::Advanced(1));
        assert_eq!(progress.step_forward(), Step::Advanced(2));
        assert_eq!(progress.step_forward(), Step::Finished);
        assert_eq!(progress.step_forward(), Step::Finished);
        assert_eq!(progress.current_index(), 2);
        assert!(progress.is_course_completed());

        assert!(progress.retreat());
        assert!(progress.retreat());
        assert!(!progress.retreat());
        assert_eq!(progress.current_index(), 0);
    }

    #[test]
    fn empty_course_is_inert() {
        let learner = LearnerId::generate();
        let mut progress = CourseProgress::new(learner, course(), vec![], vec![]).unwrap();

        assert_eq!(progress.current_lesson(), None);
        assert_eq!(progress.pending_completion(), None);
        assert_eq!(progress.step_forward(), Step::Stayed);
        assert_eq!(progress.percentage(), 0);
        assert!(!progress.is_course_completed());
    }
}
