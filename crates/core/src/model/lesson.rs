use thiserror::Error;

use crate::model::ids::{CourseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson {lesson} belongs to course {found}, expected {expected}")]
    ForeignCourse {
        lesson: LessonId,
        expected: CourseId,
        found: CourseId,
    },

    #[error("order key {order_index} is used by more than one lesson")]
    DuplicateOrderKey { order_index: i32 },
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single lesson within a course.
///
/// `order_index` is the lesson's position key. Keys must be unique within a
/// course but need not be contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    title: String,
    content: String,
    order_index: i32,
}

impl Lesson {
    /// Creates a new lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the trimmed title is empty.
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        content: impl Into<String>,
        order_index: i32,
    ) -> Result<Self, LessonError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(LessonError::EmptyTitle);
        }

        Ok(Self {
            id,
            course_id,
            title,
            content: content.into(),
            order_index,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn order_index(&self) -> i32 {
        self.order_index
    }
}

/// Sorts lessons ascending by order key and checks they form a strict order
/// within `course_id`.
///
/// # Errors
///
/// Returns `LessonError::ForeignCourse` if a lesson belongs to another course,
/// or `LessonError::DuplicateOrderKey` if two lessons share an order key.
pub fn order_lessons(
    course_id: CourseId,
    mut lessons: Vec<Lesson>,
) -> Result<Vec<Lesson>, LessonError> {
    if let Some(foreign) = lessons.iter().find(|l| l.course_id != course_id) {
        return Err(LessonError::ForeignCourse {
            lesson: foreign.id,
            expected: course_id,
            found: foreign.course_id,
        });
    }

    lessons.sort_by_key(Lesson::order_index);

    if let Some(pair) = lessons
        .windows(2)
        .find(|pair| pair[0].order_index == pair[1].order_index)
    {
        return Err(LessonError::DuplicateOrderKey {
            order_index: pair[0].order_index,
        });
    }

    Ok(lessons)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: u64, order_index: i32) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            CourseId::new(1),
            format!("Lesson {id}"),
            "body",
            order_index,
        )
        .unwrap()
    }

    #[test]
    fn lesson_rejects_blank_title() {
        let err = Lesson::new(LessonId::new(1), CourseId::new(1), "  ", "body", 1).unwrap_err();
        assert_eq!(err, LessonError::EmptyTitle);
    }

    #[test]
    fn order_lessons_sorts_by_order_key_with_gaps() {
        let ordered =
            order_lessons(CourseId::new(1), vec![lesson(3, 30), lesson(1, 5), lesson(2, 10)])
                .unwrap();

        let ids: Vec<u64> = ordered.iter().map(|l| l.id().value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn order_lessons_rejects_duplicate_keys() {
        let err = order_lessons(CourseId::new(1), vec![lesson(1, 2), lesson(2, 2)]).unwrap_err();
        assert_eq!(err, LessonError::DuplicateOrderKey { order_index: 2 });
    }

    #[test]
    fn order_lessons_rejects_other_courses() {
        let stray = Lesson::new(LessonId::new(9), CourseId::new(2), "Stray", "", 1).unwrap();
        let err = order_lessons(CourseId::new(1), vec![lesson(1, 1), stray]).unwrap_err();
        assert!(matches!(err, LessonError::ForeignCourse { .. }));
    }
}
