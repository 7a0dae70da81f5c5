use thiserror::Error;

use crate::model::ids::CourseId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course name cannot be empty")]
    EmptyName,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course learners can enroll in.
///
/// Courses are reference data: the tracker only reads them. The name is the
/// key learners select at registration, so it is stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    name: String,
    description: Option<String>,
}

impl Course {
    /// Creates a new course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyName` if the trimmed name is empty.
    pub fn new(
        id: CourseId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, CourseError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(CourseError::EmptyName);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            name,
            description,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_trims_name_and_description() {
        let course = Course::new(
            CourseId::new(1),
            "  Web Development ",
            Some("  HTML, CSS and JS ".into()),
        )
        .unwrap();

        assert_eq!(course.name(), "Web Development");
        assert_eq!(course.description(), Some("HTML, CSS and JS"));
    }

    #[test]
    fn course_rejects_blank_name() {
        let err = Course::new(CourseId::new(1), "   ", None).unwrap_err();
        assert_eq!(err, CourseError::EmptyName);
    }

    #[test]
    fn course_filters_empty_description() {
        let course = Course::new(CourseId::new(1), "Data Science", Some(" ".into())).unwrap();
        assert_eq!(course.description(), None);
    }
}
