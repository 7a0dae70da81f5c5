//! Built-in course catalogue used to seed empty databases.

use course_core::model::{Course, CourseId, Lesson, LessonId};
use thiserror::Error;

use crate::repository::{Storage, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Domain(#[from] course_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A course together with its lessons.
#[derive(Debug, Clone)]
pub struct CourseSeed {
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

const CATALOG: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "Web Development",
        "Master HTML, CSS, and JavaScript to build responsive websites.",
        &[
            (
                "HTML Foundations",
                "Documents, elements and attributes: the structure every page starts from.",
            ),
            (
                "Styling with CSS",
                "Selectors, the box model and responsive layouts with flexbox and grid.",
            ),
            (
                "JavaScript Essentials",
                "Variables, functions and the DOM to make pages interactive.",
            ),
        ],
    ),
    (
        "Data Science",
        "Analyze and visualize data using Python and machine learning.",
        &[
            (
                "Python for Data",
                "Working with lists, dictionaries and notebooks.",
            ),
            (
                "Exploring Datasets",
                "Loading, cleaning and summarizing tabular data.",
            ),
            (
                "Visualization",
                "Charts that answer questions instead of decorating slides.",
            ),
            (
                "Intro to Machine Learning",
                "Training and evaluating a first regression model.",
            ),
        ],
    ),
    (
        "Digital Marketing",
        "Learn SEO, social media marketing, and analytics tools.",
        &[
            (
                "Search Engine Optimization",
                "How pages get discovered and ranked.",
            ),
            (
                "Social Media Campaigns",
                "Planning, scheduling and measuring posts.",
            ),
            (
                "Analytics",
                "Reading traffic reports and tracking conversions.",
            ),
        ],
    ),
];

/// Builds the default catalogue with stable ids.
///
/// Lesson order keys step by 10 so lessons can be inserted between them later.
///
/// # Errors
///
/// Returns `course_core::Error` if an entry fails domain validation.
pub fn default_catalog() -> Result<Vec<CourseSeed>, course_core::Error> {
    let mut seeds = Vec::with_capacity(CATALOG.len());
    let mut next_lesson_id = 1_u64;

    for (course_idx, (name, description, lessons)) in CATALOG.iter().enumerate() {
        let course_id = CourseId::new(course_idx as u64 + 1);
        let course = Course::new(course_id, *name, Some((*description).to_owned()))?;

        let mut built = Vec::with_capacity(lessons.len());
        for (position, (title, content)) in lessons.iter().enumerate() {
            let order_index = i32::try_from((position + 1) * 10).unwrap_or(i32::MAX);
            built.push(Lesson::new(
                LessonId::new(next_lesson_id),
                course_id,
                *title,
                *content,
                order_index,
            )?);
            next_lesson_id += 1;
        }

        seeds.push(CourseSeed {
            course,
            lessons: built,
        });
    }

    Ok(seeds)
}

/// Upserts every course and lesson in `seeds`.
///
/// # Errors
///
/// Returns `SeedError::Storage` if any write fails.
pub async fn seed_catalog(storage: &Storage, seeds: &[CourseSeed]) -> Result<usize, SeedError> {
    let mut lessons = 0;
    for seed in seeds {
        storage.courses.upsert_course(&seed.course).await?;
        for lesson in &seed.lessons {
            storage.lessons.upsert_lesson(lesson).await?;
            lessons += 1;
        }
    }
    Ok(lessons)
}

/// Seeds the default catalogue when no course exists yet.
///
/// Returns `true` if the catalogue was written.
///
/// # Errors
///
/// Returns `SeedError` if the catalogue is invalid or storage fails.
pub async fn ensure_default_catalog(storage: &Storage) -> Result<bool, SeedError> {
    if !storage.courses.list_courses().await?.is_empty() {
        return Ok(false);
    }
    let seeds = default_catalog()?;
    seed_catalog(storage, &seeds).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lessons_are_strictly_ordered() {
        let seeds = default_catalog().unwrap();
        assert_eq!(seeds.len(), 3);
        for seed in &seeds {
            let ordered =
                course_core::model::order_lessons(seed.course.id(), seed.lessons.clone()).unwrap();
            assert_eq!(ordered, seed.lessons);
        }
    }

    #[tokio::test]
    async fn ensure_default_catalog_only_seeds_once() {
        let storage = Storage::in_memory();
        assert!(ensure_default_catalog(&storage).await.unwrap());
        assert!(!ensure_default_catalog(&storage).await.unwrap());

        let id = storage
            .courses
            .get_course_id_by_name("Web Development")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(storage.lessons.list_lessons(id).await.unwrap().len(), 3);
    }
}
