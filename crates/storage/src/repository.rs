use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    Course, CourseId, LearnerId, LearnerProfile, Lesson, LessonId, ProgressRecord,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of an identity-provider account.
///
/// The password is never stored; only a salted hash produced by the identity
/// provider. `email` is stored normalized.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub learner_id: LearnerId,
    pub email: String,
    pub password_salt: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRecord")
            .field("learner_id", &self.learner_id)
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Repository contract for course reference data.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another course already uses the name.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Resolve a course name to its id.
    ///
    /// Returns `Ok(None)` when no course has that name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_course_id_by_name(&self, name: &str) -> Result<Option<CourseId>, StorageError>;

    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// List all courses ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;
}

#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or update a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the order key is already taken in the course.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// List a course's lessons ascending by order key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// All progress records for a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Insert or replace the record keyed by `(learner_id, lesson_id)`.
    ///
    /// Writing the same record twice leaves exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;
}

#[async_trait]
pub trait LearnerRepository: Send + Sync {
    /// Insert a learner profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a profile already exists for the learner.
    async fn insert_profile(&self, profile: &LearnerProfile) -> Result<(), StorageError>;

    /// Fetch a learner profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_profile(&self, id: LearnerId) -> Result<Option<LearnerProfile>, StorageError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    async fn insert_account(&self, account: &AccountRecord) -> Result<(), StorageError>;

    /// Find an account by normalized email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
    progress: Arc<Mutex<HashMap<(LearnerId, LessonId), ProgressRecord>>>,
    profiles: Arc<Mutex<HashMap<LearnerId, LearnerProfile>>>,
    accounts: Arc<Mutex<HashMap<String, AccountRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        if guard
            .values()
            .any(|c| c.name() == course.name() && c.id() != course.id())
        {
            return Err(StorageError::Conflict);
        }
        guard.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course_id_by_name(&self, name: &str) -> Result<Option<CourseId>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        let name = name.trim();
        Ok(guard.values().find(|c| c.name() == name).map(Course::id))
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        let mut courses: Vec<Course> = guard.values().cloned().collect();
        courses.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(courses)
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        if guard.values().any(|l| {
            l.course_id() == lesson.course_id()
                && l.order_index() == lesson.order_index()
                && l.id() != lesson.id()
        }) {
            return Err(StorageError::Conflict);
        }
        guard.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        let mut lessons: Vec<Lesson> = guard
            .values()
            .filter(|l| l.course_id() == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(Lesson::order_index);
        Ok(lessons)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn list_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        let mut records: Vec<ProgressRecord> = guard
            .values()
            .filter(|r| r.learner_id == learner_id)
            .copied()
            .collect();
        records.sort_by_key(|r| r.lesson_id);
        Ok(records)
    }

    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert(record.key(), *record);
        Ok(())
    }
}

#[async_trait]
impl LearnerRepository for InMemoryRepository {
    async fn insert_profile(&self, profile: &LearnerProfile) -> Result<(), StorageError> {
        let mut guard = self.profiles.lock().map_err(poisoned)?;
        if guard.contains_key(&profile.learner_id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(profile.learner_id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: LearnerId) -> Result<Option<LearnerProfile>, StorageError> {
        let guard = self.profiles.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }
}

#[async_trait]
impl AccountRepository for InMemoryRepository {
    async fn insert_account(&self, account: &AccountRecord) -> Result<(), StorageError> {
        let mut guard = self.accounts.lock().map_err(poisoned)?;
        if guard.contains_key(&account.email) {
            return Err(StorageError::Conflict);
        }
        guard.insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountRecord>, StorageError> {
        let guard = self.accounts.lock().map_err(poisoned)?;
        Ok(guard.get(email).cloned())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub learners: Arc<dyn LearnerRepository>,
    pub accounts: Arc<dyn AccountRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            courses: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            learners: Arc::new(repo.clone()),
            accounts: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::Learner;

    fn build_course(id: u64, name: &str) -> Course {
        Course::new(CourseId::new(id), name, None).unwrap()
    }

    fn build_lesson(id: u64, course: CourseId, order_index: i32) -> Lesson {
        Lesson::new(LessonId::new(id), course, format!("Lesson {id}"), "", order_index).unwrap()
    }

    #[tokio::test]
    async fn resolves_course_by_trimmed_name() {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&build_course(1, "Web Development"))
            .await
            .unwrap();

        let id = repo.get_course_id_by_name(" Web Development ").await.unwrap();
        assert_eq!(id, Some(CourseId::new(1)));
        assert_eq!(repo.get_course_id_by_name("Cooking").await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_duplicate_course_names() {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&build_course(1, "Design")).await.unwrap();
        let err = repo
            .upsert_course(&build_course(2, "Design"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn lists_lessons_by_order_key() {
        let repo = InMemoryRepository::new();
        let course = CourseId::new(1);
        repo.upsert_lesson(&build_lesson(1, course, 30)).await.unwrap();
        repo.upsert_lesson(&build_lesson(2, course, 10)).await.unwrap();
        repo.upsert_lesson(&build_lesson(3, CourseId::new(2), 20))
            .await
            .unwrap();

        let lessons = repo.list_lessons(course).await.unwrap();
        let ids: Vec<u64> = lessons.iter().map(|l| l.id().value()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn upsert_progress_keeps_one_record_per_pair() {
        let repo = InMemoryRepository::new();
        let learner = LearnerId::generate();
        let record = ProgressRecord::completed(learner, LessonId::new(1));

        repo.upsert_progress(&ProgressRecord::new(learner, LessonId::new(1), false))
            .await
            .unwrap();
        repo.upsert_progress(&record).await.unwrap();
        repo.upsert_progress(&record).await.unwrap();

        let records = repo.list_progress(learner).await.unwrap();
        assert_eq!(records, vec![record]);
    }

    #[tokio::test]
    async fn profile_insert_is_single_shot() {
        let repo = InMemoryRepository::new();
        let learner = Learner::new(LearnerId::generate(), "a@b.io").unwrap();
        let profile = LearnerProfile::student(&learner, "Web Development");

        repo.insert_profile(&profile).await.unwrap();
        assert!(matches!(
            repo.insert_profile(&profile).await.unwrap_err(),
            StorageError::Conflict
        ));
        assert_eq!(
            repo.get_profile(learner.id()).await.unwrap(),
            Some(profile)
        );
    }
}
