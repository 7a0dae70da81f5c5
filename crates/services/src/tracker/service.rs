use std::sync::Arc;

use course_core::model::{LearnerId, Lesson};
use course_core::{CourseProgress, Step};
use storage::repository::{
    CourseRepository, LearnerRepository, LessonRepository, ProgressRepository, Storage,
};
use tracing::{debug, info, warn};

use super::view::DashboardView;
use crate::error::{AuthError, TrackerError};
use crate::identity::IdentityProvider;

/// Tracks one learner's position through one course.
///
/// Every operation takes `&mut self` and awaits its store call before
/// returning, so operations on one tracker are applied in call order.
/// Completions are written to the store first and applied in memory only
/// once the write succeeds.
///
/// Dropping an in-flight `mark_current_complete`/`advance` future after the
/// store accepted the write leaves that row persisted while this tracker never
/// sees it; the next `initialize` picks it up.
pub struct ProgressTracker {
    identity: Arc<dyn IdentityProvider>,
    courses: Arc<dyn CourseRepository>,
    lessons: Arc<dyn LessonRepository>,
    progress: Arc<dyn ProgressRepository>,
    learners: Arc<dyn LearnerRepository>,
    state: Option<CourseProgress>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        courses: Arc<dyn CourseRepository>,
        lessons: Arc<dyn LessonRepository>,
        progress: Arc<dyn ProgressRepository>,
        learners: Arc<dyn LearnerRepository>,
    ) -> Self {
        Self {
            identity,
            courses,
            lessons,
            progress,
            learners,
            state: None,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::new(
            identity,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.learners),
        )
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    #[must_use]
    pub fn state(&self) -> Option<&CourseProgress> {
        self.state.as_ref()
    }

    /// Load the course's lessons and the learner's progress.
    ///
    /// Any previous state is discarded first, so a failure leaves the tracker
    /// uninitialized.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::CourseNotFound` if no course has that name,
    /// `TrackerError::Storage` if a read fails, and `TrackerError::Progress`
    /// if the lessons share an order key.
    pub async fn initialize(
        &mut self,
        learner_id: LearnerId,
        course_name: &str,
    ) -> Result<(), TrackerError> {
        self.state = None;

        let not_found = || TrackerError::CourseNotFound(course_name.trim().to_owned());
        let course_id = self
            .courses
            .get_course_id_by_name(course_name)
            .await?
            .ok_or_else(not_found)?;
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or_else(not_found)?;

        let lessons = self.lessons.list_lessons(course_id).await?;
        let records = self.progress.list_progress(learner_id).await?;
        let state = CourseProgress::new(learner_id, course, lessons, records)?;

        info!(
            learner = %learner_id,
            course = state.course().name(),
            lessons = state.total_lessons(),
            position = state.current_index(),
            "progress tracker initialized"
        );
        self.state = Some(state);
        Ok(())
    }

    /// Initialize for the signed-in learner's selected course.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Auth` when there is no live session,
    /// `TrackerError::NoCourseSelected` when the learner has no profile or
    /// course, and anything `initialize` returns.
    pub async fn initialize_from_session(&mut self) -> Result<(), TrackerError> {
        self.state = None;

        let learner = self
            .identity
            .current_session()
            .await?
            .ok_or(AuthError::NoSession)?;
        let course_name = self
            .learners
            .get_profile(learner.id())
            .await?
            .and_then(|profile| profile.course_selected)
            .ok_or(TrackerError::NoCourseSelected)?;

        self.initialize(learner.id(), &course_name).await
    }

    #[must_use]
    pub fn current_lesson(&self) -> Option<&Lesson> {
        self.state.as_ref().and_then(CourseProgress::current_lesson)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.as_ref().map_or(0, CourseProgress::current_index)
    }

    /// Rounded completion percentage; 0 when uninitialized or the course is empty.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.state.as_ref().map_or(0, CourseProgress::percentage)
    }

    #[must_use]
    pub fn is_course_completed(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(CourseProgress::is_course_completed)
    }

    /// Mark the current lesson complete.
    ///
    /// Returns `true` if a record was written, `false` if the lesson was
    /// already complete (or there is no lesson). On a failed write local
    /// state is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::NotInitialized` before `initialize`, and
    /// `TrackerError::Storage` if the upsert fails.
    pub async fn mark_current_complete(&mut self) -> Result<bool, TrackerError> {
        let state = self.state.as_mut().ok_or(TrackerError::NotInitialized)?;
        let Some(record) = state.pending_completion() else {
            debug!(position = state.current_index(), "lesson already complete, no write");
            return Ok(false);
        };

        if let Err(err) = self.progress.upsert_progress(&record).await {
            warn!(
                learner = %record.learner_id,
                lesson = %record.lesson_id,
                error = %err,
                "progress write failed"
            );
            return Err(err.into());
        }

        state.apply_record(record)?;
        info!(
            learner = %record.learner_id,
            lesson = %record.lesson_id,
            percentage = state.percentage(),
            "lesson completed"
        );
        Ok(true)
    }

    /// Complete the current lesson and move to the next one.
    ///
    /// On the last lesson the pointer stays and the course is flagged
    /// complete. If the completion write fails nothing moves.
    ///
    /// # Errors
    ///
    /// Same as `mark_current_complete`.
    pub async fn advance(&mut self) -> Result<Step, TrackerError> {
        self.mark_current_complete().await?;

        let state = self.state.as_mut().ok_or(TrackerError::NotInitialized)?;
        let step = state.step_forward();
        match step {
            Step::Advanced(position) => debug!(position, "advanced to next lesson"),
            Step::Finished => info!(
                learner = %state.learner_id(),
                course = state.course().name(),
                "course completed"
            ),
            Step::Stayed => debug!("advance on empty course"),
        }
        Ok(step)
    }

    /// Move back one lesson. Returns `false` on the first lesson.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::NotInitialized` before `initialize`.
    pub fn retreat(&mut self) -> Result<bool, TrackerError> {
        let state = self.state.as_mut().ok_or(TrackerError::NotInitialized)?;
        let moved = state.retreat();
        debug!(moved, position = state.current_index(), "retreat");
        Ok(moved)
    }

    /// Clear all local state and end the identity session.
    ///
    /// State is cleared even if sign-out fails.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Auth` if the identity provider fails to sign out.
    pub async fn logout(&mut self) -> Result<(), TrackerError> {
        if let Some(state) = self.state.take() {
            info!(learner = %state.learner_id(), "progress tracker reset");
        }

        self.identity.sign_out().await.map_err(|err| {
            warn!(error = %err, "sign-out failed after reset");
            TrackerError::from(err)
        })
    }

    /// Read-only snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> Option<DashboardView> {
        self.state.as_ref().map(DashboardView::from_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::Duration;
    use course_core::model::{
        Course, CourseId, Credentials, LearnerProfile, Lesson, LessonId, ProgressRecord,
    };
    use course_core::time::fixed_now;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use storage::repository::{InMemoryRepository, StorageError};

    use crate::Clock;
    use crate::identity::LocalIdentityProvider;

    /// Progress store that can be told to fail writes.
    #[derive(Default)]
    struct FlakyProgress {
        inner: InMemoryRepository,
        fail_writes: AtomicBool,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl ProgressRepository for FlakyProgress {
        async fn list_progress(
            &self,
            learner_id: LearnerId,
        ) -> Result<Vec<ProgressRecord>, StorageError> {
            self.inner.list_progress(learner_id).await
        }

        async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Connection("store unavailable".into()));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.upsert_progress(record).await
        }
    }

    struct Fixture {
        repo: InMemoryRepository,
        progress: Arc<FlakyProgress>,
        identity: Arc<LocalIdentityProvider>,
        tracker: ProgressTracker,
    }

    async fn fixture(lesson_count: u64) -> Fixture {
        let repo = InMemoryRepository::new();
        let course_id = CourseId::new(1);
        repo.upsert_course(&Course::new(course_id, "Web Development", None).unwrap())
            .await
            .unwrap();
        for i in 1..=lesson_count {
            let lesson = Lesson::new(
                LessonId::new(i),
                course_id,
                format!("L{i}"),
                format!("content {i}"),
                i32::try_from(i).unwrap(),
            )
            .unwrap();
            repo.upsert_lesson(&lesson).await.unwrap();
        }

        let progress = Arc::new(FlakyProgress {
            inner: repo.clone(),
            ..FlakyProgress::default()
        });
        let identity = Arc::new(LocalIdentityProvider::new(
            Clock::fixed(fixed_now()),
            Duration::hours(1),
            Arc::new(repo.clone()),
        ));
        let tracker = ProgressTracker::new(
            identity.clone(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            progress.clone(),
            Arc::new(repo.clone()),
        );

        Fixture {
            repo,
            progress,
            identity,
            tracker,
        }
    }

    #[tokio::test]
    async fn unknown_course_leaves_tracker_uninitialized() {
        let mut fx = fixture(3).await;
        let err = fx
            .tracker
            .initialize(LearnerId::generate(), "Underwater Basket Weaving")
            .await
            .unwrap_err();

        assert!(matches!(err, TrackerError::CourseNotFound(name) if name == "Underwater Basket Weaving"));
        assert!(!fx.tracker.is_initialized());
        assert_eq!(fx.tracker.percentage(), 0);
    }

    #[tokio::test]
    async fn failed_reinitialize_discards_previous_state() {
        let mut fx = fixture(3).await;
        let learner = LearnerId::generate();
        fx.tracker.initialize(learner, "Web Development").await.unwrap();
        assert!(fx.tracker.is_initialized());

        fx.tracker.initialize(learner, "Missing").await.unwrap_err();
        assert!(!fx.tracker.is_initialized());
    }

    #[tokio::test]
    async fn resumes_at_first_incomplete_lesson() {
        let mut fx = fixture(5).await;
        let learner = LearnerId::generate();
        for lesson in [1, 2] {
            fx.repo
                .upsert_progress(&ProgressRecord::completed(learner, LessonId::new(lesson)))
                .await
                .unwrap();
        }

        fx.tracker.initialize(learner, "Web Development").await.unwrap();
        assert_eq!(fx.tracker.current_index(), 2);
        assert_eq!(fx.tracker.percentage(), 40);
    }

    #[tokio::test]
    async fn mark_complete_twice_writes_once() {
        let mut fx = fixture(3).await;
        let learner = LearnerId::generate();
        fx.tracker.initialize(learner, "Web Development").await.unwrap();

        assert!(fx.tracker.mark_current_complete().await.unwrap());
        assert!(!fx.tracker.mark_current_complete().await.unwrap());

        assert_eq!(fx.progress.writes.load(Ordering::SeqCst), 1);
        let stored = fx.repo.list_progress(learner).await.unwrap();
        assert_eq!(stored, vec![ProgressRecord::completed(learner, LessonId::new(1))]);
    }

    #[tokio::test]
    async fn failed_write_leaves_state_untouched() {
        let mut fx = fixture(3).await;
        let learner = LearnerId::generate();
        fx.tracker.initialize(learner, "Web Development").await.unwrap();
        fx.tracker.advance().await.unwrap();
        let before = fx.tracker.state().cloned().unwrap();

        fx.progress.fail_writes.store(true, Ordering::SeqCst);
        let err = fx.tracker.advance().await.unwrap_err();
        assert!(matches!(err, TrackerError::Storage(StorageError::Connection(_))));
        assert_eq!(fx.tracker.state(), Some(&before));

        let err = fx.tracker.mark_current_complete().await.unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
        assert_eq!(fx.tracker.state(), Some(&before));

        fx.progress.fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(fx.tracker.advance().await.unwrap(), Step::Advanced(2));
    }

    #[tokio::test]
    async fn advancing_n_times_completes_the_course() {
        let mut fx = fixture(4).await;
        let learner = LearnerId::generate();
        fx.tracker.initialize(learner, "Web Development").await.unwrap();

        for _ in 0..4 {
            fx.tracker.advance().await.unwrap();
            assert!(fx.tracker.current_index() < 4);
        }

        assert!(fx.tracker.is_course_completed());
        assert_eq!(fx.tracker.current_index(), 3);
        assert_eq!(fx.tracker.percentage(), 100);
        assert_eq!(fx.repo.list_progress(learner).await.unwrap().len(), 4);

        // tolerated at the last index
        assert_eq!(fx.tracker.advance().await.unwrap(), Step::Finished);
        assert_eq!(fx.progress.writes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn retreat_stops_at_first_lesson_without_writes() {
        let mut fx = fixture(3).await;
        fx.tracker
            .initialize(LearnerId::generate(), "Web Development")
            .await
            .unwrap();

        assert!(!fx.tracker.retreat().unwrap());
        fx.tracker.advance().await.unwrap();
        assert!(fx.tracker.retreat().unwrap());
        assert_eq!(fx.tracker.current_index(), 0);
        assert_eq!(fx.progress.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn operations_require_initialization() {
        let mut fx = fixture(1).await;
        assert!(matches!(
            fx.tracker.advance().await.unwrap_err(),
            TrackerError::NotInitialized
        ));
        assert!(matches!(
            fx.tracker.retreat().unwrap_err(),
            TrackerError::NotInitialized
        ));
        assert!(fx.tracker.view().is_none());
    }

    #[tokio::test]
    async fn initialize_from_session_uses_selected_course() {
        let mut fx = fixture(2).await;
        let creds = Credentials::new("ada@example.com", "secret").unwrap();
        let learner = fx.identity.sign_up(&creds).await.unwrap();
        fx.repo
            .insert_profile(&LearnerProfile::student(&learner, "Web Development"))
            .await
            .unwrap();

        let err = fx.tracker.initialize_from_session().await.unwrap_err();
        assert!(matches!(err, TrackerError::Auth(AuthError::NoSession)));

        fx.identity.sign_in_with_password(&creds).await.unwrap();
        fx.tracker.initialize_from_session().await.unwrap();
        let state = fx.tracker.state().unwrap();
        assert_eq!(state.learner_id(), learner.id());
        assert_eq!(state.course().name(), "Web Development");
    }

    #[tokio::test]
    async fn initialize_from_session_without_profile_reports_no_course() {
        let mut fx = fixture(2).await;
        let creds = Credentials::new("ada@example.com", "secret").unwrap();
        fx.identity.sign_up(&creds).await.unwrap();
        fx.identity.sign_in_with_password(&creds).await.unwrap();

        let err = fx.tracker.initialize_from_session().await.unwrap_err();
        assert!(matches!(err, TrackerError::NoCourseSelected));
        assert!(!fx.tracker.is_initialized());
    }

    #[tokio::test]
    async fn logout_clears_state_and_session() {
        let mut fx = fixture(2).await;
        let creds = Credentials::new("ada@example.com", "secret").unwrap();
        let learner = fx.identity.sign_up(&creds).await.unwrap();
        fx.identity.sign_in_with_password(&creds).await.unwrap();
        fx.tracker
            .initialize(learner.id(), "Web Development")
            .await
            .unwrap();
        fx.tracker.advance().await.unwrap();

        fx.tracker.logout().await.unwrap();

        assert!(!fx.tracker.is_initialized());
        assert_eq!(fx.tracker.current_index(), 0);
        assert!(!fx.tracker.is_course_completed());
        assert!(fx.identity.current_session().await.unwrap().is_none());
    }
}
