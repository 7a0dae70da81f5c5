use std::sync::Arc;

use course_core::model::{Course, Credentials, Learner, LearnerProfile};
use storage::repository::{CourseRepository, LearnerRepository};
use tracing::{info, warn};

use crate::error::RegistrationError;
use crate::identity::IdentityProvider;

/// Orchestrates sign-up: course choice, account creation and the learner profile.
#[derive(Clone)]
pub struct RegistrationService {
    identity: Arc<dyn IdentityProvider>,
    courses: Arc<dyn CourseRepository>,
    learners: Arc<dyn LearnerRepository>,
}

impl RegistrationService {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        courses: Arc<dyn CourseRepository>,
        learners: Arc<dyn LearnerRepository>,
    ) -> Self {
        Self {
            identity,
            courses,
            learners,
        }
    }

    /// Courses a learner can pick from, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::Storage` if the catalogue cannot be read.
    pub async fn list_courses(&self) -> Result<Vec<Course>, RegistrationError> {
        Ok(self.courses.list_courses().await?)
    }

    /// Register a learner and enroll them in `course_name`.
    ///
    /// The course is checked before any account is created. If the account is
    /// created but the profile write fails, `ProfileNotSaved` is returned and
    /// the account stays in place.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::MissingField` when the course is blank,
    /// `RegistrationError::Learner` when email or password are blank,
    /// `RegistrationError::CourseNotFound` for an unknown course, and
    /// `RegistrationError::Auth` when the identity provider refuses the sign-up.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        course_name: &str,
    ) -> Result<Learner, RegistrationError> {
        let course_name = course_name.trim();
        if course_name.is_empty() {
            return Err(RegistrationError::MissingField("course"));
        }
        let credentials = Credentials::new(email, password)?;

        if self
            .courses
            .get_course_id_by_name(course_name)
            .await?
            .is_none()
        {
            return Err(RegistrationError::CourseNotFound(course_name.to_owned()));
        }

        let learner = self.identity.sign_up(&credentials).await?;
        let profile = LearnerProfile::student(&learner, course_name);
        if let Err(err) = self.learners.insert_profile(&profile).await {
            warn!(learner = %learner.id(), error = %err, "learner profile insert failed");
            return Err(RegistrationError::ProfileNotSaved(err));
        }

        info!(learner = %learner.id(), course = course_name, "learner registered");
        Ok(learner)
    }
}
