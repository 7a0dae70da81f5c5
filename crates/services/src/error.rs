//! Shared error types for the services crate.

use thiserror::Error;

use course_core::ProgressError;
use course_core::model::LearnerError;
use storage::catalog::SeedError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the identity provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("no active session")]
    NoSession,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email is already registered")]
    EmailTaken,
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressTracker`.
///
/// `CourseNotFound`, `Auth` and `Storage` are surfaced unmodified; the tracker
/// never retries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("course not found: {0}")]
    CourseNotFound(String),
    #[error("no course selected for this learner")]
    NoCourseSelected,
    #[error("progress tracker is not initialized")]
    NotInitialized,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Errors emitted by `RegistrationService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("course not found: {0}")]
    CourseNotFound(String),
    #[error("account created but the learner profile could not be saved")]
    ProfileNotSaved(#[source] StorageError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Seed(#[from] SeedError),
}
