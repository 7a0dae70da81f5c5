#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod identity;
pub mod registration_service;
pub mod tracker;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use config::ServicesConfig;
pub use error::{AppServicesError, AuthError, RegistrationError, TrackerError};
pub use identity::{IdentityProvider, LocalIdentityProvider};
pub use registration_service::RegistrationService;
pub use tracker::{DashboardView, PrimaryAction, ProgressTracker, Step};
