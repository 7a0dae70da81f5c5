mod service;
mod view;

pub use crate::error::TrackerError;
pub use course_core::Step;
pub use service::ProgressTracker;
pub use view::{DashboardView, PrimaryAction};
