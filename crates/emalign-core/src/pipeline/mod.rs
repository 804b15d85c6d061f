pub mod config;
mod recipe;
mod types;

pub use recipe::{align_images, align_images_reported};
pub use types::{AlignmentResult, PassReport, ProgressReporter};
