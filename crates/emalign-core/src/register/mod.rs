mod batch;
pub mod config;
mod registrar;
pub mod state;

pub use batch::register_batch;
pub use config::{RegistrationConfig, RegistrationRequest, ResetThresholds};
pub use registrar::{image_center, Registrar, RegistrationOutcome};
pub use state::{RegistrationPhase, RegistrationState, ResetReport};
