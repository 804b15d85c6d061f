pub mod fft;
pub mod patch;
pub mod peak;
pub mod spectral;
pub mod window;

pub use fft::FftPlanCache;
pub use patch::{extract_shaped, extract_window, PatchStats};
pub use peak::{PeakConfig, PeakEstimate, PeakLocator};
pub use spectral::{CorrelationParams, CorrelationSurface, SpectralCorrelator, Spectrum};
