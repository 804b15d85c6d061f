use rayon::prelude::*;

use crate::consts::PARALLEL_WINDOW_THRESHOLD;
use crate::error::Result;
use crate::pixel::PixelBuffer;

use super::config::{RegistrationConfig, RegistrationRequest};
use super::registrar::{Registrar, RegistrationOutcome};

/// Register many windows of one image pair.
///
/// Each Rayon worker builds its own [`Registrar`], so FFT plans and target
/// spectra are never shared between threads. Results keep the order of
/// `requests`.
pub fn register_batch(
    target: &PixelBuffer,
    pattern: &PixelBuffer,
    config: &RegistrationConfig,
    requests: &[RegistrationRequest],
) -> Result<Vec<Result<RegistrationOutcome>>> {
    config.validate()?;
    if requests.len() < PARALLEL_WINDOW_THRESHOLD {
        let mut registrar = Registrar::new(target, pattern, config.clone())?;
        return Ok(requests.iter().map(|r| registrar.register(r)).collect());
    }

    Ok(requests
        .par_iter()
        .map_init(
            || Registrar::new(target, pattern, config.clone()),
            |registrar, request| match registrar {
                Ok(registrar) => registrar.register(request),
                Err(e) => Err(crate::error::AlignError::InvalidConfig(e.to_string())),
            },
        )
        .collect())
}
