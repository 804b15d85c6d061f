use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::affine::SolverConfig;
use crate::error::{AlignError, Result};
use crate::register::RegistrationConfig;
use crate::warp::WarpOptions;

/// One stage of the alignment recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeStage {
    /// Windows per side; the image is split into `grid` x `grid` windows.
    pub grid: usize,
    /// Register-and-refit rounds in this stage (default: 2).
    #[serde(default = "default_passes")]
    pub passes: usize,
}

fn default_passes() -> usize {
    2
}

impl RecipeStage {
    pub fn new(grid: usize, passes: usize) -> Self {
        Self { grid, passes }
    }
}

/// Coarse-to-fine sequence of window grids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    pub stages: Vec<RecipeStage>,
    /// Windows whose final uncertainty exceeds this are not used for fitting
    /// (default: unlimited).
    pub max_uncertainty: Option<f64>,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            stages: vec![
                RecipeStage::new(1, 2),
                RecipeStage::new(2, 2),
                RecipeStage::new(4, 2),
            ],
            max_uncertainty: None,
        }
    }
}

impl RecipeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(AlignError::InvalidConfig("recipe has no stages".to_string()));
        }
        if let Some(stage) = self.stages.iter().find(|s| s.grid == 0 || s.passes == 0) {
            return Err(AlignError::InvalidConfig(format!(
                "recipe stage {}x{} with {} passes",
                stage.grid, stage.grid, stage.passes
            )));
        }
        Ok(())
    }
}

/// Every tunable of registration, fitting, the recipe and rendering.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignConfig {
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub recipe: RecipeConfig,
    #[serde(default)]
    pub warp: WarpOptions,
}

impl AlignConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AlignConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.registration.validate()?;
        self.recipe.validate()
    }
}
