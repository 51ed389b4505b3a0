//! Parameter checkpointing between training passes

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::model::{ModelParams, TreeModel};

/// Writes the model's parameters to a fixed path, replacing the previous dump.
///
/// Without a path the manager does nothing; the parameters stay on the model.
#[derive(Debug, Clone, Default)]
pub struct CheckpointManager {
    param_path: Option<PathBuf>,
    saves: usize,
}

impl CheckpointManager {
    /// Manager writing to `param_path` when set
    pub fn new(param_path: Option<PathBuf>) -> Self {
        Self { param_path, saves: 0 }
    }

    /// Destination of parameter dumps
    pub fn param_path(&self) -> Option<&Path> {
        self.param_path.as_deref()
    }

    /// Number of dumps written so far
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Write the model's parameters if a path is configured, returning what
    /// was written
    pub fn persist<M: TreeModel + ?Sized>(&mut self, model: &M) -> Result<Option<ModelParams>> {
        let Some(path) = &self.param_path else {
            debug!("No parameter dump path configured, skipping checkpoint");
            return Ok(None);
        };
        let params = model.save_params(path)?;
        self.saves += 1;
        info!("Dumped model parameters to {:?}", path);
        Ok(Some(params))
    }
}
