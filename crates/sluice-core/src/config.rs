//! Renderer configuration.
//!
//! Stage lists are explicit and ordered; unknown keys and repeated stages are
//! rejected at parse time.

use crate::{
    merge::{MergeStrategyKind, Merger},
    optimize::{PreOptimizerChain, PreOptimizerKind},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid render config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("render config lists stage '{stage}' more than once")]
    DuplicateStage { stage: &'static str },
}

///
/// RenderConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Pre-optimizer passes, run in order.
    pub pre_optimizers: Vec<PreOptimizerKind>,

    /// Merge strategies, run in order.
    pub merge_strategies: Vec<MergeStrategyKind>,

    /// Allow a fully pushed `COUNT` to be answered by a count aggregate.
    /// When false the `count` strategy is skipped even if listed.
    pub count_fast_path: bool,
}

impl RenderConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        if let Some(pass) = self.pre_optimizers.iter().find(|pass| !seen.insert(**pass)) {
            return Err(ConfigError::DuplicateStage {
                stage: pass.as_str(),
            });
        }

        let mut seen = HashSet::new();
        if let Some(strategy) = self
            .merge_strategies
            .iter()
            .find(|strategy| !seen.insert(**strategy))
        {
            return Err(ConfigError::DuplicateStage {
                stage: strategy.as_str(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn optimizer_chain(&self) -> PreOptimizerChain {
        PreOptimizerChain::new(self.pre_optimizers.clone())
    }

    #[must_use]
    pub fn merger(&self) -> Merger {
        Merger::new(
            self.merge_strategies
                .iter()
                .copied()
                .filter(|strategy| self.count_fast_path || *strategy != MergeStrategyKind::Count)
                .collect(),
        )
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pre_optimizers: PreOptimizerKind::DEFAULT_ORDER.to_vec(),
            merge_strategies: MergeStrategyKind::DEFAULT_ORDER.to_vec(),
            count_fast_path: true,
        }
    }
}

///
/// TESTS
///
