use crate::errors::{LaunchError, LaunchResult};
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `num_cores` value that asks for the platform's per-socket core count.
pub const AUTO_CORES: i64 = -1;

/// Driver-specific knobs that arrive as custom arguments after the generic flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverOverrides {
    pub weight_decay: f64,
    pub num_warmup_batches: i64,
    pub num_train_steps: i64,
    pub num_inter_threads: i64,
    pub num_intra_threads: i64,
}

impl Default for DriverOverrides {
    fn default() -> Self {
        DriverOverrides {
            weight_decay: 1e-4,
            num_warmup_batches: 20,
            num_train_steps: 500,
            num_inter_threads: 1,
            num_intra_threads: 28,
        }
    }
}

/// What the driver is asked to do, chosen once when the plan is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunMode {
    /// Evaluate an existing checkpoint.
    Accuracy { checkpoint: PathBuf },
    /// Run a fixed number of training batches.
    Training {
        weight_decay: f64,
        num_warmup_batches: i64,
        num_train_steps: i64,
    },
}

/// Generic benchmark parameters for a single launch.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    pub data_location: PathBuf,
    pub batch_size: i64,
    pub accuracy_only: bool,
    pub checkpoint: Option<PathBuf>,
    pub num_cores: i64,
    pub overrides: DriverOverrides,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            data_location: PathBuf::new(),
            batch_size: -1,
            accuracy_only: false,
            checkpoint: None,
            num_cores: AUTO_CORES,
            overrides: DriverOverrides::default(),
        }
    }
}

impl BenchmarkConfig {
    pub fn new(data_location: impl Into<PathBuf>) -> Self {
        BenchmarkConfig {
            data_location: data_location.into(),
            ..Default::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_accuracy_only(mut self, checkpoint: impl Into<PathBuf>) -> Self {
        self.accuracy_only = true;
        self.checkpoint = Some(checkpoint.into());
        self
    }

    pub fn with_num_cores(mut self, num_cores: i64) -> Self {
        self.num_cores = num_cores;
        self
    }

    pub fn with_overrides(mut self, overrides: DriverOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// The only check made before a plan is built: the data directory must be named.
    pub fn validate(&self) -> LaunchResult<()> {
        if self.data_location.as_os_str().is_empty() {
            return Err(LaunchError::MissingRequiredInput(
                "Please provide a path to the data directory via the '--data-location' flag."
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn run_mode(&self) -> RunMode {
        if self.accuracy_only {
            if self.checkpoint.is_none() {
                tracing::warn!("accuracy-only run without --checkpoint; driver gets an empty train_dir");
            }
            RunMode::Accuracy {
                checkpoint: self.checkpoint.clone().unwrap_or_default(),
            }
        } else {
            RunMode::Training {
                weight_decay: self.overrides.weight_decay,
                num_warmup_batches: self.overrides.num_warmup_batches,
                num_train_steps: self.overrides.num_train_steps,
            }
        }
    }

    /// Value for `OMP_NUM_THREADS`.
    pub fn omp_num_threads(&self, platform: &dyn Platform) -> String {
        if self.num_cores == AUTO_CORES {
            platform.num_cores_per_socket().to_string()
        } else {
            self.num_cores.to_string()
        }
    }
}
