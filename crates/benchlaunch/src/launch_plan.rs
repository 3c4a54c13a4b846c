use crate::bench_config::{BenchmarkConfig, RunMode};
use crate::errors::LaunchResult;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{self, PathBuf};

pub const DEFAULT_PYTHON_EXE: &str = "python";
pub const DEFAULT_SCRIPT_DIR: &str = "/tmp/benchmark_ssd_resnet34/scripts/tf_cnn_benchmarks";
pub const DEFAULT_SCRIPT_NAME: &str = "tf_cnn_benchmarks.py";

/// Flags the driver always receives for this model.
const MODEL_FLAGS: &[&str] = &[
    "--model=ssd300 --data_name coco",
    "--mkl=True --device=cpu --data_format=NCHW",
    "--variable_update=horovod --horovod_device=cpu",
];

/// Where the external training driver lives and how to start it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSettings {
    pub python_exe: String,
    pub script_dir: PathBuf,
    pub script_name: String,
}

impl Default for DriverSettings {
    fn default() -> Self {
        DriverSettings {
            python_exe: DEFAULT_PYTHON_EXE.to_string(),
            script_dir: PathBuf::from(DEFAULT_SCRIPT_DIR),
            script_name: DEFAULT_SCRIPT_NAME.to_string(),
        }
    }
}

/// Everything needed to start the driver: child environment, command line
/// and the directory to run it from.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    env: Vec<(String, String)>,
    command: String,
    working_dir: PathBuf,
    mode: RunMode,
}

impl LaunchPlan {
    /// Build a plan from a validated config.
    ///
    /// `kmp_vars` are placed ahead of `OMP_NUM_THREADS` in the returned
    /// environment. A relative `script_dir` is resolved against the current
    /// directory, since the runner changes into it before spawning. Nothing
    /// here touches the current process environment.
    pub fn build(
        config: &BenchmarkConfig,
        driver: &DriverSettings,
        platform: &dyn Platform,
        kmp_vars: Vec<(String, String)>,
    ) -> LaunchResult<Self> {
        config.validate()?;

        let mut env = kmp_vars;
        env.retain(|(key, _)| key != "OMP_NUM_THREADS");
        env.push((
            "OMP_NUM_THREADS".to_string(),
            config.omp_num_threads(platform),
        ));

        let working_dir = path::absolute(&driver.script_dir)?;
        let mode = config.run_mode();
        let command = format!(
            "{} {} {}",
            driver.python_exe,
            working_dir.join(&driver.script_name).display(),
            driver_args(config, &mode).join(" ")
        );

        tracing::info!(
            mode = mode_name(&mode),
            working_dir = %working_dir.display(),
            "built launch plan"
        );
        tracing::debug!(command = %command, "driver command");

        Ok(LaunchPlan {
            env,
            command,
            working_dir,
            mode,
        })
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn working_dir(&self) -> &PathBuf {
        &self.working_dir
    }

    pub fn to_json(&self) -> Value {
        let env: Map<String, Value> = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        json!({
            "working_dir": self.working_dir,
            "env": env,
            "command": self.command,
            "run": self.mode,
        })
    }
}

fn mode_name(mode: &RunMode) -> &'static str {
    match mode {
        RunMode::Accuracy { .. } => "accuracy",
        RunMode::Training { .. } => "training",
    }
}

fn driver_args(config: &BenchmarkConfig, mode: &RunMode) -> Vec<String> {
    let overrides = &config.overrides;
    let mut args = vec![
        format!("--data_dir {}", config.data_location.display()),
        format!("--batch_size {}", config.batch_size),
        format!("--num_inter_threads {}", overrides.num_inter_threads),
        format!("--num_intra_threads {}", overrides.num_intra_threads),
    ];
    args.extend(MODEL_FLAGS.iter().map(|flags| flags.to_string()));

    match mode {
        RunMode::Accuracy { checkpoint } => {
            args.push(format!("--train_dir={}", checkpoint.display()));
            args.push("--eval=true".to_string());
            args.push("--num_eval_epochs=1".to_string());
            args.push("--print_training_accuracy=True".to_string());
        }
        RunMode::Training {
            weight_decay,
            num_warmup_batches,
            num_train_steps,
        } => {
            args.push(format!("--weight_decay {}", weight_decay));
            args.push(format!("--num_warmup_batches {}", num_warmup_batches));
            args.push(format!("--num_batches {}", num_train_steps));
        }
    }
    args
}
