use crate::settings::Settings;
use anyhow::{Context, Result};
use benchlaunch::{
    BenchmarkConfig, DriverOverrides, HostPlatform, KmpSettings, LaunchPlan, Platform,
    ProcessRunner,
};
use clap::{Args, Parser};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Directory holding the dataset
    #[arg(long = "data-location", value_name = "DIR", default_value = "")]
    pub data_location: String,

    /// Batch size handed to the driver (-1 keeps the driver's default)
    #[arg(long = "batch-size", default_value_t = -1, allow_negative_numbers = true)]
    pub batch_size: i64,

    /// Evaluate a checkpoint instead of training
    #[arg(long = "accuracy-only")]
    pub accuracy_only: bool,

    /// Checkpoint directory used by --accuracy-only runs
    #[arg(long, value_name = "DIR")]
    pub checkpoint: Option<PathBuf>,

    /// Cores for OMP_NUM_THREADS (-1 uses the cores per socket)
    #[arg(long = "num-cores", default_value_t = -1, allow_negative_numbers = true)]
    pub num_cores: i64,

    /// JSON file with KMP_* optimization parameters
    #[arg(long = "kmp-config", value_name = "FILE")]
    pub kmp_config: Option<PathBuf>,

    /// Overrides KMP_BLOCKTIME from the KMP config
    #[arg(long = "kmp-blocktime")]
    pub kmp_blocktime: Option<String>,

    /// Overrides KMP_AFFINITY from the KMP config
    #[arg(long = "kmp-affinity")]
    pub kmp_affinity: Option<String>,

    /// Overrides KMP_SETTINGS from the KMP config
    #[arg(long = "kmp-settings")]
    pub kmp_settings: Option<String>,

    /// Print the launch plan as JSON instead of running it
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Driver-specific arguments, e.g. -- --num_train_steps=100
    #[arg(last = true, value_name = "CUSTOM_ARGS")]
    pub custom_args: Vec<String>,
}

/// Second-stage parser for the arguments after `--`.
#[derive(Parser, Debug)]
#[command(name = "custom_args", no_binary_name = true, allow_negative_numbers = true)]
struct DriverArgs {
    #[arg(long = "weight_decay", default_value_t = 1e-4)]
    weight_decay: f64,

    #[arg(long = "num_warmup_batches", default_value_t = 20)]
    num_warmup_batches: i64,

    /// Number of training batches
    #[arg(long = "num_train_steps", default_value_t = 500)]
    num_train_steps: i64,

    /// Number of inter-op threads
    #[arg(long = "num_inter_threads", default_value_t = 1)]
    num_inter_threads: i64,

    /// Number of intra-op threads
    #[arg(long = "num_intra_threads", default_value_t = 28)]
    num_intra_threads: i64,
}

impl From<DriverArgs> for DriverOverrides {
    fn from(args: DriverArgs) -> Self {
        DriverOverrides {
            weight_decay: args.weight_decay,
            num_warmup_batches: args.num_warmup_batches,
            num_train_steps: args.num_train_steps,
            num_inter_threads: args.num_inter_threads,
            num_intra_threads: args.num_intra_threads,
        }
    }
}

pub fn parse_custom_args(custom_args: &[String]) -> Result<DriverOverrides> {
    let args = DriverArgs::try_parse_from(custom_args)
        .map_err(|e| anyhow::anyhow!("invalid custom argument: {}", e.render()))?;
    Ok(args.into())
}

impl TrainArgs {
    /// The generic flags are checked before the custom args are parsed, so a
    /// missing data location is reported even when the custom args are bad.
    fn benchmark_config(&self) -> Result<BenchmarkConfig> {
        let config = BenchmarkConfig {
            data_location: PathBuf::from(&self.data_location),
            batch_size: self.batch_size,
            accuracy_only: self.accuracy_only,
            checkpoint: self.checkpoint.clone(),
            num_cores: self.num_cores,
            overrides: DriverOverrides::default(),
        };
        config.validate()?;
        Ok(BenchmarkConfig {
            overrides: parse_custom_args(&self.custom_args)?,
            ..config
        })
    }

    fn kmp_settings(&self, settings: &Settings) -> Result<KmpSettings> {
        let mut kmp = match self.kmp_config.as_ref() {
            Some(path) => KmpSettings::load(path)
                .with_context(|| format!("Failed to load KMP config {}", path.display()))?,
            None => match settings.kmp.config.as_ref() {
                Some(path) => KmpSettings::load_optional(path)?,
                None => KmpSettings::default(),
            },
        };
        if let Some(v) = &self.kmp_blocktime {
            kmp.set("KMP_BLOCKTIME", v.as_str());
        }
        if let Some(v) = &self.kmp_affinity {
            kmp.set("KMP_AFFINITY", v.as_str());
        }
        if let Some(v) = &self.kmp_settings {
            kmp.set("KMP_SETTINGS", v.as_str());
        }
        Ok(kmp)
    }
}

/// Build the launch plan for `args`. Nothing is run.
pub fn build_plan(
    args: &TrainArgs,
    settings: &Settings,
    platform: &dyn Platform,
) -> Result<LaunchPlan> {
    // Fails on a missing data location before any file is read.
    let config = args.benchmark_config()?;

    let kmp_vars = args
        .kmp_settings(settings)?
        .unset_in(|key| std::env::var_os(key).is_some());
    Ok(LaunchPlan::build(&config, &settings.driver, platform, kmp_vars)?)
}

/// Returns the exit code for the process.
pub fn handle_train(args: TrainArgs, settings: &Settings) -> Result<i32> {
    let platform = HostPlatform::detect();
    let plan = build_plan(&args, settings, &platform)?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&plan.to_json())?);
        return Ok(0);
    }

    Ok(ProcessRunner::new().run(&plan)?)
}
