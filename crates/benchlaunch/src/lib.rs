pub mod bench_config;
pub mod errors;
pub mod export;
pub mod kmp;
pub mod launch_plan;
pub mod platform;
pub mod runners;
pub mod work_dir;

pub use bench_config::{BenchmarkConfig, DriverOverrides, RunMode};
pub use errors::{LaunchError, LaunchResult};
pub use export::{DriverExporter, ExportPlan, ExportRequest, GraphExporter};
pub use kmp::KmpSettings;
pub use launch_plan::{DriverSettings, LaunchPlan};
pub use platform::{FixedPlatform, HostPlatform, Platform};
pub use runners::ProcessRunner;
