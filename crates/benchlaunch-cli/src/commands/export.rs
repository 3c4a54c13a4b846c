use crate::settings::Settings;
use anyhow::Result;
use benchlaunch::errors::util::ensure_file_exists;
use benchlaunch::export::run_export;
use benchlaunch::{DriverExporter, ExportPlan, ExportRequest, GraphExporter};
use clap::Args;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Version number of the model
    #[arg(long = "model_version", default_value_t = 1, allow_negative_numbers = true)]
    pub model_version: i64,

    /// Frozen graph to convert
    #[arg(value_name = "IMPORT_PATH")]
    pub import_path: String,

    /// Directory the versioned SavedModel is written under
    #[arg(value_name = "EXPORT_DIR")]
    pub export_dir: PathBuf,
}

impl From<ExportArgs> for ExportRequest {
    fn from(args: ExportArgs) -> Self {
        ExportRequest {
            import_path: args.import_path,
            export_dir: args.export_dir,
            model_version: args.model_version,
        }
    }
}

pub fn handle_export(args: ExportArgs, settings: &Settings) -> Result<i32> {
    let exporter = DriverExporter::from_command_line(&settings.export.converter)?;
    export_with(args.into(), &exporter, &mut io::stdout())
}

fn export_with(
    request: ExportRequest,
    exporter: &dyn GraphExporter,
    out: &mut dyn Write,
) -> Result<i32> {
    // Nothing is announced until the inputs are valid and the graph is there.
    let plan = ExportPlan::from_request(&request)?;
    ensure_file_exists(&plan.import_path)?;
    writeln!(out, "Exporting trained model to {}", plan.export_path.display())?;

    let code = run_export(&request, exporter)?;
    if code == 0 {
        writeln!(out, "Done!")?;
    }
    Ok(code)
}
