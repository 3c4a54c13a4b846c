use crate::errors::{util::ensure_file_exists, LaunchError, LaunchResult};
use crate::runners::process_runner::split_command;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Command;

pub const INPUT_TENSOR: &str = "input";
pub const OUTPUT_TENSOR: &str = "predict";
pub const GRAPH_TRANSFORMS: &[&str] = &[
    "strip_unused_nodes",
    "remove_nodes(op=Identity, op=CheckNumerics)",
    "fold_constants(ignore_errors=true)",
    "fold_batch_norms",
    "fold_old_batch_norms",
];
pub const PREDICT_METHOD_NAME: &str = "tensorflow/serving/predict";
pub const SERVING_TAG: &str = "serve";
pub const DEFAULT_SIGNATURE_KEY: &str = "serving_default";

pub const DEFAULT_CONVERTER: &str = "python graph_to_saved_model.py";

/// Arguments of a graph-to-SavedModel conversion as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub import_path: String,
    pub export_dir: PathBuf,
    pub model_version: i64,
}

impl ExportRequest {
    pub fn validate(&self) -> LaunchResult<()> {
        if self.import_path.is_empty() {
            return Err(LaunchError::MissingRequiredInput(
                "Please specify the path to the model graph you want to convert to SavedModel format."
                    .to_string(),
            ));
        }
        if self.model_version <= 0 {
            return Err(LaunchError::InvalidValue(
                "Please specify a positive value for version number.".to_string(),
            ));
        }
        Ok(())
    }
}

/// The fixed conversion pipeline applied to a frozen graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPlan {
    pub import_path: PathBuf,
    pub export_path: PathBuf,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub transforms: Vec<String>,
    pub method_name: String,
    pub tags: Vec<String>,
    pub signature_key: String,
}

impl ExportPlan {
    /// Validate the request and describe the export. Does not touch the filesystem.
    pub fn from_request(request: &ExportRequest) -> LaunchResult<Self> {
        request.validate()?;
        Ok(ExportPlan {
            import_path: PathBuf::from(&request.import_path),
            export_path: request
                .export_dir
                .join(request.model_version.to_string()),
            inputs: vec![INPUT_TENSOR.to_string()],
            outputs: vec![OUTPUT_TENSOR.to_string()],
            transforms: GRAPH_TRANSFORMS.iter().map(|t| t.to_string()).collect(),
            method_name: PREDICT_METHOD_NAME.to_string(),
            tags: vec![SERVING_TAG.to_string()],
            signature_key: DEFAULT_SIGNATURE_KEY.to_string(),
        })
    }

    /// Flags describing this plan to a framework-side converter.
    pub fn converter_args(&self) -> Vec<String> {
        vec![
            format!("--in_graph={}", self.import_path.display()),
            format!("--export_path={}", self.export_path.display()),
            format!("--inputs={}", self.inputs.join(",")),
            format!("--outputs={}", self.outputs.join(",")),
            format!("--transforms={}", self.transforms.join(" ")),
            format!("--method_name={}", self.method_name),
            format!("--tags={}", self.tags.join(",")),
            format!("--signature_key={}", self.signature_key),
        ]
    }
}

/// Carries out an [`ExportPlan`] against a concrete framework.
pub trait GraphExporter {
    /// Returns the exit code of the export.
    fn export(&self, plan: &ExportPlan) -> LaunchResult<i32>;
}

/// Hands the plan to an external converter program that owns the framework calls.
#[derive(Debug, Clone)]
pub struct DriverExporter {
    argv: Vec<String>,
}

impl DriverExporter {
    pub fn from_command_line(command: &str) -> LaunchResult<Self> {
        Ok(DriverExporter {
            argv: split_command(command)?,
        })
    }
}

impl Default for DriverExporter {
    fn default() -> Self {
        DriverExporter {
            argv: DEFAULT_CONVERTER
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl GraphExporter for DriverExporter {
    fn export(&self, plan: &ExportPlan) -> LaunchResult<i32> {
        ensure_file_exists(&plan.import_path)?;

        tracing::debug!(converter = ?self.argv, "starting graph converter");
        let status = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .args(plan.converter_args())
            .status()?;

        let code = status.code().unwrap_or(1);
        if code != 0 {
            tracing::error!("graph converter exited with status {}", code);
        }
        Ok(code)
    }
}

/// Validate, plan and run an export. Validation failures never reach the exporter.
pub fn run_export(request: &ExportRequest, exporter: &dyn GraphExporter) -> LaunchResult<i32> {
    let plan = ExportPlan::from_request(request)?;
    tracing::info!(
        "exporting {} to {}",
        plan.import_path.display(),
        plan.export_path.display()
    );
    exporter.export(&plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use test_case::test_case;

    #[derive(Default)]
    struct RecordingExporter {
        plans: RefCell<Vec<ExportPlan>>,
    }

    impl GraphExporter for RecordingExporter {
        fn export(&self, plan: &ExportPlan) -> LaunchResult<i32> {
            self.plans.borrow_mut().push(plan.clone());
            Ok(0)
        }
    }

    fn request(import_path: &str, model_version: i64) -> ExportRequest {
        ExportRequest {
            import_path: import_path.to_string(),
            export_dir: PathBuf::from("/tmp/models"),
            model_version,
        }
    }

    #[test]
    fn test_plan_uses_fixed_pipeline() {
        let plan = ExportPlan::from_request(&request("/graphs/resnet50.pb", 3)).unwrap();
        assert_eq!(plan.export_path, PathBuf::from("/tmp/models/3"));
        assert_eq!(plan.inputs, vec!["input"]);
        assert_eq!(plan.outputs, vec!["predict"]);
        assert_eq!(plan.transforms.len(), 5);
        assert_eq!(plan.transforms[1], "remove_nodes(op=Identity, op=CheckNumerics)");
        assert_eq!(plan.method_name, "tensorflow/serving/predict");
        assert_eq!(plan.tags, vec!["serve"]);
        assert_eq!(plan.signature_key, "serving_default");
    }

    #[test]
    fn test_converter_args() {
        let plan = ExportPlan::from_request(&request("/graphs/g.pb", 1)).unwrap();
        let args = plan.converter_args();
        assert_eq!(args[0], "--in_graph=/graphs/g.pb");
        assert_eq!(args[1], "--export_path=/tmp/models/1");
        assert!(args.contains(
            &"--transforms=strip_unused_nodes remove_nodes(op=Identity, op=CheckNumerics) fold_constants(ignore_errors=true) fold_batch_norms fold_old_batch_norms".to_string()
        ));
    }

    #[test_case("", 1 ; "empty import path")]
    #[test_case("/graphs/g.pb", 0 ; "zero version")]
    #[test_case("/graphs/g.pb", -2 ; "negative version")]
    fn test_invalid_requests_never_reach_exporter(import_path: &str, version: i64) {
        let exporter = RecordingExporter::default();
        let err = run_export(&request(import_path, version), &exporter).unwrap_err();
        assert!(err.is_usage_error());
        assert!(exporter.plans.borrow().is_empty());
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            request("", 1).validate(),
            Err(LaunchError::MissingRequiredInput(_))
        ));
        assert!(matches!(
            request("/g.pb", 0).validate(),
            Err(LaunchError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_valid_request_reaches_exporter() {
        let exporter = RecordingExporter::default();
        let code = run_export(&request("/graphs/g.pb", 2), &exporter).unwrap();
        assert_eq!(code, 0);
        let plans = exporter.plans.borrow();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].export_path, PathBuf::from("/tmp/models/2"));
    }

    #[test]
    fn test_driver_exporter_requires_graph_file() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExportRequest {
            import_path: dir.path().join("missing.pb").display().to_string(),
            export_dir: dir.path().to_path_buf(),
            model_version: 1,
        };
        let err = run_export(&req, &DriverExporter::default()).unwrap_err();
        assert!(matches!(err, LaunchError::FileNotFound(_)));
        assert!(!dir.path().join("1").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_driver_exporter_forwards_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let graph = dir.path().join("frozen.pb");
        std::fs::write(&graph, b"graph").unwrap();
        let req = ExportRequest {
            import_path: graph.display().to_string(),
            export_dir: dir.path().to_path_buf(),
            model_version: 1,
        };

        let ok = DriverExporter::from_command_line("true").unwrap();
        assert_eq!(run_export(&req, &ok).unwrap(), 0);

        let failing = DriverExporter::from_command_line("false").unwrap();
        assert_eq!(run_export(&req, &failing).unwrap(), 1);
    }
}
