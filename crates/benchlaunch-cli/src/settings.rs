use benchlaunch::export::DEFAULT_CONVERTER;
use benchlaunch::launch_plan::{DEFAULT_PYTHON_EXE, DEFAULT_SCRIPT_DIR, DEFAULT_SCRIPT_NAME};
use benchlaunch::DriverSettings;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "benchlaunch.toml";
pub const CONFIG_PATH_ENV: &str = "BENCHLAUNCH_CONFIG";

#[derive(Debug, Deserialize)]
pub struct ExportSettings {
    pub converter: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct KmpFileSettings {
    #[serde(default)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub driver: DriverSettings,
    pub export: ExportSettings,
    #[serde(default)]
    pub kmp: KmpFileSettings,
}

impl Settings {
    /// Defaults, then an optional TOML file, then `BENCHLAUNCH_*` environment variables.
    ///
    /// An explicitly named file must exist; the default `benchlaunch.toml` may not.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let config = Config::builder()
            .set_default("driver.python_exe", DEFAULT_PYTHON_EXE)?
            .set_default("driver.script_dir", DEFAULT_SCRIPT_DIR)?
            .set_default("driver.script_name", DEFAULT_SCRIPT_NAME)?
            .set_default("export.converter", DEFAULT_CONVERTER)?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("BENCHLAUNCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        tracing::debug!("loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Resolve the config file from `BENCHLAUNCH_CONFIG` when no path was given.
    pub fn load_default() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Some(Path::new(&path))),
            None => Self::load(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("BENCHLAUNCH_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(write_config(dir.path(), "").as_path())).unwrap();
        assert_eq!(settings.driver, DriverSettings::default());
        assert_eq!(settings.export.converter, DEFAULT_CONVERTER);
        assert!(settings.kmp.config.is_none());
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults() {
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[driver]
python_exe = "/opt/venv/bin/python3"
script_dir = "/srv/tf_cnn_benchmarks"

[kmp]
config = "/srv/models/ssd/config.json"
"#,
        );
        let settings = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(settings.driver.python_exe, "/opt/venv/bin/python3");
        assert_eq!(
            settings.driver.script_dir,
            PathBuf::from("/srv/tf_cnn_benchmarks")
        );
        assert_eq!(settings.driver.script_name, DEFAULT_SCRIPT_NAME);
        assert_eq!(
            settings.kmp.config,
            Some(PathBuf::from("/srv/models/ssd/config.json"))
        );
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[driver]\npython_exe = \"python3\"\n");
        env::set_var("BENCHLAUNCH_DRIVER__PYTHON_EXE", "/usr/bin/python3.11");
        env::set_var("BENCHLAUNCH_EXPORT__CONVERTER", "python3 convert.py");

        let settings = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(settings.driver.python_exe, "/usr/bin/python3.11");
        assert_eq!(settings.export.converter, "python3 convert.py");

        env::remove_var("BENCHLAUNCH_DRIVER__PYTHON_EXE");
        env::remove_var("BENCHLAUNCH_EXPORT__CONVERTER");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("benchlaunch.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }
}
