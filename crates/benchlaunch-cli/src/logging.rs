use anyhow::{Context, Result};
use etcetera::{choose_app_strategy, AppStrategy, AppStrategyArgs};
use std::fs;
use std::path::PathBuf;
use std::sync::Once;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

static INIT: Once = Once::new();

/// Returns the directory where log files should be stored, creating it if needed.
/// Uses the platform state directory, e.g. ~/.local/state/benchlaunch/logs/cli/<date> on Linux.
fn get_log_directory() -> Result<PathBuf> {
    let strategy = choose_app_strategy(AppStrategyArgs {
        top_level_domain: "io".to_string(),
        author: "benchlaunch".to_string(),
        app_name: "benchlaunch".to_string(),
    })
    .context("benchlaunch requires a home dir")?;

    let base_log_dir = strategy
        .in_state_dir("logs")
        .unwrap_or_else(|| strategy.in_data_dir("logs"));

    let date_dir = base_log_dir
        .join("cli")
        .join(chrono::Local::now().format("%Y-%m-%d").to_string());
    fs::create_dir_all(&date_dir).context("Failed to create log directory")?;
    Ok(date_dir)
}

/// Sets up a JSON file log for the run plus a compact stderr layer.
///
/// `RUST_LOG` controls the file layer; the console shows warnings and up
/// unless `verbose` is set.
pub fn setup_logging(name: Option<&str>, verbose: bool) -> Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = init_subscriber(name, verbose);
    });
    result
}

fn init_subscriber(name: Option<&str>, verbose: bool) -> Result<()> {
    let console_level = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .with_filter(console_level);

    let file_layer = match get_log_directory() {
        Ok(log_dir) => {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
            let log_filename = match name {
                Some(n) => format!("{}-{}.log", timestamp, n),
                None => format!("{}.log", timestamp),
            };
            let file_appender =
                tracing_appender::rolling::RollingFileAppender::new(Rotation::NEVER, log_dir, log_filename);

            let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("")
                    .add_directive("benchlaunch=debug".parse().unwrap())
                    .add_directive(LevelFilter::WARN.into())
            });

            Some(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(false)
                    .with_writer(file_appender)
                    .json()
                    .with_filter(env_filter),
            )
        }
        Err(e) => {
            eprintln!("Warning: file logging disabled: {}", e);
            None
        }
    };

    Registry::default()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to set global subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_log_directory_under_state_home() {
        let temp_dir = TempDir::new().unwrap();
        let state_home = temp_dir.path().join("state");
        let log_dir = temp_env::with_vars(
            [
                ("HOME", Some(temp_dir.path().as_os_str())),
                ("XDG_STATE_HOME", Some(state_home.as_os_str())),
            ],
            || get_log_directory().unwrap(),
        );

        assert!(log_dir.starts_with(state_home.join("benchlaunch").join("logs").join("cli")));
        assert!(log_dir.exists());
        let date = chrono::Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(log_dir.file_name().unwrap().to_str().unwrap(), date);
    }
}
