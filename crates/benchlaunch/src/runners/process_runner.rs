use crate::errors::{LaunchError, LaunchResult};
use crate::launch_plan::LaunchPlan;
use crate::work_dir::WorkDir;
use std::process::{Command, ExitStatus};

/// Runs a [`LaunchPlan`] from its working directory and reports the driver's exit code.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        ProcessRunner
    }

    pub fn run(&self, plan: &LaunchPlan) -> LaunchResult<i32> {
        let argv = split_command(plan.command())?;

        let work_dir = WorkDir::enter(plan.working_dir())?;
        tracing::info!("running driver in {}", work_dir.path.display());

        let status = Command::new(&argv[0])
            .args(&argv[1..])
            .envs(plan.env().iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()?;

        let code = exit_code(status);
        if code == 0 {
            tracing::info!("driver finished successfully");
        } else {
            tracing::error!("driver exited with status {}", code);
        }
        Ok(code)
    }
}

/// Split a command line using shell word rules.
pub fn split_command(command: &str) -> LaunchResult<Vec<String>> {
    let argv = shlex::split(command)
        .ok_or_else(|| LaunchError::CommandParse(format!("unbalanced quoting in '{}'", command)))?;
    if argv.is_empty() {
        return Err(LaunchError::CommandParse("empty command".to_string()));
    }
    Ok(argv)
}

fn exit_code(status: ExitStatus) -> i32 {
    // Killed by a signal: no code to forward.
    status.code().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        let argv = split_command("python 'my script.py' --data_dir /data").unwrap();
        assert_eq!(argv, vec!["python", "my script.py", "--data_dir", "/data"]);
    }

    #[test]
    fn test_split_command_errors() {
        assert!(matches!(
            split_command("python 'unterminated"),
            Err(LaunchError::CommandParse(_))
        ));
        assert!(matches!(
            split_command("   "),
            Err(LaunchError::CommandParse(_))
        ));
    }
}
