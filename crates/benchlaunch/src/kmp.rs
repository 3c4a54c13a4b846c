//! OpenMP runtime (`KMP_*`) tuning variables shipped alongside a model.
//!
//! The file looks like:
//!
//! ```json
//! {
//!   "optimization_parameters": {
//!     "KMP_AFFINITY": "granularity=fine,verbose,compact,1,0",
//!     "KMP_BLOCKTIME": 1,
//!     "KMP_SETTINGS": 1
//!   }
//! }
//! ```
use crate::errors::{LaunchError, LaunchResult};
use serde_json::Value;
use std::fs;
use std::path::Path;

const PARAMETERS_KEY: &str = "optimization_parameters";

/// KMP variables in file order, with command-line overrides applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KmpSettings {
    vars: Vec<(String, String)>,
}

impl KmpSettings {
    pub fn load(path: &Path) -> LaunchResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
            .map_err(|e| LaunchError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Like [`KmpSettings::load`], but a missing file yields no variables.
    pub fn load_optional(path: &Path) -> LaunchResult<Self> {
        if !path.exists() {
            tracing::debug!("no KMP config at {}, skipping", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_json_str(content: &str) -> LaunchResult<Self> {
        let root: Value = serde_json::from_str(content)?;
        let params = root
            .get(PARAMETERS_KEY)
            .and_then(Value::as_object)
            .ok_or_else(|| {
                LaunchError::Config(format!("missing '{}' object", PARAMETERS_KEY))
            })?;

        let mut vars = Vec::with_capacity(params.len());
        for (key, value) in params {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(LaunchError::Config(format!(
                        "unsupported value for {}: {}",
                        key, other
                    )))
                }
            };
            vars.push((key.clone(), value));
        }
        Ok(KmpSettings { vars })
    }

    /// Replace (or append) a variable, e.g. from `--kmp-blocktime`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variables to hand to the child, leaving alone anything the parent
    /// environment already defines.
    pub fn unset_in<F>(&self, is_set: F) -> Vec<(String, String)>
    where
        F: Fn(&str) -> bool,
    {
        self.vars
            .iter()
            .filter(|(key, _)| {
                let keep = !is_set(key);
                if !keep {
                    tracing::debug!("{} already set in the environment, keeping it", key);
                }
                keep
            })
            .cloned()
            .collect()
    }
}
