use crate::telemetry::LogFormat;
use crate::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

/// Environment variable naming an optional settings file.
pub const CONFIG_PATH_ENV: &str = "PIPELINE_CONFIG";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Bucket holding the accumulated `data/processed_data.csv`.
    #[serde(default)]
    pub output_bucket_name: Option<String>,
    /// State machine started by the notification adapter.
    #[serde(default)]
    pub stepfunction_arn: Option<String>,
    /// Propagate history read failures other than "not found" instead of
    /// continuing without prior data.
    #[serde(default)]
    pub strict_history: bool,
    #[serde(default = "default_lock_enabled")]
    pub lock_enabled: bool,
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
    #[serde(default = "default_lock_retries")]
    pub lock_retries: u32,
    #[serde(default = "default_lock_retry_base_ms")]
    pub lock_retry_base_ms: u64,
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    #[serde(default)]
    pub s3_region: Option<String>,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_lock_enabled() -> bool {
    true
}

// Lambda's maximum run time; a lock older than this has no live owner.
fn default_lock_ttl_secs() -> u64 {
    900
}

fn default_lock_retries() -> u32 {
    5
}

fn default_lock_retry_base_ms() -> u64 {
    200
}

impl Settings {
    /// Loads settings from the optional file at `path` (or the file named by
    /// `PIPELINE_CONFIG`) overlaid with the process environment.
    pub fn new(path: Option<&str>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let path = path.or(env_path.as_deref());
        Self::build(path, Environment::default().try_parsing(true))
    }

    fn build(path: Option<&str>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }

        let config = builder.add_source(environment).build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            output_bucket = ?settings.output_bucket_name,
            stepfunction_arn = ?settings.stepfunction_arn,
            strict_history = settings.strict_history,
            lock_enabled = settings.lock_enabled,
            "Loaded pipeline settings"
        );

        Ok(settings)
    }

    pub fn output_bucket(&self) -> Result<&str> {
        self.output_bucket_name
            .as_deref()
            .filter(|bucket| !bucket.is_empty())
            .ok_or(Error::MissingSetting("output_bucket_name"))
    }

    pub fn stepfunction_arn(&self) -> Result<&str> {
        self.stepfunction_arn
            .as_deref()
            .filter(|arn| !arn.is_empty())
            .ok_or(Error::MissingSetting("stepfunction_arn"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().try_parsing(true).source(Some(map))
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = Settings::build(None, env(&[])).unwrap();

        assert!(settings.output_bucket_name.is_none());
        assert!(!settings.strict_history);
        assert!(settings.lock_enabled);
        assert_eq!(settings.lock_ttl_secs, 900);
        assert_eq!(settings.lock_retries, 5);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert!(matches!(
            settings.output_bucket(),
            Err(Error::MissingSetting("output_bucket_name"))
        ));
        assert!(matches!(
            settings.stepfunction_arn(),
            Err(Error::MissingSetting("stepfunction_arn"))
        ));
    }

    #[test]
    fn reads_lambda_environment_variables() {
        let settings = Settings::build(
            None,
            env(&[
                ("output_bucket_name", "sales-output"),
                ("stepfunction_arn", "arn:aws:states:us-east-1:123:stateMachine:sales"),
                ("strict_history", "true"),
                ("lock_retries", "2"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.output_bucket().unwrap(), "sales-output");
        assert_eq!(
            settings.stepfunction_arn().unwrap(),
            "arn:aws:states:us-east-1:123:stateMachine:sales"
        );
        assert!(settings.strict_history);
        assert_eq!(settings.lock_retries, 2);
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "output_bucket_name = \"from-file\"").unwrap();
        writeln!(file, "lock_enabled = false").unwrap();
        writeln!(file, "log_format = \"pretty\"").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let settings =
            Settings::build(Some(&path), env(&[("output_bucket_name", "from-env")])).unwrap();

        assert_eq!(settings.output_bucket().unwrap(), "from-env");
        assert!(!settings.lock_enabled);
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }

    #[test]
    fn malformed_values_surface_as_config_errors() {
        let err = Settings::build(None, env(&[("lock_ttl_secs", "soon")])).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Settings::build(Some("/nonexistent/pipeline.toml"), env(&[])).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }
}
