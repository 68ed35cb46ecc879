use super::lock::LockOptions;
use common::Result;
use common::config::Settings;

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    pub output_bucket: String,
    pub strict_history: bool,
    /// `None` disables the writer lock.
    pub lock: Option<LockOptions>,
}

impl ProcessorOptions {
    pub fn new(output_bucket: &str) -> Self {
        Self {
            output_bucket: output_bucket.to_string(),
            strict_history: false,
            lock: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            output_bucket: settings.output_bucket()?.to_string(),
            strict_history: settings.strict_history,
            lock: LockOptions::from_settings(settings),
        })
    }

    pub fn with_strict_history(mut self, strict: bool) -> Self {
        self.strict_history = strict;
        self
    }

    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = Some(lock);
        self
    }
}
