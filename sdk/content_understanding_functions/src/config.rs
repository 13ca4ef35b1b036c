//! Processor configuration.

use std::time::Duration;

use content_understanding_analyzers::analyzer::PollOptions;
use content_understanding_analyzers::models::PREBUILT_DOCUMENT_ANALYZER;
use content_understanding_analyzers::schema::SchemaDefinition;
use content_understanding_core::error::{ContentUnderstandingError, ContentUnderstandingResult};

/// Environment variable overriding the document analyzer id.
pub const ANALYZER_ID_ENV: &str = "AI_CONTENT_UNDERSTANDING_ANALYZER_ID";

/// Environment variable overriding the poll interval, in whole seconds.
pub const POLL_INTERVAL_ENV: &str = "AI_CONTENT_UNDERSTANDING_POLL_INTERVAL_SECS";

/// Environment variable overriding the poll deadline, in whole seconds.
pub const MAX_WAIT_ENV: &str = "AI_CONTENT_UNDERSTANDING_MAX_WAIT_SECS";

/// How documents are analyzed.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Analyzer used when no schema is configured.
    pub analyzer_id: String,
    /// Extraction schema registered on first use; its id replaces `analyzer_id`.
    pub schema: Option<SchemaDefinition>,
    /// Poll interval and deadline.
    pub poll: PollOptions,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            analyzer_id: PREBUILT_DOCUMENT_ANALYZER.to_string(),
            schema: None,
            poll: PollOptions::default(),
        }
    }
}

impl ProcessorConfig {
    /// Reads overrides from the environment on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ContentUnderstandingError::MissingConfig`] when a duration
    /// variable is set but is not a whole number of seconds.
    pub fn from_env() -> ContentUnderstandingResult<Self> {
        let mut config = Self::default();

        if let Some(analyzer_id) = env_var(ANALYZER_ID_ENV) {
            config.analyzer_id = analyzer_id;
        }
        if let Some(interval) = env_seconds(POLL_INTERVAL_ENV)? {
            config.poll.interval = interval;
        }
        if let Some(max_wait) = env_seconds(MAX_WAIT_ENV)? {
            config.poll.max_wait = max_wait;
        }

        Ok(config)
    }

    /// Sets the analyzer id.
    pub fn with_analyzer_id(mut self, analyzer_id: impl Into<String>) -> Self {
        self.analyzer_id = analyzer_id.into();
        self
    }

    /// Sets the extraction schema.
    pub fn with_schema(mut self, schema: SchemaDefinition) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the poll options.
    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_seconds(name: &str) -> ContentUnderstandingResult<Option<Duration>> {
    env_var(name)
        .map(|raw| {
            raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                ContentUnderstandingError::MissingConfig(format!(
                    "{name} must be a whole number of seconds, got {raw:?}"
                ))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [ANALYZER_ID_ENV, POLL_INTERVAL_ENV, MAX_WAIT_ENV] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_defaults_use_prebuilt_document_analyzer() {
        let config = ProcessorConfig::default();
        assert_eq!(config.analyzer_id, "prebuilt-documentAnalyzer");
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.poll.max_wait, Duration::from_secs(60));
        assert!(config.schema.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_overrides() {
        clear_env();
        std::env::set_var(ANALYZER_ID_ENV, "custom-analyzer");
        std::env::set_var(POLL_INTERVAL_ENV, "5");
        std::env::set_var(MAX_WAIT_ENV, " 120 ");

        let config = ProcessorConfig::from_env().expect("valid config");
        assert_eq!(config.analyzer_id, "custom-analyzer");
        assert_eq!(config.poll.interval, Duration::from_secs(5));
        assert_eq!(config.poll.max_wait, Duration::from_secs(120));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_invalid_durations() {
        clear_env();
        std::env::set_var(POLL_INTERVAL_ENV, "two");

        let err = ProcessorConfig::from_env().unwrap_err();
        assert!(matches!(err, ContentUnderstandingError::MissingConfig(_)));
        assert!(err.to_string().contains(POLL_INTERVAL_ENV), "error: {err}");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_without_overrides_uses_defaults() {
        clear_env();
        let config = ProcessorConfig::from_env().expect("valid config");
        assert_eq!(config.analyzer_id, PREBUILT_DOCUMENT_ANALYZER);
    }
}
