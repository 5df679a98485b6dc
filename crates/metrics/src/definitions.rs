//! Metric name and label definitions.

/// Configuration validation metrics
pub mod config {
    /// Validations performed, labelled by `result` ("ok" / "rejected")
    pub const VALIDATIONS_TOTAL: &str = "clawline_config_validations_total";
}

/// Media understanding metrics
pub mod media_understanding {
    /// Capability runs, labelled by capability and outcome
    pub const RUNS_TOTAL: &str = "clawline_media_understanding_runs_total";
    /// Wall time of one capability run
    pub const RUN_DURATION_SECONDS: &str = "clawline_media_understanding_run_duration_seconds";
    /// Provider attempts that failed or timed out
    pub const PROVIDER_ERRORS_TOTAL: &str = "clawline_media_understanding_provider_errors_total";
    /// Contexts whose attachment references were stripped from the prompt
    pub const STRIPPED_TOTAL: &str = "clawline_media_understanding_stripped_total";
}

/// Attachment cache metrics
pub mod media {
    /// Bytes loaded from paths or URLs into attachment buffers
    pub const BYTES_LOADED_TOTAL: &str = "clawline_media_bytes_loaded_total";
    /// Attachment cleanups that failed to release a temp file
    pub const CLEANUP_ERRORS_TOTAL: &str = "clawline_media_cleanup_errors_total";
}

/// Common label keys
pub mod labels {
    pub const CAPABILITY: &str = "capability";
    pub const OUTCOME: &str = "outcome";
    pub const PROVIDER: &str = "provider";
    pub const SOURCE: &str = "source";
}
