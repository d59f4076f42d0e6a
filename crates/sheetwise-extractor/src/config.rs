//! Configuration for the extraction pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest accepted gap between completion calls (seconds)
pub const MAX_PACING_INTERVAL_SECS: f64 = 3600.0;

/// Named options supplied at startup
///
/// `chunk_size` and `chunk_overlap` are carried here so a single file
/// configures both ingestion and extraction; the extractor itself only reads
/// the retrieval, pacing and timeout settings. The LLM settings are handed to
/// whichever provider the host constructs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum chunk length (characters)
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,

    /// Chunks retrieved per attribute
    pub retrieval_k: usize,

    /// Minimum delay between consecutive LLM calls (seconds)
    pub pacing_interval_seconds: f64,

    /// Sampling temperature passed to the provider
    pub llm_temperature: f32,

    /// Completion length cap passed to the provider
    pub llm_max_tokens: u32,

    /// Maximum time for a single extraction call (seconds)
    pub extraction_timeout_secs: u64,

    /// Re-run an attribute against web text when the documents say NOT FOUND
    pub web_fallback_on_not_found: bool,
}

impl PipelineConfig {
    /// Pacing interval as a Duration
    pub fn pacing_interval(&self) -> Duration {
        let seconds = self
            .pacing_interval_seconds
            .clamp(0.0, MAX_PACING_INTERVAL_SECS);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
    }

    /// Get the extraction timeout as a Duration
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err("chunk_overlap must be smaller than chunk_size".to_string());
        }
        if self.retrieval_k == 0 {
            return Err("retrieval_k must be greater than 0".to_string());
        }
        if !(0.0..=MAX_PACING_INTERVAL_SECS).contains(&self.pacing_interval_seconds) {
            return Err(format!(
                "pacing_interval_seconds must be between 0 and {}",
                MAX_PACING_INTERVAL_SECS
            ));
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err("llm_temperature must be between 0.0 and 2.0".to_string());
        }
        if self.llm_max_tokens == 0 {
            return Err("llm_max_tokens must be greater than 0".to_string());
        }
        if self.extraction_timeout_secs == 0 {
            return Err("extraction_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 75,
            retrieval_k: 3,
            pacing_interval_seconds: 1.0,
            llm_temperature: 0.1,
            llm_max_tokens: 1024,
            extraction_timeout_secs: 60,
            web_fallback_on_not_found: false,
        }
    }
}

impl PipelineConfig {
    /// Free-tier preset: slower pacing to stay clear of rate limits
    pub fn conservative() -> Self {
        Self {
            pacing_interval_seconds: 3.0,
            extraction_timeout_secs: 120,
            ..Self::default()
        }
    }

    /// Deterministic preset: no pacing, zero temperature, web fallback on
    pub fn deterministic() -> Self {
        Self {
            pacing_interval_seconds: 0.0,
            llm_temperature: 0.0,
            web_fallback_on_not_found: true,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(PipelineConfig::conservative().validate().is_ok());
        assert!(PipelineConfig::deterministic().validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_below_chunk_size() {
        let config = PipelineConfig {
            chunk_overlap: 500,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_pacing_rejected() {
        let config = PipelineConfig {
            pacing_interval_seconds: -1.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_pacing_rejected() {
        for pacing in [1e30, f64::INFINITY, f64::NAN, MAX_PACING_INTERVAL_SECS + 1.0] {
            let config = PipelineConfig {
                pacing_interval_seconds: pacing,
                ..PipelineConfig::default()
            };
            assert!(config.validate().is_err(), "accepted {}", pacing);
            assert!(config.pacing_interval() <= Duration::from_secs(3600));
        }
    }

    #[test]
    fn test_zero_retrieval_k_rejected() {
        let config = PipelineConfig {
            retrieval_k: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pacing_interval_duration() {
        let config = PipelineConfig {
            pacing_interval_seconds: 1.5,
            ..PipelineConfig::default()
        };
        assert_eq!(config.pacing_interval(), Duration::from_millis(1500));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PipelineConfig::conservative();
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = PipelineConfig::from_toml("retrieval_k = 5\n").unwrap();
        assert_eq!(parsed.retrieval_k, 5);
        assert_eq!(parsed.chunk_size, 500);
        assert!(!parsed.web_fallback_on_not_found);
    }
}
