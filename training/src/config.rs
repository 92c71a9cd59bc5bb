//! YAML configuration for the training pipelines and the classifier CLI.
//!
//! Every section and field is optional; missing values take their defaults.
//!
//! ```yaml
//! detector:
//!   whitelist: ["github.com", "intranet.local"]
//!   thresholds:
//!     short_domain_max_len: 15
//!     short_domain_threshold: 0.85
//!     long_domain_threshold: 0.65
//! classical:
//!   forest:
//!     n_trees: 200
//! sequence:
//!   epochs: 5
//!   model:
//!     filters: 128
//! ```

use std::path::Path;

use phishnet_core::{PhishnetError, Result};
use phishnet_detect::decision::DetectorConfig;
use phishnet_detect::device::DevicePreference;
use phishnet_detect::feature_extraction::FeatureConfig;
use serde::{Deserialize, Serialize};

use crate::training::classical::ClassicalTrainConfig;
use crate::training::trainer::SequenceTrainConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhishnetConfig {
    pub detector: DetectorConfig,
    pub features: FeatureConfig,
    pub classical: ClassicalTrainConfig,
    pub sequence: SequenceTrainConfig,
    pub device: DevicePreference,
}

impl PhishnetConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.detector.thresholds.validate()?;
        self.classical.forest.validate()?;
        self.sequence.validate()
    }
}

/// Load configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<PhishnetConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        PhishnetError::Config(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    let config: PhishnetConfig = serde_yaml::from_str(&contents)
        .map_err(|e| PhishnetError::Config(format!("Failed to parse config YAML: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if given, otherwise return defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<PhishnetConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(PhishnetConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper to write YAML to a temp file and return the path.
    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_config_empty_document_uses_defaults() {
        let f = write_yaml("{}\n");
        let config = load_config(f.path()).unwrap();
        assert_eq!(config, PhishnetConfig::default());
    }

    #[test]
    fn test_load_config_partial_sections() {
        let yaml = r#"
detector:
  whitelist: ["intranet.local"]
  thresholds:
    long_domain_threshold: 0.7
classical:
  forest:
    n_trees: 10
  seed: 7
sequence:
  epochs: 3
  model:
    filters: 128
device: cpu
"#;
        let f = write_yaml(yaml);
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.detector.whitelist, vec!["intranet.local".to_string()]);
        assert!(config.detector.strip_www);
        assert!((config.detector.thresholds.long_domain_threshold - 0.7).abs() < 1e-9);
        assert!((config.detector.thresholds.short_domain_threshold - 0.85).abs() < 1e-9);
        assert_eq!(config.classical.forest.n_trees, 10);
        assert_eq!(config.classical.seed, 7);
        assert!((config.classical.test_ratio - 0.2).abs() < 1e-9);
        assert_eq!(config.sequence.epochs, 3);
        assert_eq!(config.sequence.model.filters, 128);
        assert_eq!(config.sequence.model.kernel_size, 5);
        assert_eq!(config.device, DevicePreference::Cpu);
        assert_eq!(config.features, FeatureConfig::default());
    }

    #[test]
    fn test_load_config_rejects_out_of_range_values() {
        let f = write_yaml("sequence:\n  epochs: 50\n");
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("epochs"));
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let f = write_yaml("detector: [unclosed");
        assert!(matches!(
            load_config(f.path()),
            Err(PhishnetError::Config(_))
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/phishnet.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_without_path() {
        assert_eq!(load_or_default(None).unwrap(), PhishnetConfig::default());
    }
}
