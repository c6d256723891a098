//! MediatorConfig - デプロイごとのパイプライン設定
//!
//! behavior の並びは設定で決めます（固定のデフォルト順は持たない）。
//! 組み込み以外の名前は `register_global_behavior` で登録した behavior を指します。
//! デフォルト設定は behavior なし = Handler を直接呼ぶパイプラインです。
//!
//! ```json
//! { "pipeline": ["metrics", "logging", "validation"], "dispatch_timeout_ms": 5000 }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One slot in `MediatorConfig::pipeline`, listed outermost first.
///
/// Serialized as a plain string: `"logging"`, `"validation"`, or the name a
/// global behavior was registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BehaviorKind {
    /// Applies to every request type.
    Logging,
    /// Applies to commands only.
    Validation,
    /// A behavior registered with `MediatorBuilder::register_global_behavior`.
    Named(String),
}

impl BehaviorKind {
    pub fn named(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    pub fn is_built_in(&self) -> bool {
        !matches!(self, BehaviorKind::Named(_))
    }
}

impl From<String> for BehaviorKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "logging" => BehaviorKind::Logging,
            "validation" => BehaviorKind::Validation,
            _ => BehaviorKind::Named(name),
        }
    }
}

impl From<BehaviorKind> for String {
    fn from(kind: BehaviorKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BehaviorKind::Logging => f.write_str("logging"),
            BehaviorKind::Validation => f.write_str("validation"),
            BehaviorKind::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mediator config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediatorConfig {
    /// Behavior order, outermost first.
    pub pipeline: Vec<BehaviorKind>,

    /// Deadline applied by `Mediator::send`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_timeout_ms: Option<u64>,
}

impl MediatorConfig {
    pub fn with_pipeline(pipeline: impl IntoIterator<Item = BehaviorKind>) -> Self {
        Self {
            pipeline: pipeline.into_iter().collect(),
            dispatch_timeout_ms: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_no_behaviors() {
        let config = MediatorConfig::default();
        assert!(config.pipeline.is_empty());
        assert_eq!(config.dispatch_timeout(), None);
    }

    #[test]
    fn parses_pipeline_in_order() {
        let config = MediatorConfig::from_json_str(
            r#"{ "pipeline": ["validation", "logging"], "dispatch_timeout_ms": 250 }"#,
        )
        .unwrap();

        assert_eq!(config.pipeline, vec![BehaviorKind::Validation, BehaviorKind::Logging]);
        assert_eq!(config.dispatch_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = MediatorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, MediatorConfig::default());
    }

    #[test]
    fn other_names_refer_to_global_behaviors() {
        let config = MediatorConfig::from_json_str(r#"{ "pipeline": ["metrics", "logging"] }"#).unwrap();

        assert_eq!(config.pipeline, vec![BehaviorKind::named("metrics"), BehaviorKind::Logging]);
        assert!(!config.pipeline[0].is_built_in());
        assert_eq!(
            serde_json::to_string(&config.pipeline).unwrap(),
            r#"["metrics","logging"]"#
        );
    }

    #[test]
    fn non_string_behavior_is_rejected() {
        let err = MediatorConfig::from_json_str(r#"{ "pipeline": [7] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = MediatorConfig::from_json_str(r#"{ "behaviours": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "pipeline": ["logging"] }}"#).unwrap();

        let config = MediatorConfig::from_path(file.path()).unwrap();
        assert_eq!(config, MediatorConfig::with_pipeline([BehaviorKind::Logging]));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = MediatorConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
