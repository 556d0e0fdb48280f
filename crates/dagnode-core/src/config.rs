//! Node configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! pins = "/var/lib/dagnode/pins.json"
//!
//! [naming]
//! max_depth = 32
//! cache_ttl = 60        # seconds
//! cache_capacity = 128
//!
//! [verify]
//! channel_capacity = 64
//!
//! [dag.default_format]
//! codec = "dag-cbor"
//! hash_fn = "sha2-256"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dagnode_name::NamingConfig;
use dagnode_pin::DEFAULT_CHANNEL_CAPACITY;
use dagnode_store::CidFormat;

use crate::error::{CoreError, CoreResult};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// File holding the pin set. In-memory when unset.
    pub pins: Option<PathBuf>,
    pub naming: NamingConfig,
    pub verify: VerifyConfig,
    pub dag: DagConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Status records buffered ahead of a slow consumer.
    pub channel_capacity: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Format used by put when the caller does not choose one.
    pub default_format: CidFormat,
}

impl NodeConfig {
    pub fn from_toml_str(s: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string(self).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.naming.max_depth == 0 {
            return Err(CoreError::Config("naming.max_depth must be at least 1".into()));
        }
        if self.verify.channel_capacity == 0 {
            return Err(CoreError::Config(
                "verify.channel_capacity must be at least 1".into(),
            ));
        }
        self.dag.default_format.hasher()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use dagnode_types::{Codec, HashFn};

    #[test]
    fn empty_document_gives_defaults() {
        let config = NodeConfig::from_toml_str("").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert!(config.pins.is_none());
        assert_eq!(config.naming.max_depth, 32);
        assert_eq!(config.naming.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.naming.cache_capacity, 128);
        assert_eq!(config.verify.channel_capacity, 64);
        assert_eq!(config.dag.default_format, CidFormat::default());
    }

    #[test]
    fn full_document_parses() {
        let config = NodeConfig::from_toml_str(
            r#"
            pins = "state/pins.json"

            [naming]
            max_depth = 4
            cache_ttl = 5
            cache_capacity = 16

            [verify]
            channel_capacity = 8

            [dag.default_format]
            codec = "dag-json"
            hash_fn = "blake3"
            hash_len = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.pins, Some(PathBuf::from("state/pins.json")));
        assert_eq!(config.naming.max_depth, 4);
        assert_eq!(config.naming.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.naming.cache_capacity, 16);
        assert_eq!(config.verify.channel_capacity, 8);
        assert_eq!(config.dag.default_format.codec, Codec::DagJson);
        assert_eq!(config.dag.default_format.hash_fn, HashFn::Blake3);
        assert_eq!(config.dag.default_format.hash_len, Some(20));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = NodeConfig::from_toml_str("[naming]\nmax_depth = 2\n").unwrap();
        assert_eq!(config.naming.max_depth, 2);
        assert_eq!(config.naming.cache_capacity, 128);
        assert_eq!(config.verify.channel_capacity, 64);
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(matches!(
            NodeConfig::from_toml_str("[naming]\nmax_depth = 0\n"),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            NodeConfig::from_toml_str("[verify]\nchannel_capacity = 0\n"),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn oversized_hash_len_is_rejected() {
        let err = NodeConfig::from_toml_str(
            "[dag.default_format]\ncodec = \"dag-cbor\"\nhash_fn = \"sha2-256\"\nhash_len = 64\n",
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = NodeConfig::from_toml_str("pins = [").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert_eq!(err.severity(), dagnode_types::ErrorSeverity::Client);
    }

    #[test]
    fn load_reads_file_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        let mut config = NodeConfig::default();
        config.pins = Some(dir.path().join("pins.json"));
        config.naming.max_depth = 7;
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(NodeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_of_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NodeConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
