use serde::Deserialize;

use crate::error::{Error, Result};
use crate::session::TlsOptions;

/// Sample configuration, as shown by `kafka-metrics sample-config`.
pub const SAMPLE_CONFIG: &str = r#"
  ## kafka servers
  brokers = "localhost:9092"
  ## topic(s) to consume
  topics = ["metrics"]

  ## Optional SSL Config
  ## When enabled, ssl_ca, ssl_cert and ssl_key are required.
  ssl_enabled = false
  # ssl_ca = "/etc/kafka-metrics/ca.pem"
  # ssl_cert = "/etc/kafka-metrics/cert.pem"
  # ssl_key = "/etc/kafka-metrics/key.pem"
  ## Only needed if the key file is encrypted
  # ssl_keypwd = ""

  ## the name of the consumer group
  consumer_group = "metrics_consumers"
  ## Offset (must be one of the following: "beginning", "earliest", "end",
  ## "latest", "unset", "invalid", "stored"); anything else means "latest"
  offset = "latest"

  ## Data format to consume.
  data_format = "json"

  ## Maximum length of a message to consume, in bytes (default 0/unlimited);
  ## larger messages are dropped
  max_message_len = 65536
"#;

/// Configuration for the Kafka consumer input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Topics to subscribe to
    pub topics: Vec<String>,
    /// Consumer group ID
    pub consumer_group: String,
    /// Starting offset policy when the group has no committed offset
    pub offset: String,
    /// Connect over TLS; all `ssl_*` settings are ignored unless set
    pub ssl_enabled: bool,
    /// Path to CA file
    pub ssl_ca: String,
    /// Path to host cert file
    pub ssl_cert: String,
    /// Path to cert key file
    pub ssl_key: String,
    /// Passphrase of the key file, if it has one
    pub ssl_keypwd: String,
    /// Payload format, selects the parser
    pub data_format: String,
    /// Largest payload accepted, in bytes; 0 means unlimited
    pub max_message_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topics: vec!["metrics".to_string()],
            consumer_group: "metrics_consumers".to_string(),
            offset: "latest".to_string(),
            ssl_enabled: false,
            ssl_ca: String::new(),
            ssl_cert: String::new(),
            ssl_key: String::new(),
            ssl_keypwd: String::new(),
            data_format: "json".to_string(),
            max_message_len: 0,
        }
    }
}

impl Config {
    pub fn tls(&self) -> TlsOptions {
        TlsOptions {
            enabled: self.ssl_enabled,
            ca: self.ssl_ca.clone(),
            cert: self.ssl_cert.clone(),
            key: self.ssl_key.clone(),
            key_password: self.ssl_keypwd.clone(),
        }
    }

    /// Reject configurations that can never connect.
    ///
    /// The offset policy is deliberately not checked here; unknown values
    /// fall back to `latest` when the session is built.
    pub fn validate(&self) -> Result<()> {
        if self.brokers.trim().is_empty() {
            return Err(Error::InvalidConfig("brokers must not be empty".to_string()));
        }
        if self.topics.is_empty() || self.topics.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::InvalidConfig(
                "topics must list at least one non-empty topic".to_string(),
            ));
        }
        if self.consumer_group.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "consumer_group must not be empty".to_string(),
            ));
        }
        if self.ssl_enabled {
            for (name, value) in [
                ("ssl_ca", &self.ssl_ca),
                ("ssl_cert", &self.ssl_cert),
                ("ssl_key", &self.ssl_key),
            ] {
                if value.is_empty() {
                    return Err(Error::InvalidConfig(format!(
                        "{name} is required when ssl_enabled is true"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.brokers, "localhost:9092");
        assert_eq!(config.topics, vec!["metrics"]);
        assert_eq!(config.max_message_len, 65536);
        assert!(!config.ssl_enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config: Config = toml::from_str(r#"topics = ["a", "b"]"#).unwrap();
        assert_eq!(config.topics, vec!["a", "b"]);
        assert_eq!(config.offset, "latest");
        assert_eq!(config.data_format, "json");
        assert_eq!(config.max_message_len, 0);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<Config>("topic = \"a\"").is_err());
    }

    #[test]
    fn test_validate_ssl_requires_paths() {
        let config = Config {
            ssl_enabled: true,
            ssl_ca: "/ca.pem".to_string(),
            ssl_cert: "/cert.pem".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ssl_key"));

        let config = Config {
            ssl_key: "/key.pem".to_string(),
            ..config
        };
        config.validate().unwrap();
        assert_eq!(config.tls().key_password, "");
    }

    #[test]
    fn test_validate_ssl_disabled_ignores_paths() {
        let config = Config {
            ssl_enabled: false,
            ..Default::default()
        };
        config.validate().unwrap();
        assert!(!config.tls().enabled);
    }

    #[test]
    fn test_validate_rejects_empty_topics() {
        let config = Config {
            topics: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_accepts_unknown_offset() {
        let config = Config {
            offset: "bogus".to_string(),
            ..Default::default()
        };
        config.validate().unwrap();
    }
}
