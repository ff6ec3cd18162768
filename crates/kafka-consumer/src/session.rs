//! Connection settings handed to the broker client.
//!
//! [`SessionConfig::build`] never fails: an unrecognized offset policy is
//! replaced by [`OffsetPolicy::Latest`] with a warning, and TLS file paths
//! are passed through unchecked (a bad path surfaces as a connect error).

use tracing::{info, warn};

/// Consumer group session timeout.
pub const SESSION_TIMEOUT_MS: u32 = 6000;

/// Where to start consuming when the group has no usable committed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetPolicy {
    Beginning,
    Earliest,
    End,
    #[default]
    Latest,
    Unset,
    Invalid,
    Stored,
}

impl OffsetPolicy {
    pub const ALL: [OffsetPolicy; 7] = [
        OffsetPolicy::Beginning,
        OffsetPolicy::Earliest,
        OffsetPolicy::End,
        OffsetPolicy::Latest,
        OffsetPolicy::Unset,
        OffsetPolicy::Invalid,
        OffsetPolicy::Stored,
    ];

    /// Match a configuration token, ignoring case.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.to_lowercase();
        Self::ALL.into_iter().find(|policy| policy.as_str() == token)
    }

    /// Like [`OffsetPolicy::parse`], falling back to `Latest` for anything
    /// outside the accepted set.
    pub fn resolve(token: &str) -> Self {
        match Self::parse(token) {
            Some(policy) => {
                info!("Kafka consumer offset will be set to '{}'", policy.as_str());
                policy
            }
            None => {
                warn!("Kafka consumer invalid offset '{token}', using 'latest'");
                OffsetPolicy::Latest
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetPolicy::Beginning => "beginning",
            OffsetPolicy::Earliest => "earliest",
            OffsetPolicy::End => "end",
            OffsetPolicy::Latest => "latest",
            OffsetPolicy::Unset => "unset",
            OffsetPolicy::Invalid => "invalid",
            OffsetPolicy::Stored => "stored",
        }
    }

    /// Value for librdkafka's `auto.offset.reset`.
    ///
    /// `unset`, `invalid` and `stored` only ever resume from a committed
    /// offset, which librdkafka spells `error`: with nothing committed the
    /// client reports an error instead of jumping to either end.
    pub fn auto_offset_reset(&self) -> &'static str {
        match self {
            OffsetPolicy::Beginning | OffsetPolicy::Earliest => "earliest",
            OffsetPolicy::End | OffsetPolicy::Latest => "latest",
            OffsetPolicy::Unset | OffsetPolicy::Invalid | OffsetPolicy::Stored => "error",
        }
    }
}

/// Transport security options as they appear in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    pub enabled: bool,
    /// Path to CA file
    pub ca: String,
    /// Path to client certificate file
    pub cert: String,
    /// Path to client key file
    pub key: String,
    /// Key passphrase; empty for an unencrypted key
    pub key_password: String,
}

/// TLS connection parameters, present only when TLS is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    pub ca_location: String,
    pub certificate_location: String,
    pub key_location: String,
    pub key_password: Option<String>,
}

impl SecurityConfig {
    pub fn build(options: &TlsOptions) -> Option<Self> {
        if !options.enabled {
            return None;
        }
        Some(Self {
            ca_location: options.ca.clone(),
            certificate_location: options.cert.clone(),
            key_location: options.key.clone(),
            key_password: (!options.key_password.is_empty()).then(|| options.key_password.clone()),
        })
    }

    pub fn client_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("security.protocol", "ssl".to_string()),
            ("ssl.ca.location", self.ca_location.clone()),
            ("ssl.certificate.location", self.certificate_location.clone()),
            ("ssl.key.location", self.key_location.clone()),
        ];
        if let Some(password) = &self.key_password {
            params.push(("ssl.key.password", password.clone()));
        }
        params
    }
}

/// Full broker session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    pub session_timeout_ms: u32,
    /// Surface non-message events (partition EOF) on the event stream
    pub events_channel: bool,
    /// Surface partition assignment/revocation on the event stream
    pub application_rebalance: bool,
    pub offset_policy: OffsetPolicy,
    pub security: Option<SecurityConfig>,
}

impl SessionConfig {
    pub fn build(brokers: &str, group_id: &str, offset: &str, tls: &TlsOptions) -> Self {
        let security = SecurityConfig::build(tls);
        if security.is_some() {
            info!("Will connect to Kafka with SSL configuration");
        }
        Self {
            brokers: brokers.to_string(),
            group_id: group_id.to_string(),
            session_timeout_ms: SESSION_TIMEOUT_MS,
            events_channel: true,
            application_rebalance: true,
            offset_policy: OffsetPolicy::resolve(offset),
            security,
        }
    }

    /// Render as librdkafka configuration properties.
    pub fn client_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("bootstrap.servers", self.brokers.clone()),
            ("group.id", self.group_id.clone()),
            ("session.timeout.ms", self.session_timeout_ms.to_string()),
            ("enable.partition.eof", self.events_channel.to_string()),
            (
                "auto.offset.reset",
                self.offset_policy.auto_offset_reset().to_string(),
            ),
        ];
        if let Some(security) = &self.security {
            params.extend(security.client_params());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    fn tls_enabled(key_password: &str) -> TlsOptions {
        TlsOptions {
            enabled: true,
            ca: "/etc/kafka/ca.pem".to_string(),
            cert: "/etc/kafka/cert.pem".to_string(),
            key: "/etc/kafka/key.pem".to_string(),
            key_password: key_password.to_string(),
        }
    }

    #[test]
    fn test_offset_policy_accepts_known_tokens_any_case() {
        for policy in OffsetPolicy::ALL {
            let token = policy.as_str();
            assert_eq!(OffsetPolicy::resolve(token), policy);
            assert_eq!(OffsetPolicy::resolve(&token.to_uppercase()), policy);
        }
        assert_eq!(OffsetPolicy::resolve("LaTeSt"), OffsetPolicy::Latest);
        assert_eq!(OffsetPolicy::resolve("Beginning"), OffsetPolicy::Beginning);
    }

    #[test]
    fn test_offset_policy_falls_back_to_latest() {
        assert_eq!(OffsetPolicy::parse("bogus"), None);
        assert_eq!(OffsetPolicy::resolve("bogus"), OffsetPolicy::Latest);
        assert_eq!(OffsetPolicy::resolve(""), OffsetPolicy::Latest);
        assert_eq!(OffsetPolicy::resolve("oldest"), OffsetPolicy::Latest);
    }

    #[test]
    fn test_offset_policy_auto_offset_reset() {
        assert_eq!(OffsetPolicy::Beginning.auto_offset_reset(), "earliest");
        assert_eq!(OffsetPolicy::End.auto_offset_reset(), "latest");
        assert_eq!(OffsetPolicy::Stored.auto_offset_reset(), "error");
    }

    #[test]
    fn test_security_disabled_sets_nothing() {
        let tls = TlsOptions {
            enabled: false,
            ..tls_enabled("secret")
        };
        assert_eq!(SecurityConfig::build(&tls), None);

        let session = SessionConfig::build("localhost:9092", "group", "latest", &tls);
        let params = session.client_params();
        assert!(params.iter().all(|(k, _)| !k.starts_with("ssl.")));
        assert_eq!(param(&params, "security.protocol"), None);
    }

    #[test]
    fn test_security_enabled_without_passphrase_omits_key_password() {
        let session = SessionConfig::build("localhost:9092", "group", "latest", &tls_enabled(""));
        let params = session.client_params();

        assert_eq!(param(&params, "security.protocol"), Some("ssl"));
        assert_eq!(param(&params, "ssl.ca.location"), Some("/etc/kafka/ca.pem"));
        assert_eq!(
            param(&params, "ssl.certificate.location"),
            Some("/etc/kafka/cert.pem")
        );
        assert_eq!(param(&params, "ssl.key.location"), Some("/etc/kafka/key.pem"));
        assert_eq!(param(&params, "ssl.key.password"), None);
    }

    #[test]
    fn test_security_enabled_with_passphrase() {
        let security = SecurityConfig::build(&tls_enabled("secret")).unwrap();
        assert_eq!(security.key_password.as_deref(), Some("secret"));
        assert_eq!(
            param(&security.client_params(), "ssl.key.password"),
            Some("secret")
        );
    }

    #[test]
    fn test_session_config_fixed_settings() {
        let session = SessionConfig::build(
            "kafka1:9092,kafka2:9092",
            "metrics_consumers",
            "EARLIEST",
            &TlsOptions::default(),
        );
        assert_eq!(session.offset_policy, OffsetPolicy::Earliest);
        assert!(session.events_channel);
        assert!(session.application_rebalance);

        let params = session.client_params();
        assert_eq!(
            param(&params, "bootstrap.servers"),
            Some("kafka1:9092,kafka2:9092")
        );
        assert_eq!(param(&params, "group.id"), Some("metrics_consumers"));
        assert_eq!(param(&params, "session.timeout.ms"), Some("6000"));
        assert_eq!(param(&params, "enable.partition.eof"), Some("true"));
        assert_eq!(param(&params, "auto.offset.reset"), Some("earliest"));
    }
}
