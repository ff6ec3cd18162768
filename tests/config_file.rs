//! Configuration file loading and an end-to-end run of the input into the
//! JSON lines sink, using the in-memory broker.

use std::io::Write;
use std::sync::{Arc, Mutex};

use kafka_consumer::testing::MockBroker;
use kafka_consumer::{KafkaConsumer, OffsetPolicy, ServiceInput};
use kafka_metrics::{config, AppConfig, JsonLinesSink};
use tokio_test::assert_ok;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn lines(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

#[test]
fn test_load_config_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[kafka_consumer]
brokers = "kafka1:9092,kafka2:9092"
topics = ["telemetry", "system"]
consumer_group = "edge"
offset = "Earliest"
ssl_enabled = true
ssl_ca = "/etc/ssl/ca.pem"
ssl_cert = "/etc/ssl/cert.pem"
ssl_key = "/etc/ssl/key.pem"
max_message_len = 1024
"#
    )?;

    let config = AppConfig::load(file.path())?.kafka_consumer;
    assert_eq!(config.brokers, "kafka1:9092,kafka2:9092");
    assert_eq!(config.topics, vec!["telemetry", "system"]);
    assert_eq!(config.consumer_group, "edge");
    assert_eq!(config.offset, "Earliest");
    assert!(config.ssl_enabled);
    assert_eq!(config.ssl_keypwd, "");
    assert_eq!(config.max_message_len, 1024);
    config.validate()?;
    Ok(())
}

#[test]
fn test_missing_config_file() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/kafka-metrics.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_sample_config_is_valid() {
    let config = AppConfig::from_toml(&config::sample_config()).unwrap();
    config.kafka_consumer.validate().unwrap();
}

#[tokio::test]
async fn test_consume_into_json_lines() -> anyhow::Result<()> {
    let app_config = AppConfig::from_toml(
        r#"
[kafka_consumer]
brokers = "mock:9092"
topics = ["m"]
offset = "LATEST"
"#,
    )?;
    let broker = MockBroker::new();
    let input = KafkaConsumer::with_connector(app_config.kafka_consumer, broker.clone())?;
    let buffer = SharedBuffer::default();
    let sink = Arc::new(JsonLinesSink::new(buffer.clone()));

    assert_ok!(input.start(sink.clone()).await);
    assert_eq!(broker.sessions()[0].offset_policy, OffsetPolicy::Latest);

    broker.send_message("m", b"definitely not json");
    broker.send_message(
        "m",
        br#"{"name": "cpu", "fields": {"usage": 10}, "tags": {"host": "a"}}"#,
    );

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while sink.metric_count() < 1 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    input.shutdown().await;

    assert_eq!(sink.metric_count(), 1);
    assert_eq!(sink.error_count(), 1);
    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["name"], "cpu");
    assert_eq!(lines[0]["fields"]["usage"], 10);
    assert_eq!(lines[0]["tags"]["host"], "a");
    Ok(())
}
