use crate::error::ConfigError;
use parking_lot::RwLock;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for the liveness period and window, one year
const MAX_LIVENESS_SECS: u64 = 365 * 24 * 60 * 60;

pub struct Config {
    inner: RwLock<InnerConfig>,
}

#[derive(Clone)]
struct InnerConfig {
    database_url: String,
    server_port: u16,
    mqtt_brokers: Vec<String>,
    mqtt_index: usize,
    mqtt_client_id: String,
    mqtt_namespace: String,
    mqtt_topic_telemetry: String,
    mqtt_topic_status: String,
    mqtt_timeout_ms: u64,
    mqtt_connect_retries: usize,
    liveness_period_secs: u64,
    liveness_window_secs: i64,
    require_owner: bool,
    ws_buffer: usize,
    ws_write_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let mqtt_brokers: Vec<String> = env::var("MQTT_BROKERS")
            .unwrap_or_else(|_| "localhost:1883".to_owned())
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        if mqtt_brokers.is_empty() {
            return Err(ConfigError::Invalid("MQTT_BROKERS", String::new()));
        }

        let mqtt_namespace = env::var("MQTT_NAMESPACE").unwrap_or_else(|_| "iot".to_owned());
        let mqtt_topic_telemetry = env::var("MQTT_TOPIC_TELEMETRY")
            .unwrap_or_else(|_| format!("{}/+/telemetry", mqtt_namespace));
        let mqtt_topic_status = env::var("MQTT_TOPIC_STATUS")
            .unwrap_or_else(|_| format!("{}/+/status", mqtt_namespace));

        let inner = InnerConfig {
            database_url,
            server_port: parse_var("SERVER_PORT", 8080)?,
            mqtt_brokers,
            mqtt_index: 0,
            mqtt_client_id: env::var("MQTT_CLIENT_ID").unwrap_or_else(|_| "duckweed".to_owned()),
            mqtt_namespace,
            mqtt_topic_telemetry,
            mqtt_topic_status,
            mqtt_timeout_ms: parse_var("MQTT_TIMEOUT_MS", 5000)?,
            mqtt_connect_retries: parse_var("MQTT_CONNECT_RETRIES", 3)?,
            liveness_period_secs: parse_var("LIVENESS_PERIOD_SECS", 30)?,
            liveness_window_secs: parse_var("LIVENESS_WINDOW_SECS", 60)?,
            require_owner: parse_var("REQUIRE_OWNER", true)?,
            ws_buffer: parse_var("WS_BUFFER", 64)?,
            ws_write_timeout_ms: parse_var("WS_WRITE_TIMEOUT_MS", 5000)?,
        };
        inner.validate()?;

        Ok(Config {
            inner: RwLock::new(inner),
        })
    }

    pub fn database_url(&self) -> String {
        self.inner.read().database_url.clone()
    }

    pub fn server_port(&self) -> u16 {
        self.inner.read().server_port
    }

    pub fn current_mqtt_broker(&self) -> String {
        let inner = self.inner.read();
        inner.mqtt_brokers[inner.mqtt_index].clone()
    }

    pub fn next_mqtt_broker(&self) -> String {
        let mut inner = self.inner.write();
        inner.mqtt_index = (inner.mqtt_index + 1) % inner.mqtt_brokers.len();

        inner.mqtt_brokers[inner.mqtt_index].clone()
    }

    pub fn mqtt_client_id(&self) -> String {
        self.inner.read().mqtt_client_id.clone()
    }

    pub fn mqtt_namespace(&self) -> String {
        self.inner.read().mqtt_namespace.clone()
    }

    pub fn mqtt_topics(&self) -> Vec<String> {
        let inner = self.inner.read();
        vec![
            inner.mqtt_topic_telemetry.clone(),
            inner.mqtt_topic_status.clone(),
        ]
    }

    pub fn mqtt_timeout(&self) -> Duration {
        Duration::from_millis(self.inner.read().mqtt_timeout_ms)
    }

    pub fn mqtt_connect_retries(&self) -> usize {
        self.inner.read().mqtt_connect_retries
    }

    pub fn liveness_period(&self) -> Duration {
        Duration::from_secs(self.inner.read().liveness_period_secs)
    }

    pub fn liveness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.inner.read().liveness_window_secs)
    }

    pub fn require_owner(&self) -> bool {
        self.inner.read().require_owner
    }

    pub fn ws_buffer(&self) -> usize {
        self.inner.read().ws_buffer
    }

    pub fn ws_write_timeout(&self) -> Duration {
        Duration::from_millis(self.inner.read().ws_write_timeout_ms)
    }
}

impl InnerConfig {
    /// Rejects values the timers and channels cannot be built from
    fn validate(&self) -> Result<(), ConfigError> {
        if self.liveness_period_secs == 0 || self.liveness_period_secs > MAX_LIVENESS_SECS {
            return Err(ConfigError::Invalid(
                "LIVENESS_PERIOD_SECS",
                self.liveness_period_secs.to_string(),
            ));
        }
        if self.liveness_window_secs <= 0 || self.liveness_window_secs as u64 > MAX_LIVENESS_SECS {
            return Err(ConfigError::Invalid(
                "LIVENESS_WINDOW_SECS",
                self.liveness_window_secs.to_string(),
            ));
        }
        if self.ws_buffer == 0 {
            return Err(ConfigError::Invalid("WS_BUFFER", "0".to_owned()));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, value)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the environment
    pub fn for_test() -> Self {
        Config {
            inner: RwLock::new(InnerConfig {
                database_url: String::new(),
                server_port: 8080,
                mqtt_brokers: vec!["broker-a:1883".to_owned(), "broker-b:1883".to_owned()],
                mqtt_index: 0,
                mqtt_client_id: "duckweed-test".to_owned(),
                mqtt_namespace: "iot".to_owned(),
                mqtt_topic_telemetry: "iot/+/telemetry".to_owned(),
                mqtt_topic_status: "iot/+/status".to_owned(),
                mqtt_timeout_ms: 100,
                mqtt_connect_retries: 1,
                liveness_period_secs: 30,
                liveness_window_secs: 60,
                require_owner: true,
                ws_buffer: 8,
                ws_write_timeout_ms: 100,
            }),
        }
    }
}
