//! Connection parameters for one device.

use std::time::Duration;

use serde::Deserialize;

use crate::session::{ModbusSession, TcpConnector};

/// Missing fields fall back to [`ClientConfig::default`]. `modbus-poll` reads
/// this from a JSON file given with `--config`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    /// Connect and read timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "scb.localdomain".to_string(),
            port: 1502,
            unit_id: 71,
            timeout_ms: 2000,
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// A closed TCP session for this device. Call
    /// [`ModbusSession::connect`] with [`Self::timeout`] to open it.
    pub fn session(&self) -> ModbusSession<TcpConnector> {
        ModbusSession::new(TcpConnector::new(&self.host, self.port), self.unit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ClientConfig::from_json(r#"{ "host": "10.0.0.5", "unit_id": 3 }"#).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.unit_id, 3);
        assert_eq!(config.port, 1502);
        assert_eq!(config.timeout(), Duration::from_millis(2000));
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(ClientConfig::from_json(r#"{ "port": "not a number" }"#).is_err());
        assert!(ClientConfig::from_json(r#"{ "unit_id": 300 }"#).is_err());
    }

    #[test]
    fn session_starts_closed() {
        let session = ClientConfig::default().session();
        assert!(!session.is_connected());
        assert_eq!(session.unit_id(), 71);
    }
}
