use crate::{collector::CollectorError, config::ConfigError};
use thiserror::Error;

const SERVER_FLAGS_HINT: &str = "be sure status server is enabled in SEVM with flags --statusserver.addr=127.0.0.1 --statusserver.port=6539";

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Collector(#[from] CollectorError),
    #[error("failed to initialize logging: {0}")]
    Logging(String),
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
    #[error("failed to listen for interrupt: {0}")]
    Signal(std::io::Error),
}

impl MonitorError {
    /// Operator-facing hint printed before exiting.
    pub fn guidance(&self, address: &str) -> String {
        match self {
            MonitorError::Config(_) => format!(
                "Could not start monitoring {address}, check the command line flags. {SERVER_FLAGS_HINT}"
            ),
            _ => format!("Got error when connecting to {address}, {SERVER_FLAGS_HINT}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guidance_names_address_and_server_flags() {
        let error = MonitorError::Collector(CollectorError::Parse {
            address: "http://localhost:6539".to_owned(),
            reason: "expected value at line 1 column 1".to_owned(),
        });

        let hint = error.guidance("http://localhost:6539");
        assert!(hint.contains("http://localhost:6539"));
        assert!(hint.contains("--statusserver.addr=127.0.0.1"));
        assert!(hint.contains("--statusserver.port=6539"));
    }

    #[test]
    fn config_errors_point_at_flags() {
        let error = MonitorError::Config(ConfigError::InvalidRefreshInterval);
        let hint = error.guidance("http://node");
        assert!(hint.contains("http://node"));
        assert!(hint.contains("command line flags"));
        assert!(hint.contains("--statusserver.addr=127.0.0.1 --statusserver.port=6539"));
    }
}
