//! Configuration for Sanctum
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Sanctum - guild portal gateway for the groupware platform
#[derive(Parser, Debug, Clone)]
#[command(name = "sanctum")]
#[command(about = "Guild portal gateway in front of the groupware platform")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Base URL of the internal groupware API
    #[arg(long, env = "GROUPWARE_URL", default_value = "http://groupware:80")]
    pub groupware_url: String,

    /// Host header to present to the groupware (it routes vhosts by name)
    #[arg(long, env = "GROUPWARE_HOST")]
    pub groupware_host: Option<String>,

    /// Path prefix of the groupware's portal API
    #[arg(long, env = "GROUPWARE_API_PREFIX", default_value = "/apps/sanctum/api")]
    pub groupware_api_prefix: String,

    /// Base URL of the account-management service
    #[arg(long, env = "ACCOUNT_API_URL", default_value = "http://account-api:5001")]
    pub account_api_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Timeout for groupware API requests, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Timeout for upload forwarding (file, chat media), in milliseconds
    #[arg(long, env = "UPLOAD_TIMEOUT_MS", default_value = "30000")]
    pub upload_timeout_ms: u64,

    /// Timeout for avatar proxying, in milliseconds
    #[arg(long, env = "AVATAR_TIMEOUT_MS", default_value = "5000")]
    pub avatar_timeout_ms: u64,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.groupware_url.trim().is_empty() {
            return Err("GROUPWARE_URL must not be empty".to_string());
        }
        if !self.groupware_api_prefix.starts_with('/') {
            return Err("GROUPWARE_API_PREFIX must start with '/'".to_string());
        }
        if self.request_timeout_ms == 0 || self.upload_timeout_ms == 0 {
            return Err("timeouts must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn base_args() -> Args {
        Args::parse_from(["sanctum"])
    }

    #[test]
    fn test_default_args_validate() {
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn test_prefix_must_be_absolute() {
        let mut args = base_args();
        args.groupware_api_prefix = "apps/sanctum/api".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut args = base_args();
        args.request_timeout_ms = 0;
        assert!(args.validate().is_err());
    }
}
