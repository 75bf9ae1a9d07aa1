//! Client configuration
//!
//! Configuration is an explicit value handed to the node client and the
//! wallet helpers. Nothing inside the library reads the process environment;
//! [`ClientConfig::from_env`] exists for binaries and tests to build one.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{SkyWalletError, SkyWalletResult};

pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:6420";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

pub const ENV_NODE_HOST: &str = "SKYCOIN_NODE_HOST";
pub const ENV_RPC_ADDR: &str = "RPC_ADDR";
pub const ENV_WALLET_DIR: &str = "WALLET_DIR";
pub const ENV_WALLET_NAME: &str = "WALLET_NAME";
pub const ENV_REQUEST_TIMEOUT: &str = "SKYCOIN_REQUEST_TIMEOUT_SECS";
pub const ENV_MAX_CONCURRENT_REQUESTS: &str = "SKYCOIN_MAX_CONCURRENT_REQUESTS";
pub const ENV_HOME: &str = "HOME";

/// Wallet directory relative to the home directory
pub const DEFAULT_WALLET_SUBDIR: &str = ".skycoin/wallets";

/// Where the node is and where wallets live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the node, without the `/api/v1` suffix
    pub node_url: String,
    pub wallet_dir: PathBuf,
    /// Wallet file name inside `wallet_dir`
    pub wallet_name: Option<String>,
    /// Applied to every request
    pub request_timeout: Duration,
    /// Upper bound on in-flight requests for fan-out queries
    pub max_concurrent_requests: usize,
}

/// Wallets live under `.skycoin/wallets` relative to the working directory;
/// [`ClientConfig::from_env`] moves that under `$HOME`
impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.to_string(),
            wallet_dir: PathBuf::from(DEFAULT_WALLET_SUBDIR),
            wallet_name: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

impl ClientConfig {
    pub fn new(node_url: impl Into<String>) -> Self {
        Self::default().with_node_url(node_url)
    }

    /// Defaults overridden by `SKYCOIN_NODE_HOST` (or `RPC_ADDR`), `WALLET_DIR`
    /// (else `$HOME/.skycoin/wallets`), `WALLET_NAME`,
    /// `SKYCOIN_REQUEST_TIMEOUT_SECS` and `SKYCOIN_MAX_CONCURRENT_REQUESTS`
    pub fn from_env() -> SkyWalletResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> SkyWalletResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get(ENV_NODE_HOST).or_else(|| get(ENV_RPC_ADDR)) {
            config = config.with_node_url(host);
        }
        if let Some(dir) = get(ENV_WALLET_DIR) {
            config.wallet_dir = PathBuf::from(dir);
        } else if let Some(home) = get(ENV_HOME) {
            config.wallet_dir = PathBuf::from(home).join(DEFAULT_WALLET_SUBDIR);
        }
        if let Some(name) = get(ENV_WALLET_NAME) {
            config.wallet_name = Some(name);
        }
        if let Some(secs) = get(ENV_REQUEST_TIMEOUT) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                SkyWalletError::invalid_argument(format!(
                    "{} must be a whole number of seconds, got {:?}",
                    ENV_REQUEST_TIMEOUT, secs
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = get(ENV_MAX_CONCURRENT_REQUESTS) {
            config.max_concurrent_requests = max.trim().parse().map_err(|_| {
                SkyWalletError::invalid_argument(format!(
                    "{} must be a whole number, got {:?}",
                    ENV_MAX_CONCURRENT_REQUESTS, max
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the node URL; a bare `host:port` gets an `http://` scheme
    pub fn with_node_url(mut self, node_url: impl Into<String>) -> Self {
        let url = node_url.into();
        let url = url.trim().trim_end_matches('/');
        self.node_url = if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };
        self
    }

    pub fn with_wallet_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wallet_dir = dir.into();
        self
    }

    pub fn with_wallet_name(mut self, name: impl Into<String>) -> Self {
        self.wallet_name = Some(name.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    pub fn validate(&self) -> SkyWalletResult<()> {
        if self.node_url.is_empty() {
            return Err(SkyWalletError::invalid_argument("node url is empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(SkyWalletError::invalid_argument("request timeout must be positive"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(SkyWalletError::invalid_argument(
                "max concurrent requests must be positive",
            ));
        }
        Ok(())
    }

    /// `wallet_dir/wallet_name`
    pub fn wallet_path(&self) -> SkyWalletResult<PathBuf> {
        let name = self
            .wallet_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| SkyWalletError::invalid_argument("wallet name not configured"))?;
        Ok(self.wallet_dir.join(name))
    }

    /// `node_url` with the API prefix
    pub fn api_url(&self) -> String {
        format!("{}/api/v1", self.node_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.node_url, "http://127.0.0.1:6420");
        assert_eq!(config.wallet_dir, PathBuf::from(".skycoin/wallets"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_requests, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("SKYCOIN_NODE_HOST", "http://node:6420/"),
            ("WALLET_DIR", "/tmp/wallets"),
            ("WALLET_NAME", "integration-test.wlt"),
            ("SKYCOIN_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.node_url, "http://node:6420");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(
            config.wallet_path().unwrap(),
            PathBuf::from("/tmp/wallets/integration-test.wlt")
        );
    }

    #[test]
    fn test_wallet_dir_from_home() {
        let config = ClientConfig::from_lookup(lookup(&[("HOME", "/home/sky")])).unwrap();
        assert_eq!(config.wallet_dir, PathBuf::from("/home/sky/.skycoin/wallets"));

        let config = ClientConfig::from_lookup(lookup(&[
            ("HOME", "/home/sky"),
            ("WALLET_DIR", "/srv/wallets"),
        ]))
        .unwrap();
        assert_eq!(config.wallet_dir, PathBuf::from("/srv/wallets"));

        // Without either variable the relative default stays
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.wallet_dir, PathBuf::from(".skycoin/wallets"));
    }

    #[test]
    fn test_max_concurrent_requests_from_lookup() {
        let config =
            ClientConfig::from_lookup(lookup(&[("SKYCOIN_MAX_CONCURRENT_REQUESTS", "3")])).unwrap();
        assert_eq!(config.max_concurrent_requests, 3);
        assert!(
            ClientConfig::from_lookup(lookup(&[("SKYCOIN_MAX_CONCURRENT_REQUESTS", "0")])).is_err()
        );
        assert!(
            ClientConfig::from_lookup(lookup(&[("SKYCOIN_MAX_CONCURRENT_REQUESTS", "many")])).is_err()
        );
    }

    #[test]
    fn test_rpc_addr_alias() {
        let config = ClientConfig::from_lookup(lookup(&[("RPC_ADDR", "127.0.0.1:46420")])).unwrap();
        assert_eq!(config.node_url, "http://127.0.0.1:46420");
        assert_eq!(config.api_url(), "http://127.0.0.1:46420/api/v1");
    }

    #[test]
    fn test_node_host_wins_over_rpc_addr() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("RPC_ADDR", "a:1"),
            ("SKYCOIN_NODE_HOST", "b:2"),
        ]))
        .unwrap();
        assert_eq!(config.node_url, "http://b:2");
    }

    #[test]
    fn test_bad_timeout() {
        assert!(ClientConfig::from_lookup(lookup(&[("SKYCOIN_REQUEST_TIMEOUT_SECS", "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("SKYCOIN_REQUEST_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn test_wallet_path_requires_name() {
        let err = ClientConfig::default().wallet_path().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::InvalidArgument);
    }
}
