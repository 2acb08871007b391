use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// Request id sent with every call unless overridden.
pub const DEFAULT_REQUEST_ID: &str = concat!(env!("CARGO_PKG_NAME"), "-v", env!("CARGO_PKG_VERSION"));

/// Everything [`super::HttpRpcClient`] needs to reach a node.
///
/// Built by the caller (usually from CLI flags) and handed to the client
/// constructor; the client keeps no other configuration.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// `host:port` (plain HTTP assumed) or a full `http(s)://` URL.
    pub host: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Bitcoin Core `.cookie` file, used when no user/password is given.
    pub cookie_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    /// Bounds each HTTP attempt, not the whole retry sequence.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Outbound HTTP attempts per second. `None` disables rate limiting.
    pub requests_per_second: Option<u32>,
    pub request_id: String,
}

impl RpcConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            password: None,
            cookie_file: None,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            requests_per_second: None,
            request_id: DEFAULT_REQUEST_ID.to_owned(),
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Credentials to send, if any. An explicit user and password take
    /// precedence over the cookie file; giving only one of the two is an error.
    pub fn credentials(&self) -> Result<Option<Credentials>, CoreError> {
        match (&self.user, &self.password, &self.cookie_file) {
            (Some(user), Some(password), _) => Ok(Some(Credentials {
                user: user.clone(),
                password: password.clone(),
            })),
            (Some(_), None, _) | (None, Some(_), _) => Err(CoreError::Config(
                "rpc user and rpc password must be given together".to_owned(),
            )),
            (None, None, None) => Ok(None),
            (None, None, Some(path)) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    CoreError::Config(format!("read rpc cookie file {}: {e}", path.display()))
                })?;
                Credentials::from_cookie(&contents).map(Some).ok_or_else(|| {
                    CoreError::Config(format!(
                        "rpc cookie file {} must hold a non-empty `user:password` line",
                        path.display()
                    ))
                })
            }
        }
    }
}

/// HTTP basic-auth pair sent with every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Parse the first line of a node `.cookie` file.
    fn from_cookie(contents: &str) -> Option<Self> {
        let (user, password) = contents.lines().next()?.trim().split_once(':')?;
        if user.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self {
            user: user.to_owned(),
            password: password.to_owned(),
        })
    }
}

/// Attempt budget and exponential backoff shared by every call of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the `failed_attempt`-th attempt (1-based) failed:
    /// `base_delay * 2^(failed_attempt - 1)`.
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let exp = failed_attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}
