use reqwest::Url;

use crate::error::CoreError;

/// Normalize the configured daemon address into an HTTP(S) URL.
///
/// A bare `host:port` is treated as plain HTTP, which is how nodes are
/// usually addressed on a local network.
pub(super) fn parse_connection(connection: &str) -> Result<String, CoreError> {
    let connection = connection.trim();
    if connection.is_empty() {
        return Err(CoreError::Config("rpc host must not be empty".to_owned()));
    }

    let candidate = if connection.contains("://") {
        connection.to_owned()
    } else {
        format!("http://{connection}")
    };

    let parsed = Url::parse(&candidate).map_err(|e| {
        CoreError::Config(format!(
            "invalid connection `{connection}`: expected host:port or HTTP(S) URL ({e})"
        ))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(candidate),
        other => Err(CoreError::Config(format!(
            "unsupported connection scheme `{other}`; expected http or https"
        ))),
    }
}
