//! Token cookies and inbound metadata extraction.
//!
//! Tokens leave the service only as `set-cookie` response metadata.

use std::net::SocketAddr;

use chrono::Duration;
use tonic::metadata::{MetadataMap, MetadataValue};

use crate::gate::CallMetadata;
use common::{AppError, AppResult};
use domain::ClientMetadata;

const SET_COOKIE: &str = "set-cookie";
const COOKIE: &str = "cookie";
const AUTHORIZATION: &str = "authorization";
const USER_AGENT: &str = "user-agent";
const FORWARDED_FOR: &str = "x-forwarded-for";

const COOKIE_ATTRIBUTES: &str = "HttpOnly; Secure; SameSite=Strict";

/// `set-cookie` value carrying a token.
pub fn token_cookie(name: &str, value: &str, path: &str) -> String {
    format!("{}={}; Path={}; {}", name, value, path, COOKIE_ATTRIBUTES)
}

/// `set-cookie` value for a token the client should keep for `max_age`.
pub fn expiring_token_cookie(name: &str, value: &str, path: &str, max_age: Duration) -> String {
    format!(
        "{}={}; Path={}; Max-Age={}; {}",
        name,
        value,
        path,
        max_age.num_seconds().max(0),
        COOKIE_ATTRIBUTES
    )
}

/// `set-cookie` value that makes the client drop a cookie.
pub fn clear_cookie(name: &str, path: &str) -> String {
    format!("{}=; Path={}; Max-Age=0; {}", name, path, COOKIE_ATTRIBUTES)
}

/// Append `set-cookie` entries to response or status metadata.
pub fn append_set_cookies(
    metadata: &mut MetadataMap,
    cookies: impl IntoIterator<Item = String>,
) -> AppResult<()> {
    for cookie in cookies {
        let value = MetadataValue::try_from(cookie)
            .map_err(|e| AppError::internal(format!("Invalid cookie value: {}", e)))?;
        metadata.append(SET_COOKIE, value);
    }
    Ok(())
}

/// Build the transport-neutral view of an inbound call.
pub fn call_metadata(metadata: &MetadataMap, remote_addr: Option<SocketAddr>) -> CallMetadata {
    let text = |key: &str| {
        metadata
            .get(key)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    // First hop of X-Forwarded-For wins over the socket peer
    let ip_address = text(FORWARDED_FOR)
        .and_then(|raw| raw.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| remote_addr.map(|addr| addr.ip().to_string()));

    CallMetadata {
        authorization: text(AUTHORIZATION),
        cookies: metadata
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect(),
        client: ClientMetadata {
            ip_address,
            user_agent: text(USER_AGENT),
        },
    }
}
