/*
 * uri.rs
 * Copyright (C) 2026 webclient_core contributors
 *
 * This file is part of webclient_core.
 *
 * webclient_core is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * webclient_core is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with webclient_core.  If not, see <http://www.gnu.org/licenses/>.
 */

//! `http://host[:port]/path` parsing. Only the `http` scheme; default port
//! 80; an absent path becomes `"/"`.

use crate::error::{Result, WebclientError};

/// A parsed `http://` URI: host, port (defaulted to 80), and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Parse `scheme://host[:port]/path`. Only `http` is accepted.
pub fn parse_uri(uri: &str) -> Result<ParsedUri> {
    let rest = uri
        .strip_prefix("http://")
        .ok_or_else(|| WebclientError::InvalidUri(uri.to_string()))?;
    if rest.is_empty() {
        return Err(WebclientError::InvalidUri(uri.to_string()));
    }

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    if authority.is_empty() {
        return Err(WebclientError::InvalidUri(uri.to_string()));
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => {
            let port: u16 = p
                .parse()
                .map_err(|_| WebclientError::InvalidUri(uri.to_string()))?;
            (h, port)
        }
        None => (authority, 80u16),
    };
    if host.is_empty() {
        return Err(WebclientError::InvalidUri(uri.to_string()));
    }

    let path = if path.is_empty() { "/".to_string() } else { path.to_string() };
    Ok(ParsedUri {
        host: host.to_string(),
        port,
        path,
    })
}

/// Render `(ip, port)` as the destination key used throughout the pool:
/// `"a.b.c.d:port"`.
pub fn destination_key(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}
