/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Portable share links: `canvasshell://workspace?data=<payload>` where the
//! payload is URI-component-encoded base64 of the workspace JSON.

use std::collections::HashSet;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use super::Workspace;
use crate::persistence::types::PersistedWorkspace;

pub const LINK_SCHEME: &str = "canvasshell";
const LINK_HOST: &str = "workspace";
const LINK_QUERY_KEY: &str = "data";

/// Encode a workspace as a bare share payload.
pub fn encode_payload(workspace: &Workspace) -> Result<String, ShareError> {
    let json = serde_json::to_string(&workspace.to_persisted())
        .map_err(|e| ShareError::Encode(format!("{e}")))?;
    let base64 = BASE64_STANDARD.encode(json.as_bytes());
    Ok(urlencoding::encode(&base64).into_owned())
}

/// Encode a workspace as a full share link.
pub fn share_link(workspace: &Workspace) -> Result<String, ShareError> {
    let payload = encode_payload(workspace)?;
    Ok(format!("{LINK_SCHEME}://{LINK_HOST}?{LINK_QUERY_KEY}={payload}"))
}

/// Decode a share link or bare payload.
///
/// Anything that does not describe a well-formed workspace is rejected as a
/// whole. The returned workspace still carries the id it was exported with;
/// callers assign a fresh one.
pub fn decode(input: &str) -> Result<Workspace, ShareError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ShareError::Empty);
    }

    let base64 = match url::Url::parse(trimmed) {
        Ok(link) => payload_from_link(&link)?,
        Err(_) => urlencoding::decode(trimmed)
            .map_err(|e| ShareError::UriDecode(format!("{e}")))?
            .into_owned(),
    };
    let bytes = BASE64_STANDARD
        .decode(base64.trim())
        .map_err(|e| ShareError::Base64(format!("{e}")))?;
    let persisted: PersistedWorkspace =
        serde_json::from_slice(&bytes).map_err(|e| ShareError::Json(format!("{e}")))?;
    validate(&persisted)?;
    Ok(Workspace::from_persisted(&persisted))
}

fn payload_from_link(link: &url::Url) -> Result<String, ShareError> {
    if link.scheme() != LINK_SCHEME {
        return Err(ShareError::Invalid(format!(
            "unsupported link scheme '{}'",
            link.scheme()
        )));
    }
    // Query decoding turns a literal '+' into a space; base64 has no spaces.
    link.query_pairs()
        .find(|(key, _)| key == LINK_QUERY_KEY)
        .map(|(_, value)| value.replace(' ', "+"))
        .ok_or_else(|| ShareError::Invalid("link has no workspace data".to_string()))
}

fn validate(persisted: &PersistedWorkspace) -> Result<(), ShareError> {
    if !persisted.panzoom.transform.is_valid() {
        return Err(ShareError::Invalid("transform is not finite or scale is not positive".to_string()));
    }
    let mut seen = HashSet::new();
    for node in &persisted.nodes {
        if uuid::Uuid::parse_str(&node.id).is_err() {
            return Err(ShareError::Invalid(format!("node id '{}' is not a uuid", node.id)));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(ShareError::Invalid(format!("duplicate node id '{}'", node.id)));
        }
        let geometry = [
            node.position.x,
            node.position.y,
            node.size.width,
            node.size.height,
            node.zoom_level,
        ];
        if geometry.iter().any(|value| !value.is_finite()) {
            return Err(ShareError::Invalid(format!("node '{}' has non-finite geometry", node.id)));
        }
        if node.size.width <= 0.0 || node.size.height <= 0.0 {
            return Err(ShareError::Invalid(format!("node '{}' has an empty size", node.id)));
        }
    }
    Ok(())
}

/// Errors from encoding or decoding share links
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    Empty,
    UriDecode(String),
    Base64(String),
    Json(String),
    Invalid(String),
    Encode(String),
}

impl std::fmt::Display for ShareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShareError::Empty => write!(f, "Share link is empty"),
            ShareError::UriDecode(e) => write!(f, "URI decode error: {e}"),
            ShareError::Base64(e) => write!(f, "Base64 error: {e}"),
            ShareError::Json(e) => write!(f, "Workspace JSON error: {e}"),
            ShareError::Invalid(e) => write!(f, "Invalid workspace: {e}"),
            ShareError::Encode(e) => write!(f, "Encode error: {e}"),
        }
    }
}

impl std::error::Error for ShareError {}
