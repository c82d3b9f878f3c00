// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session token handling.
//
// The app keeps its login token in a small persistent store.  When a server
// response carries a rotated token (`new-token` header), the session stores
// it and hands it to the native side through the `refreshToken` bridge
// method, so the native layer's own requests stay authenticated.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use malan_core::CallResult;
use malan_core::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::bridge::{Bridge, CallOptions};
use crate::lock;
use crate::plugin;

/// Native method that receives a rotated token.
pub const REFRESH_TOKEN_METHOD: &str = "refreshToken";

/// Response headers that may carry a rotated token, in lookup order.
pub const TOKEN_HEADERS: [&str; 2] = ["new-token", "new_token"];

/// Persistent key-value slot holding the session token.
pub trait TokenStore: Send + Sync {
    /// The stored token, if any. Empty tokens read as `None`.
    fn get(&self) -> Option<String>;

    fn set(&self, token: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Token kept in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        lock(&self.token).clone().filter(|token| !token.is_empty())
    }

    fn set(&self, token: &str) -> Result<()> {
        *lock(&self.token) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        lock(&self.token).take();
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredToken {
    token: String,
    updated_at: DateTime<Utc>,
}

/// Token persisted as a small JSON document.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the stored token was last written.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.read().map(|stored| stored.updated_at)
    }

    fn read(&self) -> Option<StoredToken> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read token file");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed token file");
                None
            }
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        self.read().map(|stored| stored.token).filter(|token| !token.is_empty())
    }

    fn set(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredToken {
            token: token.to_string(),
            updated_at: Utc::now(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Login state plus the hand-off of rotated tokens to native code.
pub struct Session<S> {
    store: S,
    bridge: Option<Bridge>,
}

impl<S: TokenStore> Session<S> {
    /// Session that forwards rotated tokens through the installed bridge
    /// plugin, when there is one.
    pub fn new(store: S) -> Self {
        Self { store, bridge: None }
    }

    /// Forward rotated tokens through `bridge` instead of the plugin.
    pub fn with_bridge(mut self, bridge: Bridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_login(&self) -> bool {
        self.store.get().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.store.get()
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.store.set(token)
    }

    pub fn clear_token(&self) -> Result<()> {
        self.store.clear()
    }

    /// Store `new_token` and pass it to the native side.
    ///
    /// Empty tokens and the token already stored are ignored (`Ok(None)`).
    /// Without a bridge the token is still stored. On Android the call is
    /// fire-and-forget; on iOS this waits for the handler's reply.
    pub async fn refresh_token(&self, new_token: &str) -> Result<Option<CallResult>> {
        if new_token.is_empty() || self.store.get().as_deref() == Some(new_token) {
            return Ok(None);
        }
        self.store.set(new_token)?;
        info!("session token rotated");

        let Some(bridge) = self.bridge.clone().or_else(plugin::installed) else {
            warn!("no bridge installed; rotated token not forwarded to native");
            return Ok(None);
        };
        let result = bridge
            .call(
                REFRESH_TOKEN_METHOD,
                CallOptions::new()
                    .payload(json!({ "newToken": new_token }))
                    .fire_and_forget(),
            )
            .await;
        if !result.success {
            warn!(error = ?result.error, "native refreshToken failed");
        }
        Ok(Some(result))
    }

    /// Inspect response headers for a rotated token and refresh with it.
    pub async fn check_and_refresh_token(&self, headers: &HashMap<String, String>) -> Result<Option<CallResult>> {
        let rotated = TOKEN_HEADERS.iter().find_map(|wanted| {
            headers
                .iter()
                .find(|(name, value)| name.eq_ignore_ascii_case(wanted) && !value.is_empty())
                .map(|(_, value)| value.as_str())
        });
        match rotated {
            Some(token) => self.refresh_token(token).await,
            None => {
                debug!("response carried no rotated token");
                Ok(None)
            }
        }
    }
}
