// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application-wide bridge instance.
//
// An app installs one bridge at startup and reaches it from anywhere through
// `installed()`.  `uninstall()` runs on application unmount and destroys it.

use std::sync::Mutex;

use malan_core::error::{BridgeError, Result};
use malan_core::{BridgeConfig, MethodConfig};
use tracing::info;

use crate::bridge::Bridge;
use crate::host::Host;
use crate::lock;

static INSTALLED: Mutex<Option<Bridge>> = Mutex::new(None);

/// Options accepted by [`install`]. Auto-detection is always on.
#[derive(Debug, Clone, Default)]
pub struct PluginOptions {
    pub debug: bool,
    pub methods: Vec<MethodConfig>,
}

impl From<PluginOptions> for BridgeConfig {
    fn from(options: PluginOptions) -> Self {
        Self {
            methods: options.methods,
            debug: options.debug,
            auto_detect: true,
            ..Self::default()
        }
    }
}

/// Build the bridge and publish it as the application instance.
pub fn install(host: Host, options: PluginOptions) -> Result<Bridge> {
    install_with_config(host, options.into())
}

/// Like [`install`], with full control over the configuration.
pub fn install_with_config(host: Host, config: BridgeConfig) -> Result<Bridge> {
    let mut slot = lock(&INSTALLED);
    if slot.is_some() {
        return Err(BridgeError::AlreadyInstalled);
    }
    let bridge = Bridge::new(host, config)?;
    info!(bridge = %bridge.id(), platform = %bridge.platform_type(), "bridge plugin installed");
    *slot = Some(bridge.clone());
    Ok(bridge)
}

/// The application instance, if one is installed.
pub fn installed() -> Option<Bridge> {
    lock(&INSTALLED).clone()
}

pub fn require_installed() -> Result<Bridge> {
    installed().ok_or(BridgeError::PluginNotInstalled)
}

/// Destroy and forget the application instance. Returns `false` if none
/// was installed.
pub fn uninstall() -> bool {
    let bridge = lock(&INSTALLED).take();
    match bridge {
        Some(bridge) => {
            bridge.destroy();
            info!(bridge = %bridge.id(), "bridge plugin uninstalled");
            true
        }
        None => false,
    }
}
