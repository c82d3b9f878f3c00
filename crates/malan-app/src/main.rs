// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Malan demo host.
//
// Entry point. Initialises logging, loads the bridge configuration, installs
// the bridge against a simulated Android or iOS WebView, and walks through a
// few calls and a lifecycle event.
//
//   MALAN_PLATFORM  android (default) | ios
//   MALAN_CONFIG    path to a JSON BridgeConfig

mod simulator;

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use malan_bridge::plugin;
use malan_bridge::{AppEvent, BridgeConfig, CallOptions, MemoryTokenStore, MethodConfig, Session};
use malan_core::error::Result;
use serde_json::json;

/// Used when no config file is given. Short timeout so the unanswered iOS
/// call in the walkthrough does not stall the demo.
fn demo_config() -> BridgeConfig {
    BridgeConfig {
        methods: vec![MethodConfig::sync("getVersion")],
        call_timeout_ms: 1_500,
        ..BridgeConfig::default()
    }
}

fn load_config() -> Result<BridgeConfig> {
    match std::env::var("MALAN_CONFIG") {
        Ok(path) => {
            tracing::info!(path = %path, "loading bridge config");
            BridgeConfig::load(path)
        }
        Err(_) => Ok(demo_config()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Malan demo host starting");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = load_config()?;
    let host = match std::env::var("MALAN_PLATFORM").as_deref() {
        Ok("ios") => simulator::ios_host(),
        _ => simulator::android_host(),
    };

    let bridge = plugin::install_with_config(host.clone(), config)?;
    println!("platform: {}", serde_json::to_string(&bridge.platform_info())?);
    println!("methods: {:?}", bridge.registered_methods());

    bridge.on(
        AppEvent::OnPageShow,
        Arc::new(|| tracing::info!("page shown; refreshing visible data")),
    );

    let calls = [
        ("getVersion", CallOptions::new()),
        ("getUserInfo", CallOptions::new()),
        ("share", CallOptions::new().payload(json!({"title": "Malan", "url": "https://example.org"}))),
        ("doesNotExist", CallOptions::new()),
    ];
    for (name, options) in calls {
        let options = options.on_result(move |result| {
            tracing::debug!(method = name, success = result.success, "callback invoked");
        });
        let result = bridge.call(name, options).await;
        println!("{name}: {}", serde_json::to_string(&result)?);
    }

    let fired = host.slots.from_web(AppEvent::OnPageShow.as_str());
    println!("onPageShow delivered: {fired}");

    let session = Session::new(MemoryTokenStore::new());
    session.set_token("initial-token")?;
    let headers = HashMap::from([("new-token".to_string(), "rotated-token".to_string())]);
    if let Some(result) = session.check_and_refresh_token(&headers).await? {
        println!("refreshToken: {}", serde_json::to_string(&result)?);
    }

    plugin::uninstall();
    tracing::info!("Malan demo host finished");
    Ok(())
}
