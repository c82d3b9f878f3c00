// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Malan.
//
// The `Display` strings of the call-path variants are part of the public
// contract: they are what callers see in `CallResult::error`.

use thiserror::Error;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Call path --
    #[error("Method {0} not found")]
    MethodNotFound(String),

    #[error("Not in app environment")]
    BridgeUnavailable,

    #[error("Android bridge not available")]
    AndroidUnavailable,

    #[error("Android method {0} not found")]
    NativeMethodMissing(String),

    #[error("{0}")]
    NativeInvocation(String),

    #[error("Call timeout")]
    Timeout,

    #[error("Queue cleared")]
    QueueCleared,

    // -- Host slots / lifecycle --
    #[error("host slots are owned by another bridge ({0})")]
    SlotOwned(String),

    #[error("bridge plugin is already installed")]
    AlreadyInstalled,

    #[error("bridge plugin is not installed")]
    PluginNotInstalled,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
