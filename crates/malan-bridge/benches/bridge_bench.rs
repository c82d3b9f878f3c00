// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for result normalisation, user-agent classification,
// and the synchronous call path of the malan-bridge crate.

use std::collections::BTreeSet;
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use futures::executor::block_on;
use serde_json::{Value, json};

use malan_bridge::traits::AndroidSurface;
use malan_bridge::{Bridge, BridgeConfig, CallOptions, Host, MethodConfig, PlatformDetector, normalize_result};
use malan_core::error::Result;

const ANDROID_UA: &str =
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36";
const WECOM_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Mobile/15E148 MicroMessenger/8.0.47 wxwork/4.1.22";

/// Android object with one synchronous echo method.
struct EchoSurface;

impl AndroidSurface for EchoSurface {
    fn callable_names(&self) -> BTreeSet<String> {
        BTreeSet::from(["echo".to_string()])
    }

    fn invoke(&self, _name: &str, payload: Option<&str>) -> Result<Option<Value>> {
        Ok(payload.map(|text| Value::String(text.to_string())))
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Normalising stringified replies: plain text, a small object, and a
/// 100-element array.
fn bench_normalize_result(c: &mut Criterion) {
    let array = serde_json::to_string(&(0..100).map(|i| json!({"id": i})).collect::<Vec<_>>())
        .unwrap_or_default();
    let cases: &[(&str, Value)] = &[
        ("plain", json!("not json at all")),
        ("object", json!(r#"{"uid":42,"name":"malan","roles":["a","b"]}"#)),
        ("array_100", Value::String(array)),
    ];

    let mut group = c.benchmark_group("normalize_result");
    for (label, value) in cases {
        group.bench_function(*label, |b| {
            b.iter(|| black_box(normalize_result(black_box(value.clone()))));
        });
    }
    group.finish();
}

/// Full platform snapshot for a WeCom-in-iOS user agent.
fn bench_platform_detection(c: &mut Criterion) {
    let detector = PlatformDetector::from_user_agent(WECOM_UA);
    c.bench_function("platform_info", |b| {
        b.iter(|| black_box(black_box(&detector).info()));
    });
}

/// A synchronous Android call through the queue and dispatcher.
fn bench_sync_call(c: &mut Criterion) {
    let config = BridgeConfig {
        methods: vec![MethodConfig::sync("echo")],
        ..BridgeConfig::default()
    };
    let Ok(bridge) = Bridge::new(Host::android(ANDROID_UA, Arc::new(EchoSurface)), config) else {
        return;
    };

    c.bench_function("sync_call", |b| {
        b.iter(|| {
            let result = block_on(bridge.call("echo", CallOptions::new().payload(json!({"n": 1}))));
            black_box(result);
        });
    });
}

criterion_group!(benches, bench_normalize_result, bench_platform_detection, bench_sync_call);
criterion_main!(benches);
