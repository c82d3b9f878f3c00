// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Runtime environment classification from the user-agent string and the
// globals a native host injects.  Everything here is a pure function of its
// inputs, so it can run before any bridge exists.

use std::sync::LazyLock;

use malan_core::PlatformType;
use regex::Regex;
use serde::Serialize;

static IOS_UA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(i[^;]+;( U;)? CPU.+Mac OS X").expect("valid iOS pattern"));
static ANDROID_UA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Android);?[\s/]+([\d.]+)?").expect("valid Android pattern"));
static WEIXIN_UA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)MicroMessenger").expect("valid WeChat pattern"));
static WEIXIN_WORK_UA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)wxwork").expect("valid WeCom pattern"));

/// Coarse platform as reported to page code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Desktop,
}

/// What the detector can observe about the current runtime.
#[derive(Debug, Clone, Default)]
pub struct PlatformDetector {
    /// `navigator.userAgent`; `None` outside a browser.
    pub user_agent: Option<String>,
    /// Whether the host injected the Android `fromAndroid` object.
    pub has_android_object: bool,
    /// Whether the WKWebView `webkit` object is present.
    pub has_webkit: bool,
}

/// Snapshot of every predicate, for diagnostics pages and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub is_ios: bool,
    pub is_android: bool,
    pub is_app: bool,
    pub is_weixin: bool,
    pub is_weixin_work: bool,
    pub is_mobile: bool,
    pub is_desktop: bool,
    pub platform: Platform,
    pub user_agent: String,
}

impl PlatformDetector {
    pub fn from_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
            ..Self::default()
        }
    }

    fn ua_matches(&self, pattern: &Regex) -> bool {
        self.user_agent
            .as_deref()
            .is_some_and(|ua| !ua.is_empty() && pattern.is_match(ua))
    }

    pub fn is_ios(&self) -> bool {
        self.ua_matches(&IOS_UA)
    }

    pub fn is_android(&self) -> bool {
        self.ua_matches(&ANDROID_UA)
    }

    /// Running inside the native app rather than a mobile browser.
    pub fn is_app(&self) -> bool {
        (self.is_android() && self.has_android_object) || (self.is_ios() && self.has_webkit)
    }

    pub fn is_weixin(&self) -> bool {
        self.ua_matches(&WEIXIN_UA)
    }

    pub fn is_weixin_work(&self) -> bool {
        self.ua_matches(&WEIXIN_WORK_UA)
    }

    pub fn is_mobile(&self) -> bool {
        self.is_ios() || self.is_android()
    }

    pub fn is_desktop(&self) -> bool {
        !self.is_mobile()
    }

    pub fn platform(&self) -> Platform {
        if self.is_ios() {
            Platform::Ios
        } else if self.is_android() {
            Platform::Android
        } else {
            Platform::Desktop
        }
    }

    /// Transport the bridge should use. Decided by user-agent alone; a
    /// missing host object surfaces later as a per-call error.
    pub fn platform_type(&self) -> PlatformType {
        match self.platform() {
            Platform::Ios => PlatformType::Ios,
            Platform::Android => PlatformType::Android,
            Platform::Desktop => PlatformType::Unknown,
        }
    }

    pub fn info(&self) -> PlatformInfo {
        PlatformInfo {
            is_ios: self.is_ios(),
            is_android: self.is_android(),
            is_app: self.is_app(),
            is_weixin: self.is_weixin(),
            is_weixin_work: self.is_weixin_work(),
            is_mobile: self.is_mobile(),
            is_desktop: self.is_desktop(),
            platform: self.platform(),
            user_agent: self.user_agent.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148";
    const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36";
    const WECHAT: &str = "Mozilla/5.0 (Linux; Android 13; V2227A) AppleWebKit/537.36 Chrome/111.0 Mobile Safari/537.36 MicroMessenger/8.0.47";
    const WECOM: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 wxwork/4.1.20 MicroMessenger/7.0.1";
    const DESKTOP: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

    #[test]
    fn iphone_is_ios() {
        let detector = PlatformDetector::from_user_agent(IPHONE);
        assert!(detector.is_ios());
        assert!(!detector.is_android());
        assert_eq!(detector.platform(), Platform::Ios);
        assert_eq!(detector.platform_type(), PlatformType::Ios);
    }

    #[test]
    fn android_is_android() {
        let detector = PlatformDetector::from_user_agent(ANDROID);
        assert!(detector.is_android());
        assert!(detector.is_mobile());
        assert_eq!(detector.platform_type(), PlatformType::Android);
    }

    #[test]
    fn desktop_is_unknown() {
        let detector = PlatformDetector::from_user_agent(DESKTOP);
        assert!(detector.is_desktop());
        assert_eq!(detector.platform(), Platform::Desktop);
        assert_eq!(detector.platform_type(), PlatformType::Unknown);
    }

    #[test]
    fn missing_user_agent_reports_desktop() {
        let detector = PlatformDetector {
            has_android_object: true,
            has_webkit: true,
            ..Default::default()
        };
        assert!(!detector.is_ios());
        assert!(!detector.is_android());
        assert!(!detector.is_app());
        assert_eq!(detector.platform(), Platform::Desktop);
        assert_eq!(detector.info().user_agent, "");
    }

    #[test]
    fn in_app_requires_host_global() {
        let browser = PlatformDetector::from_user_agent(ANDROID);
        assert!(!browser.is_app());

        let app = PlatformDetector {
            has_android_object: true,
            ..PlatformDetector::from_user_agent(ANDROID)
        };
        assert!(app.is_app());

        // The webkit object alone does not make an Android UA an app.
        let mismatched = PlatformDetector {
            has_webkit: true,
            ..PlatformDetector::from_user_agent(ANDROID)
        };
        assert!(!mismatched.is_app());
    }

    #[test]
    fn wechat_variants() {
        let wechat = PlatformDetector::from_user_agent(WECHAT);
        assert!(wechat.is_weixin());
        assert!(!wechat.is_weixin_work());

        let wecom = PlatformDetector::from_user_agent(WECOM);
        assert!(wecom.is_weixin());
        assert!(wecom.is_weixin_work());
        assert!(wecom.is_ios());
    }

    #[test]
    fn info_serializes_camel_case() {
        let info = PlatformDetector::from_user_agent(IPHONE).info();
        let value = serde_json::to_value(&info).expect("serialize");
        assert_eq!(value["isIos"], true);
        assert_eq!(value["platform"], "ios");
        assert_eq!(value["isDesktop"], false);
    }
}
