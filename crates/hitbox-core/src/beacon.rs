use serde::{Deserialize, Serialize};

/// Maximum stored length for path and referrer strings. Anything longer is
/// truncated before dimension resolution so adversarial beacons cannot grow
/// the dimensions table without bound.
pub const MAX_VALUE_LEN: usize = 280;

/// The payload the tracking script sends to POST /api/event.
///
/// `key` is the site's public key (printed in the embed snippet), `url` is
/// the page path being viewed, `referrer` is `document.referrer` or absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconPayload {
    pub key: String,
    pub url: String,
    pub referrer: Option<String>,
}

/// Client-hint headers relevant to a beacon, as raw header values.
///
/// All fields are optional: browsers that do not send client hints (or strip
/// them) still get counted, under "Unknown"/desktop defaults.
#[derive(Debug, Clone, Default)]
pub struct ClientHints {
    /// `Sec-CH-UA` — quoted brand/version list, e.g.
    /// `"Chromium";v="140", "Google Chrome";v="140"`.
    pub ua: Option<String>,
    /// `Sec-CH-UA-Mobile` — `?1` for mobile, `?0` for desktop.
    pub mobile: Option<String>,
    /// `Sec-CH-UA-Platform` — quoted platform name, e.g. `"macOS"`.
    pub platform: Option<String>,
}

/// What the gatekeeper derived from a beacon's client hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedClient {
    pub browser: String,
    pub platform: String,
    /// "mobile" or "desktop".
    pub device: String,
}

/// Known browser brands, checked against the raw `Sec-CH-UA` value in order.
/// First substring match wins. Derivatives that embed "Chrome"/"Chromium" in
/// their brand list must come first or they would be misattributed.
const BROWSER_BRANDS: [&str; 7] = [
    "Brave",
    "Opera",
    "Edge",
    "Vivaldi",
    "Firefox",
    "Chrome",
    "Safari",
];

impl ClientHints {
    /// Best-effort derivation of browser / platform / device.
    ///
    /// This is deliberately a heuristic over the raw header values, not a
    /// structured-header parse: the hints only feed coarse aggregation
    /// dimensions, and a wrong guess costs nothing but a miscategorised
    /// count.
    pub fn derive(&self) -> DerivedClient {
        let browser = self
            .ua
            .as_deref()
            .and_then(|ua| {
                BROWSER_BRANDS
                    .iter()
                    .find(|brand| ua.contains(*brand))
                    .map(|brand| (*brand).to_string())
            })
            .unwrap_or_else(|| "Unknown".to_string());

        let platform = self
            .platform
            .as_deref()
            .map(|p| p.trim().trim_matches('"').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        let device = if self.mobile.as_deref().map(str::trim) == Some("?1") {
            "mobile"
        } else {
            "desktop"
        }
        .to_string();

        DerivedClient {
            browser,
            platform,
            device,
        }
    }
}

/// Truncate `value` to [`MAX_VALUE_LEN`] characters, respecting UTF-8
/// boundaries (`char` count, not bytes).
pub fn truncate_value(value: &str) -> &str {
    match value.char_indices().nth(MAX_VALUE_LEN) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Normalise a referrer: trim whitespace, truncate, and treat the empty
/// string as absent. "No referrer" and an empty-string referrer are the same
/// thing as far as counting goes.
pub fn normalize_referrer(referrer: Option<&str>) -> Option<String> {
    let r = referrer?.trim();
    if r.is_empty() {
        return None;
    }
    Some(truncate_value(r).to_string())
}
