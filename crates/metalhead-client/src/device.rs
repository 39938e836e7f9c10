//! User-agent and URL sniffing for platform-specific help text.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    AndroidTablet,
    AndroidPhone,
    IosTablet,
    IosPhone,
    Desktop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Other,
}

impl DeviceType {
    pub fn detect(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        let android = ua.contains("android");
        let ios = ["iphone", "ipad", "ipod"].iter().any(|d| ua.contains(d));
        let tablet =
            ua.contains("tablet") || ua.contains("ipad") || (android && !ua.contains("mobile"));

        match (android, ios, tablet) {
            (true, _, true) => DeviceType::AndroidTablet,
            (true, _, false) => DeviceType::AndroidPhone,
            (false, true, true) => DeviceType::IosTablet,
            (false, true, false) => DeviceType::IosPhone,
            _ => DeviceType::Desktop,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceType::AndroidTablet => "Android Tablet",
            DeviceType::AndroidPhone => "Android Phone",
            DeviceType::IosTablet => "iPad",
            DeviceType::IosPhone => "iPhone",
            DeviceType::Desktop => "Desktop",
        }
    }
}

impl BrowserType {
    pub fn detect(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        // Edge and Chrome both advertise "chrome"; Chrome also says "safari".
        if ua.contains("edg") {
            BrowserType::Edge
        } else if ua.contains("chrome") {
            BrowserType::Chrome
        } else if ua.contains("firefox") {
            BrowserType::Firefox
        } else if ua.contains("safari") {
            BrowserType::Safari
        } else {
            BrowserType::Other
        }
    }
}

/// Steps for clearing the browser cache on the given platform.
pub fn cache_clearing_instructions(device: DeviceType, browser: BrowserType) -> &'static [&'static str] {
    use BrowserType::*;
    use DeviceType::*;

    match (device, browser) {
        (AndroidTablet | AndroidPhone, Chrome) => &[
            "Open Chrome menu (three dots in top-right)",
            "Tap \"Settings\"",
            "Tap \"Privacy and security\"",
            "Tap \"Clear browsing data\"",
            "Select \"Cached images and files\"",
            "Tap \"Clear data\"",
            "Return to this page and refresh",
        ],
        (AndroidTablet | AndroidPhone, Firefox) => &[
            "Open Firefox menu (three dots)",
            "Tap \"Settings\"",
            "Tap \"Delete browsing data\"",
            "Select \"Cache\"",
            "Tap \"Delete browsing data\"",
            "Return to this page and refresh",
        ],
        (AndroidTablet | AndroidPhone, _) => &[
            "Open your browser settings",
            "Find \"Privacy\" or \"Clear browsing data\"",
            "Clear cached images and files",
            "Return to this page and refresh",
        ],
        (IosTablet | IosPhone, Safari) => &[
            "Open Settings app",
            "Scroll down and tap \"Safari\"",
            "Tap \"Clear History and Website Data\"",
            "Confirm by tapping \"Clear History and Data\"",
            "Return to Safari and reload this page",
        ],
        (IosTablet | IosPhone, _) => &[
            "Open your browser settings",
            "Find \"Clear browsing data\" or similar",
            "Clear cache and reload the page",
        ],
        (Desktop, Chrome | Edge) => &[
            "Press Ctrl+Shift+Delete (Windows) or Cmd+Shift+Delete (Mac)",
            "Select \"Cached images and files\"",
            "Click \"Clear data\"",
            "Reload this page",
        ],
        (Desktop, Firefox) => &[
            "Press Ctrl+Shift+Delete (Windows) or Cmd+Shift+Delete (Mac)",
            "Select \"Cache\"",
            "Click \"Clear Now\"",
            "Reload this page",
        ],
        (Desktop, Safari) => &[
            "Open Safari menu → Preferences",
            "Go to \"Privacy\" tab",
            "Click \"Manage Website Data\"",
            "Click \"Remove All\"",
            "Reload this page",
        ],
        (Desktop, Other) => &[
            "Open browser settings",
            "Find \"Clear browsing data\" or \"Privacy\"",
            "Clear cached images and files",
            "Reload this page",
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InAppBrowser {
    Facebook,
    Messenger,
    Instagram,
}

impl InAppBrowser {
    /// Which social app's embedded browser, if any, sent `user_agent`.
    pub fn detect(user_agent: &str) -> Option<Self> {
        let ua = user_agent.to_lowercase();
        let messenger = has_word_prefix(&ua, "messenger/")
            || has_word_prefix(&ua, "fban/messengerforios")
            || has_word_prefix(&ua, "fb_iab/messenger");

        if messenger {
            Some(InAppBrowser::Messenger)
        } else if has_word_prefix(&ua, "instagram") {
            Some(InAppBrowser::Instagram)
        } else if has_facebook_token(&ua) {
            Some(InAppBrowser::Facebook)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InAppBrowser::Facebook => "Facebook",
            InAppBrowser::Messenger => "Facebook Messenger",
            InAppBrowser::Instagram => "Instagram",
        }
    }

    /// How to reopen the app in the system browser.
    pub fn external_browser_instructions(self) -> [&'static str; 3] {
        match self {
            InAppBrowser::Messenger => [
                "Tap the three dots (⋯) menu in the top right corner",
                "Select \"Open in browser\" or \"Open in Chrome/Safari\"",
                "The app will open in your phone's default browser",
            ],
            InAppBrowser::Instagram => [
                "Tap the three dots (⋯) menu in the top right corner",
                "Select \"Open in browser\" or \"Open in external browser\"",
                "The app will open in your phone's default browser",
            ],
            InAppBrowser::Facebook => [
                "Tap the menu icon (usually three dots or lines)",
                "Look for \"Open in browser\" or \"Open in external browser\"",
                "Select your preferred browser (Chrome, Safari, etc.)",
            ],
        }
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Positions where `needle` occurs in `haystack` starting at a word boundary.
fn word_starts<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    haystack.match_indices(needle).filter_map(move |(idx, _)| {
        let bounded = idx == 0 || !is_word_byte(haystack.as_bytes()[idx - 1]);
        bounded.then_some(idx)
    })
}

fn has_word_prefix(haystack: &str, needle: &str) -> bool {
    word_starts(haystack, needle).next().is_some()
}

/// `fb` followed by one or more word characters and a slash (`FBAV/`,
/// `FBAN/`, `FB_IAB/`).
fn has_facebook_token(ua: &str) -> bool {
    word_starts(ua, "fb").any(|idx| {
        let rest = &ua.as_bytes()[idx + 2..];
        let run = rest.iter().take_while(|b| is_word_byte(**b)).count();
        run > 0 && rest.get(run) == Some(&b'/')
    })
}

/// Whether `url` is the identity provider redirecting back to the app.
pub fn is_identity_return_url(url: &str) -> bool {
    let fragment = url.split_once('#').map(|(_, f)| f).unwrap_or("");
    url.contains("/callback")
        || url.contains("id.ai/callback")
        || url.contains("#authorize")
        || fragment.contains("state=")
        || fragment.contains("code=")
}
