//! ClientHello identifiers and the built-in profile table.

use rand::seq::SliceRandom;
use rand::Rng;
use wreq_util::Emulation;

use super::FingerprintProfile;

/// Identifier of a ClientHello recipe understood by the TLS layer.
///
/// The set is closed: each concrete variant maps to exactly one
/// byte-level handshake shape. The randomized variants draw a concrete
/// recipe from the caller's seeded PRNG at resolution time, so two
/// transports built from the same id may differ while every draw stays
/// under an owner-controlled seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)] // Variant names are the documentation.
pub enum ClientHelloId {
    Chrome100,
    Chrome109,
    Chrome117,
    Chrome120,
    Chrome124,
    Chrome126,
    Chrome127,
    Chrome128,
    Chrome130,
    Chrome131,
    Chrome133,
    Chrome143,
    Firefox109,
    Firefox117,
    Firefox128,
    Firefox133,
    Firefox135,
    Edge101,
    Edge122,
    Edge127,
    Edge131,
    Safari16,
    Safari17,
    Safari18,
    SafariIos16,
    SafariIos17_2,
    SafariIos17_4,
    Randomized,
    RandomizedAlpn,
    RandomizedNoAlpn,
}

/// Chrome-shaped pool the randomized ids draw from.
const RANDOM_CHROME_POOL: &[Emulation] = &[
    Emulation::Chrome120,
    Emulation::Chrome124,
    Emulation::Chrome127,
    Emulation::Chrome128,
    Emulation::Chrome130,
    Emulation::Chrome131,
    Emulation::Chrome133,
];

/// Firefox-shaped pool for the no-ALPN randomized id.
const RANDOM_FIREFOX_POOL: &[Emulation] = &[
    Emulation::Firefox128,
    Emulation::Firefox133,
    Emulation::Firefox135,
];

impl ClientHelloId {
    /// Resolves this identifier to the emulation recipe the transport
    /// layer consumes. Pure for every concrete variant (`rng` is not
    /// touched); the randomized variants sample their pool from `rng`,
    /// which the caller owns and seeds.
    pub fn emulation<R: Rng + ?Sized>(self, rng: &mut R) -> Emulation {
        match self {
            ClientHelloId::Chrome100 => Emulation::Chrome100,
            ClientHelloId::Chrome109 => Emulation::Chrome109,
            ClientHelloId::Chrome117 => Emulation::Chrome117,
            ClientHelloId::Chrome120 => Emulation::Chrome120,
            ClientHelloId::Chrome124 => Emulation::Chrome124,
            ClientHelloId::Chrome126 => Emulation::Chrome126,
            ClientHelloId::Chrome127 => Emulation::Chrome127,
            ClientHelloId::Chrome128 => Emulation::Chrome128,
            ClientHelloId::Chrome130 => Emulation::Chrome130,
            ClientHelloId::Chrome131 => Emulation::Chrome131,
            ClientHelloId::Chrome133 => Emulation::Chrome133,
            ClientHelloId::Chrome143 => Emulation::Chrome143,
            ClientHelloId::Firefox109 => Emulation::Firefox109,
            ClientHelloId::Firefox117 => Emulation::Firefox117,
            ClientHelloId::Firefox128 => Emulation::Firefox128,
            ClientHelloId::Firefox133 => Emulation::Firefox133,
            ClientHelloId::Firefox135 => Emulation::Firefox135,
            ClientHelloId::Edge101 => Emulation::Edge101,
            ClientHelloId::Edge122 => Emulation::Edge122,
            ClientHelloId::Edge127 => Emulation::Edge127,
            ClientHelloId::Edge131 => Emulation::Edge131,
            ClientHelloId::Safari16 => Emulation::Safari16,
            ClientHelloId::Safari17 => Emulation::Safari17_5,
            ClientHelloId::Safari18 => Emulation::Safari18,
            ClientHelloId::SafariIos16 => Emulation::SafariIos16_5,
            ClientHelloId::SafariIos17_2 => Emulation::SafariIos17_2,
            ClientHelloId::SafariIos17_4 => Emulation::SafariIos17_4_1,
            ClientHelloId::Randomized | ClientHelloId::RandomizedAlpn => RANDOM_CHROME_POOL
                .choose(rng)
                .cloned()
                .unwrap_or(Emulation::Chrome133),
            ClientHelloId::RandomizedNoAlpn => RANDOM_FIREFOX_POOL
                .choose(rng)
                .cloned()
                .unwrap_or(Emulation::Firefox133),
        }
    }

    /// Latest Chrome recipe; the engine's inference fallback.
    pub fn chrome_latest() -> Self {
        ClientHelloId::Chrome143
    }

    /// Latest Firefox recipe.
    pub fn firefox_latest() -> Self {
        ClientHelloId::Firefox135
    }

    /// Latest Edge recipe.
    pub fn edge_latest() -> Self {
        ClientHelloId::Edge131
    }

    /// Latest iOS Safari recipe.
    pub fn ios_latest() -> Self {
        ClientHelloId::SafariIos17_4
    }
}

impl std::fmt::Display for ClientHelloId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClientHelloId::Chrome100 => "chrome-100",
            ClientHelloId::Chrome109 => "chrome-109",
            ClientHelloId::Chrome117 => "chrome-117",
            ClientHelloId::Chrome120 => "chrome-120",
            ClientHelloId::Chrome124 => "chrome-124",
            ClientHelloId::Chrome126 => "chrome-126",
            ClientHelloId::Chrome127 => "chrome-127",
            ClientHelloId::Chrome128 => "chrome-128",
            ClientHelloId::Chrome130 => "chrome-130",
            ClientHelloId::Chrome131 => "chrome-131",
            ClientHelloId::Chrome133 => "chrome-133",
            ClientHelloId::Chrome143 => "chrome-143",
            ClientHelloId::Firefox109 => "firefox-109",
            ClientHelloId::Firefox117 => "firefox-117",
            ClientHelloId::Firefox128 => "firefox-128",
            ClientHelloId::Firefox133 => "firefox-133",
            ClientHelloId::Firefox135 => "firefox-135",
            ClientHelloId::Edge101 => "edge-101",
            ClientHelloId::Edge122 => "edge-122",
            ClientHelloId::Edge127 => "edge-127",
            ClientHelloId::Edge131 => "edge-131",
            ClientHelloId::Safari16 => "safari-16",
            ClientHelloId::Safari17 => "safari-17",
            ClientHelloId::Safari18 => "safari-18",
            ClientHelloId::SafariIos16 => "safari-ios-16",
            ClientHelloId::SafariIos17_2 => "safari-ios-17.2",
            ClientHelloId::SafariIos17_4 => "safari-ios-17.4",
            ClientHelloId::Randomized => "randomized",
            ClientHelloId::RandomizedAlpn => "randomized-alpn",
            ClientHelloId::RandomizedNoAlpn => "randomized-no-alpn",
        };
        f.write_str(name)
    }
}

/// The built-in profile table. Order is stable; names are unique.
pub(super) const BUILTIN_PROFILES: &[FingerprintProfile] = &[
    // Chrome
    FingerprintProfile {
        name: "Chrome 143 - Windows",
        hello: ClientHelloId::Chrome143,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36",
        description: "Chrome 143 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "143",
    },
    FingerprintProfile {
        name: "Chrome 143 - macOS",
        hello: ClientHelloId::Chrome143,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36",
        description: "Chrome 143 on macOS",
        platform: "macOS",
        browser: "Chrome",
        version: "143",
    },
    FingerprintProfile {
        name: "Chrome 133 - Windows",
        hello: ClientHelloId::Chrome133,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36",
        description: "Chrome 133 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "133",
    },
    FingerprintProfile {
        name: "Chrome 133 - macOS",
        hello: ClientHelloId::Chrome133,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36",
        description: "Chrome 133 on macOS",
        platform: "macOS",
        browser: "Chrome",
        version: "133",
    },
    FingerprintProfile {
        name: "Chrome 131 - Windows",
        hello: ClientHelloId::Chrome131,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        description: "Chrome 131 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "131",
    },
    FingerprintProfile {
        name: "Chrome 131 - macOS",
        hello: ClientHelloId::Chrome131,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        description: "Chrome 131 on macOS",
        platform: "macOS",
        browser: "Chrome",
        version: "131",
    },
    FingerprintProfile {
        name: "Chrome 130 - Windows",
        hello: ClientHelloId::Chrome130,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        description: "Chrome 130 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "130",
    },
    FingerprintProfile {
        name: "Chrome 128 - Windows",
        hello: ClientHelloId::Chrome128,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
        description: "Chrome 128 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "128",
    },
    FingerprintProfile {
        name: "Chrome 127 - Windows",
        hello: ClientHelloId::Chrome127,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36",
        description: "Chrome 127 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "127",
    },
    FingerprintProfile {
        name: "Chrome 126 - Linux",
        hello: ClientHelloId::Chrome126,
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        description: "Chrome 126 on Linux",
        platform: "Linux",
        browser: "Chrome",
        version: "126",
    },
    FingerprintProfile {
        name: "Chrome 124 - Windows",
        hello: ClientHelloId::Chrome124,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        description: "Chrome 124 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "124",
    },
    FingerprintProfile {
        name: "Chrome 120 - Windows",
        hello: ClientHelloId::Chrome120,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        description: "Chrome 120 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "120",
    },
    FingerprintProfile {
        name: "Chrome 120 - Linux",
        hello: ClientHelloId::Chrome120,
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        description: "Chrome 120 on Linux",
        platform: "Linux",
        browser: "Chrome",
        version: "120",
    },
    FingerprintProfile {
        name: "Chrome 117 - Windows",
        hello: ClientHelloId::Chrome117,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
        description: "Chrome 117 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "117",
    },
    FingerprintProfile {
        name: "Chrome 109 - Windows",
        hello: ClientHelloId::Chrome109,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36",
        description: "Chrome 109 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "109",
    },
    FingerprintProfile {
        name: "Chrome 100 - Windows",
        hello: ClientHelloId::Chrome100,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.0.0 Safari/537.36",
        description: "Chrome 100 on Windows 10/11",
        platform: "Windows",
        browser: "Chrome",
        version: "100",
    },
    // Firefox
    FingerprintProfile {
        name: "Firefox 135 - Windows",
        hello: ClientHelloId::Firefox135,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:135.0) Gecko/20100101 Firefox/135.0",
        description: "Firefox 135 on Windows",
        platform: "Windows",
        browser: "Firefox",
        version: "135",
    },
    FingerprintProfile {
        name: "Firefox 135 - macOS",
        hello: ClientHelloId::Firefox135,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:135.0) Gecko/20100101 Firefox/135.0",
        description: "Firefox 135 on macOS",
        platform: "macOS",
        browser: "Firefox",
        version: "135",
    },
    FingerprintProfile {
        name: "Firefox 133 - Windows",
        hello: ClientHelloId::Firefox133,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
        description: "Firefox 133 on Windows",
        platform: "Windows",
        browser: "Firefox",
        version: "133",
    },
    FingerprintProfile {
        name: "Firefox 128 - Windows",
        hello: ClientHelloId::Firefox128,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
        description: "Firefox 128 ESR on Windows",
        platform: "Windows",
        browser: "Firefox",
        version: "128",
    },
    FingerprintProfile {
        name: "Firefox 117 - Windows",
        hello: ClientHelloId::Firefox117,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:117.0) Gecko/20100101 Firefox/117.0",
        description: "Firefox 117 on Windows",
        platform: "Windows",
        browser: "Firefox",
        version: "117",
    },
    FingerprintProfile {
        name: "Firefox 109 - Windows",
        hello: ClientHelloId::Firefox109,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/109.0",
        description: "Firefox 109 on Windows",
        platform: "Windows",
        browser: "Firefox",
        version: "109",
    },
    // Edge
    FingerprintProfile {
        name: "Edge 131 - Windows",
        hello: ClientHelloId::Edge131,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
        description: "Edge 131 on Windows",
        platform: "Windows",
        browser: "Edge",
        version: "131",
    },
    FingerprintProfile {
        name: "Edge 127 - Windows",
        hello: ClientHelloId::Edge127,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36 Edg/127.0.0.0",
        description: "Edge 127 on Windows",
        platform: "Windows",
        browser: "Edge",
        version: "127",
    },
    FingerprintProfile {
        name: "Edge 122 - Windows",
        hello: ClientHelloId::Edge122,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0",
        description: "Edge 122 on Windows",
        platform: "Windows",
        browser: "Edge",
        version: "122",
    },
    FingerprintProfile {
        name: "Edge 101 - Windows",
        hello: ClientHelloId::Edge101,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/101.0.0.0 Safari/537.36 Edg/101.0.0.0",
        description: "Edge 101 on Windows",
        platform: "Windows",
        browser: "Edge",
        version: "101",
    },
    // Safari (macOS)
    FingerprintProfile {
        name: "Safari 18 - macOS",
        hello: ClientHelloId::Safari18,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.0 Safari/605.1.15",
        description: "Safari 18 on macOS",
        platform: "macOS",
        browser: "Safari",
        version: "18",
    },
    FingerprintProfile {
        name: "Safari 17 - macOS",
        hello: ClientHelloId::Safari17,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
        description: "Safari 17 on macOS",
        platform: "macOS",
        browser: "Safari",
        version: "17",
    },
    FingerprintProfile {
        name: "Safari 16 - macOS",
        hello: ClientHelloId::Safari16,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Safari/605.1.15",
        description: "Safari 16 on macOS",
        platform: "macOS",
        browser: "Safari",
        version: "16",
    },
    // iOS Safari
    FingerprintProfile {
        name: "iOS Safari 17.4 - iPhone",
        hello: ClientHelloId::SafariIos17_4,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Mobile/15E148 Safari/604.1",
        description: "iOS Safari 17.4 on iPhone",
        platform: "iOS",
        browser: "Safari",
        version: "17.4",
    },
    FingerprintProfile {
        name: "iOS Safari 17.2 - iPhone",
        hello: ClientHelloId::SafariIos17_2,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
        description: "iOS Safari 17.2 on iPhone",
        platform: "iOS",
        browser: "Safari",
        version: "17.2",
    },
    FingerprintProfile {
        name: "iOS Safari 16.5 - iPhone",
        hello: ClientHelloId::SafariIos16,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 16_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Mobile/15E148 Safari/604.1",
        description: "iOS Safari 16.5 on iPhone",
        platform: "iOS",
        browser: "Safari",
        version: "16.5",
    },
    // Randomized
    FingerprintProfile {
        name: "Randomized - Chrome Like",
        hello: ClientHelloId::Randomized,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        description: "Randomized handshake with a Chrome-like User-Agent",
        platform: "Random",
        browser: "Random",
        version: "random",
    },
    FingerprintProfile {
        name: "Randomized ALPN - Chrome Like",
        hello: ClientHelloId::RandomizedAlpn,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        description: "Randomized handshake advertising ALPN",
        platform: "Random",
        browser: "Random",
        version: "random",
    },
    FingerprintProfile {
        name: "Randomized No ALPN - Firefox Like",
        hello: ClientHelloId::RandomizedNoAlpn,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:135.0) Gecko/20100101 Firefox/135.0",
        description: "Randomized handshake with a Firefox-like User-Agent",
        platform: "Random",
        browser: "Random",
        version: "random",
    },
];
