//! Fingerprint catalogue: named ClientHello recipes paired with matching
//! User-Agent strings.
//!
//! The catalogue is an immutable, process-wide registry. Profiles are value
//! objects; callers may copy them freely. The only failure modes are
//! lookups by name and random selection over an empty filter result —
//! nothing here performs I/O.

mod profiles;

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error_handling::CatalogueError;

pub use profiles::ClientHelloId;

/// A complete browser identity: a ClientHello recipe and the User-Agent
/// that plausibly accompanies it on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintProfile {
    /// Unique human-readable name, e.g. `"Chrome 143 - Windows"`.
    pub name: &'static str,
    /// Identifier of the ClientHello recipe.
    pub hello: ClientHelloId,
    /// User-Agent string matching the handshake.
    pub user_agent: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Platform label: `Windows`, `macOS`, `Linux`, `iOS`, `Random`.
    pub platform: &'static str,
    /// Browser label: `Chrome`, `Firefox`, `Edge`, `Safari`, `Random`.
    pub browser: &'static str,
    /// Version label, e.g. `"143"` or `"random"`.
    pub version: &'static str,
}

/// Versions considered current enough for the curated subsets.
const LATEST_VERSIONS: &[&str] = &["143", "135", "133", "131"];

/// Registry of all built-in fingerprint profiles.
pub struct FingerprintCatalogue {
    profiles: Vec<FingerprintProfile>,
    rng: Mutex<StdRng>,
}

impl FingerprintCatalogue {
    /// Builds the catalogue. The selection PRNG is seeded from OS entropy
    /// once, here.
    pub fn new() -> Self {
        FingerprintCatalogue {
            profiles: profiles::BUILTIN_PROFILES.to_vec(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// All profiles, in table order.
    pub fn all(&self) -> &[FingerprintProfile] {
        &self.profiles
    }

    /// Profiles whose browser label matches `browser` (case-insensitive).
    /// May be empty; that is not an error.
    pub fn by_browser(&self, browser: &str) -> Vec<FingerprintProfile> {
        self.profiles
            .iter()
            .filter(|p| p.browser.eq_ignore_ascii_case(browser))
            .cloned()
            .collect()
    }

    /// Profiles whose platform label matches `platform` (case-insensitive).
    pub fn by_platform(&self, platform: &str) -> Vec<FingerprintProfile> {
        self.profiles
            .iter()
            .filter(|p| p.platform.eq_ignore_ascii_case(platform))
            .cloned()
            .collect()
    }

    /// The profile named exactly `name`.
    ///
    /// # Errors
    ///
    /// [`CatalogueError::ProfileNotFound`] when no profile carries the name.
    pub fn by_name(&self, name: &str) -> Result<FingerprintProfile, CatalogueError> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| CatalogueError::ProfileNotFound(name.to_string()))
    }

    /// A uniformly random profile from the whole table.
    pub fn random_profile(&self) -> FingerprintProfile {
        let mut rng = self.rng.lock().expect("catalogue rng poisoned");
        self.profiles
            .choose(&mut *rng)
            .cloned()
            .expect("catalogue is never empty")
    }

    /// A uniformly random profile for `browser`.
    ///
    /// # Errors
    ///
    /// [`CatalogueError::EmptySelection`] when no profile matches.
    pub fn random_by_browser(&self, browser: &str) -> Result<FingerprintProfile, CatalogueError> {
        let filtered = self.by_browser(browser);
        let mut rng = self.rng.lock().expect("catalogue rng poisoned");
        filtered
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| CatalogueError::EmptySelection(format!("browser {browser}")))
    }

    /// A uniformly random profile for `platform`.
    ///
    /// # Errors
    ///
    /// [`CatalogueError::EmptySelection`] when no profile matches.
    pub fn random_by_platform(&self, platform: &str) -> Result<FingerprintProfile, CatalogueError> {
        let filtered = self.by_platform(platform);
        let mut rng = self.rng.lock().expect("catalogue rng poisoned");
        filtered
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| CatalogueError::EmptySelection(format!("platform {platform}")))
    }

    /// Curated subset flagged as current browser releases.
    pub fn recommended(&self) -> Vec<FingerprintProfile> {
        self.profiles
            .iter()
            .filter(|p| LATEST_VERSIONS.contains(&p.version))
            .cloned()
            .collect()
    }

    /// Resolves a profile's ClientHello id to a concrete emulation
    /// recipe using the catalogue's own seeded PRNG.
    ///
    /// Concrete ids map without touching the PRNG; the randomized ids
    /// draw from it, so every random decision the catalogue hands out —
    /// profile choice and recipe choice alike — flows from the one
    /// entropy seed taken at construction.
    pub fn emulation_of(&self, profile: &FingerprintProfile) -> wreq_util::Emulation {
        let mut rng = self.rng.lock().expect("catalogue rng poisoned");
        profile.hello.emulation(&mut *rng)
    }

    /// Profiles deemed less detectable: current Chrome releases, any
    /// Firefox, and the randomized variants.
    pub fn safe(&self) -> Vec<FingerprintProfile> {
        self.profiles
            .iter()
            .filter(|p| {
                p.browser == "Firefox"
                    || p.browser == "Random"
                    || p.version == "143"
                    || p.version == "133"
            })
            .cloned()
            .collect()
    }
}

impl Default for FingerprintCatalogue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_size_and_unique_names() {
        let catalogue = FingerprintCatalogue::new();
        assert_eq!(catalogue.all().len(), 35);

        let mut names: Vec<&str> = catalogue.all().iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 35, "profile names must be unique");
    }

    #[test]
    fn test_by_browser_filters() {
        let catalogue = FingerprintCatalogue::new();
        let chrome = catalogue.by_browser("Chrome");
        assert!(!chrome.is_empty());
        assert!(chrome.iter().all(|p| p.browser == "Chrome"));

        // Case-insensitive
        assert_eq!(catalogue.by_browser("chrome").len(), chrome.len());

        // Unknown browser yields an empty list, not an error
        assert!(catalogue.by_browser("netscape").is_empty());
    }

    #[test]
    fn test_by_platform_filters() {
        let catalogue = FingerprintCatalogue::new();
        let ios = catalogue.by_platform("iOS");
        assert_eq!(ios.len(), 3);
        assert!(ios.iter().all(|p| p.browser == "Safari"));
    }

    #[test]
    fn test_by_name_lookup() {
        let catalogue = FingerprintCatalogue::new();
        let profile = catalogue.by_name("Chrome 143 - Windows").unwrap();
        assert_eq!(profile.hello, ClientHelloId::Chrome143);
        assert!(profile.user_agent.contains("Chrome/143"));

        assert!(matches!(
            catalogue.by_name("Chrome 9000 - Windows"),
            Err(CatalogueError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn test_random_selection_respects_filter() {
        let catalogue = FingerprintCatalogue::new();
        for _ in 0..32 {
            let p = catalogue.random_by_browser("Firefox").unwrap();
            assert_eq!(p.browser, "Firefox");
        }
        assert!(matches!(
            catalogue.random_by_browser("netscape"),
            Err(CatalogueError::EmptySelection(_))
        ));
    }

    #[test]
    fn test_recommended_is_latest_only() {
        let catalogue = FingerprintCatalogue::new();
        let recommended = catalogue.recommended();
        assert!(!recommended.is_empty());
        assert!(recommended
            .iter()
            .all(|p| ["143", "135", "133", "131"].contains(&p.version)));
    }

    #[test]
    fn test_safe_contains_firefox_and_randomized() {
        let catalogue = FingerprintCatalogue::new();
        let safe = catalogue.safe();
        assert!(safe.iter().any(|p| p.browser == "Firefox"));
        assert!(safe.iter().any(|p| p.browser == "Random"));
        // An old Chrome is not in the safe set
        assert!(!safe.iter().any(|p| p.version == "100"));
    }

    #[test]
    fn test_user_agents_match_browser() {
        let catalogue = FingerprintCatalogue::new();
        for p in catalogue.by_browser("Firefox") {
            assert!(p.user_agent.contains("Firefox/"), "{}", p.name);
        }
        for p in catalogue.by_browser("Edge") {
            assert!(p.user_agent.contains("Edg/"), "{}", p.name);
        }
    }
}
