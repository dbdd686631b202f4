//! User input - scroll-affecting keys and wheel events
//!
//! Navigation is always applied to the results container, never to the
//! surrounding page.

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// NAVIGATION KEYS
// =============================================================================

/// Keys that move the results list, with their DOM key codes
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum NavKey {
    PageUp = 33,
    PageDown = 34,
    End = 35,
    Home = 36,
}

const KEY_NAMES: &[(&str, NavKey)] = &[
    ("pageup", NavKey::PageUp),
    ("pgup", NavKey::PageUp),
    ("pagedown", NavKey::PageDown),
    ("pgdn", NavKey::PageDown),
    ("end", NavKey::End),
    ("home", NavKey::Home),
];

impl NavKey {
    /// Look up a key by name (e.g. "pagedown"), case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        let name_lower = name.trim().to_lowercase();
        KEY_NAMES
            .iter()
            .find(|(n, _)| *n == name_lower)
            .map(|(_, key)| *key)
    }

    /// Look up a key by DOM key code; other keys are not navigation
    pub fn from_key_code(code: u32) -> Option<Self> {
        NavKey::try_from(code).ok()
    }

    pub fn name(self) -> &'static str {
        match self {
            NavKey::PageUp => "PageUp",
            NavKey::PageDown => "PageDown",
            NavKey::End => "End",
            NavKey::Home => "Home",
        }
    }
}

impl Serialize for NavKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.name().to_lowercase())
    }
}

impl<'de> Deserialize<'de> for NavKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NavKey::from_name(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("Unknown key name: '{}'", s)))
    }
}

// =============================================================================
// USER INPUT
// =============================================================================

/// Scroll-affecting user input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserInput {
    /// Wheel / manual scroll by a pixel delta (positive = down)
    Wheel(f32),
    Key(NavKey),
}

impl From<NavKey> for UserInput {
    fn from(key: NavKey) -> Self {
        UserInput::Key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_key_code() {
        assert_eq!(NavKey::from_key_code(33), Some(NavKey::PageUp));
        assert_eq!(NavKey::from_key_code(34), Some(NavKey::PageDown));
        assert_eq!(NavKey::from_key_code(35), Some(NavKey::End));
        assert_eq!(NavKey::from_key_code(36), Some(NavKey::Home));
        // Arrow keys are not page navigation
        assert_eq!(NavKey::from_key_code(40), None);
    }

    #[test]
    fn test_from_name_case_insensitive() {
        assert_eq!(NavKey::from_name("PageDown"), Some(NavKey::PageDown));
        assert_eq!(NavKey::from_name(" HOME "), Some(NavKey::Home));
        assert_eq!(NavKey::from_name("pgup"), Some(NavKey::PageUp));
        assert_eq!(NavKey::from_name("f9"), None);
    }

    #[test]
    fn test_key_serde_roundtrip_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            key: NavKey,
        }
        let w: Wrapper = toml::from_str(r#"key = "End""#).unwrap();
        assert_eq!(w.key, NavKey::End);
        let text = toml::to_string(&w).unwrap();
        assert!(text.contains(r#"key = "end""#));

        assert!(toml::from_str::<Wrapper>(r#"key = "escape""#).is_err());
    }
}
