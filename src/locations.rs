/// Location registry for the Rideau Canal Skateway ice monitoring service.
///
/// Defines the canonical, ordered list of monitored canal segments along with
/// their display metadata and accepted aliases. This is the single source of
/// truth for location keys — all other modules should reference locations from
/// here rather than hardcoding keys. Query order across the service follows
/// registry order.

// ---------------------------------------------------------------------------
// Location metadata
// ---------------------------------------------------------------------------

/// Metadata for a single monitored canal segment.
#[derive(Debug, PartialEq)]
pub struct MonitoredLocation {
    /// Canonical key as written by the ingestion pipeline.
    pub key: &'static str,
    /// Human-readable name shown on the dashboard.
    pub name: &'static str,
    pub description: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Other spellings accepted by `resolve_location`, lowercase.
    pub aliases: &'static [&'static str],
}

/// All monitored segments, ordered south to north along the Skateway.
pub static LOCATION_REGISTRY: &[MonitoredLocation] = &[
    MonitoredLocation {
        key: "dowslake",
        name: "Dow's Lake",
        description: "Southern end of the Skateway. Widest open-ice area; \
                      freezes later than the narrow channel sections.",
        latitude: 45.3960,
        longitude: -75.7010,
        aliases: &["dow's lake", "dows lake", "dows"],
    },
    MonitoredLocation {
        key: "fifthave",
        name: "Fifth Avenue",
        description: "Mid-canal segment at the Fifth Avenue access point, \
                      near Lansdowne.",
        latitude: 45.4005,
        longitude: -75.6866,
        aliases: &["fifth avenue", "fifth ave", "fifth"],
    },
    MonitoredLocation {
        key: "nac",
        name: "NAC",
        description: "Northern terminus beside the National Arts Centre, \
                      below the Ottawa Locks.",
        latitude: 45.4232,
        longitude: -75.6939,
        aliases: &["national arts centre"],
    },
];

/// Returned by `resolve_location` for input that matches no key, name or alias.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown location: {0:?}")]
pub struct UnknownLocation(pub String);

/// Returns the canonical keys of all monitored locations, in registry order.
pub fn all_location_keys() -> Vec<&'static str> {
    LOCATION_REGISTRY.iter().map(|l| l.key).collect()
}

/// Maps free text (key, display name or alias) to its registry entry.
///
/// Matching is a case-insensitive exact comparison after trimming; no other
/// normalization is attempted.
pub fn resolve_location(input: &str) -> Result<&'static MonitoredLocation, UnknownLocation> {
    let needle = input.trim().to_lowercase();
    LOCATION_REGISTRY
        .iter()
        .find(|l| {
            l.key == needle
                || l.name.to_lowercase() == needle
                || l.aliases.iter().any(|a| *a == needle)
        })
        .ok_or_else(|| UnknownLocation(input.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_is_stable() {
        assert_eq!(all_location_keys(), vec!["dowslake", "fifthave", "nac"]);
    }

    #[test]
    fn test_no_duplicate_keys_or_aliases() {
        let mut seen = std::collections::HashSet::new();
        for location in LOCATION_REGISTRY {
            assert!(
                seen.insert(location.key.to_string()),
                "duplicate key '{}' in LOCATION_REGISTRY",
                location.key
            );
            for alias in location.aliases {
                assert!(
                    seen.insert(alias.to_string()),
                    "alias '{}' for '{}' collides with another entry",
                    alias,
                    location.key
                );
            }
        }
    }

    #[test]
    fn test_keys_and_aliases_are_lowercase() {
        // resolve_location lowercases its input and compares verbatim, so an
        // uppercase entry here could never match.
        for location in LOCATION_REGISTRY {
            assert_eq!(location.key, location.key.to_lowercase());
            for alias in location.aliases {
                assert_eq!(*alias, alias.to_lowercase(), "alias '{}' must be lowercase", alias);
            }
        }
    }

    #[test]
    fn test_coordinates_are_in_ottawa() {
        for location in LOCATION_REGISTRY {
            assert!(
                (45.3..45.5).contains(&location.latitude),
                "latitude out of range for '{}'",
                location.name
            );
            assert!(
                (-75.8..-75.6).contains(&location.longitude),
                "longitude out of range for '{}'",
                location.name
            );
        }
    }

    #[test]
    fn test_resolve_location_accepts_names_and_aliases() {
        assert_eq!(resolve_location("Dow's Lake").unwrap().key, "dowslake");
        assert_eq!(resolve_location("DOWSLAKE").unwrap().key, "dowslake");
        assert_eq!(resolve_location(" fifth avenue ").unwrap().key, "fifthave");
        assert_eq!(resolve_location("National Arts Centre").unwrap().key, "nac");
        assert_eq!(resolve_location("fifthave"), Ok(&LOCATION_REGISTRY[1]));
    }

    #[test]
    fn test_resolve_location_rejects_near_misses() {
        // No punctuation stripping or fuzzy matching.
        assert_eq!(
            resolve_location("dows-lake"),
            Err(UnknownLocation("dows-lake".to_string()))
        );
        assert!(resolve_location("").is_err());
        assert!(resolve_location("hogs back").is_err());
    }
}
