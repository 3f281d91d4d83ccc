//! Filter registry for resolving filter tokens from request paths.

use crate::core::error::{FilterError, FilterResult};
use crate::filters::transform::Filter;
use indexmap::IndexMap;
use std::ops::RangeInclusive;

/// Builds a [`Filter`] from an already validated level.
pub type FilterFactory = fn(u8) -> Filter;

/// Description of a registered filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterMetadata {
    /// Unique id, also the token used in the path.
    pub id: &'static str,
    /// Human readable name.
    pub name: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Accepted range of the parenthesised parameter, if the filter takes one.
    pub parameter: Option<RangeInclusive<u8>>,
}

/// Registry entry containing metadata and factory.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Builds the filter.
    pub factory: FilterFactory,
    /// Filter description.
    pub metadata: FilterMetadata,
    /// Whether this filter is enabled.
    pub enabled: bool,
}

/// Registry of the filters the service accepts.
///
/// Tokens look like `grayscale` or `threshold(42)`. The registry checks the
/// name, the presence or absence of a parameter and the parameter's range.
pub struct FilterRegistry {
    filters: IndexMap<&'static str, RegistryEntry>,
}

impl FilterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            filters: IndexMap::new(),
        }
    }

    /// Create a registry with grayscale, sepia and threshold.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            FilterMetadata {
                id: "grayscale",
                name: "Grayscale",
                description: "Average of the red, green and blue channels",
                parameter: None,
            },
            |_| Filter::Grayscale,
        );
        registry.register(
            FilterMetadata {
                id: "sepia",
                name: "Sepia",
                description: "Warm brown tone using the classic sepia weights",
                parameter: None,
            },
            |_| Filter::Sepia,
        );
        registry.register(
            FilterMetadata {
                id: "threshold",
                name: "Threshold",
                description: "White where intensity reaches N percent, black elsewhere",
                parameter: Some(0..=100),
            },
            Filter::Threshold,
        );
        registry
    }

    /// Register a filter type.
    pub fn register(&mut self, metadata: FilterMetadata, factory: FilterFactory) {
        let entry = RegistryEntry {
            factory,
            metadata,
            enabled: true,
        };
        self.filters.insert(entry.metadata.id, entry);
    }

    /// Resolve a path token into a filter.
    pub fn resolve(&self, token: &str) -> FilterResult<Filter> {
        let (name, argument) = split_token(token)
            .ok_or_else(|| FilterError::UnknownFilter(token.to_string()))?;

        let entry = self
            .filters
            .get(name)
            .filter(|e| e.enabled)
            .ok_or_else(|| FilterError::UnknownFilter(token.to_string()))?;

        match (&entry.metadata.parameter, argument) {
            (None, None) => Ok((entry.factory)(0)),
            (Some(range), Some(raw)) => {
                let level = parse_level(raw)
                    .filter(|level| range.contains(level))
                    .ok_or_else(|| FilterError::InvalidLevel {
                        filter: name.to_string(),
                        level: raw.to_string(),
                    })?;
                Ok((entry.factory)(level))
            }
            _ => Err(FilterError::UnknownFilter(token.to_string())),
        }
    }

    /// Get metadata for a filter.
    pub fn get_metadata(&self, id: &str) -> Option<&FilterMetadata> {
        self.filters.get(id).map(|e| &e.metadata)
    }

    /// Check if a filter is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.filters.contains_key(id)
    }

    /// Get all registered filter IDs, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().copied()
    }

    /// Get all registered filters.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.filters.values()
    }

    /// Enable or disable a filter.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        if let Some(entry) = self.filters.get_mut(id) {
            entry.enabled = enabled;
            true
        } else {
            false
        }
    }

    /// Get the total number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Split `name(arg)` into its parts; a bare `name` has no argument.
fn split_token(token: &str) -> Option<(&str, Option<&str>)> {
    match token.find('(') {
        None => Some((token, None)),
        Some(open) => {
            let argument = token[open + 1..].strip_suffix(')')?;
            Some((&token[..open], Some(argument)))
        }
    }
}

/// Parse a decimal level without sign, whitespace or leading zeros.
fn parse_level(raw: &str) -> Option<u8> {
    let canonical = !raw.is_empty()
        && raw.len() <= 3
        && raw.bytes().all(|b| b.is_ascii_digit())
        && (raw == "0" || !raw.starts_with('0'));
    if !canonical {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered_in_order() {
        let registry = FilterRegistry::with_builtins();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["grayscale", "sepia", "threshold"]);
        assert!(registry.contains("sepia"));
        assert_eq!(registry.get_metadata("threshold").unwrap().parameter, Some(0..=100));
    }

    #[test]
    fn test_resolve_plain_filters() {
        let registry = FilterRegistry::with_builtins();
        assert_eq!(registry.resolve("grayscale"), Ok(Filter::Grayscale));
        assert_eq!(registry.resolve("sepia"), Ok(Filter::Sepia));
    }

    #[test]
    fn test_resolve_threshold_levels() {
        let registry = FilterRegistry::with_builtins();
        assert_eq!(registry.resolve("threshold(0)"), Ok(Filter::Threshold(0)));
        assert_eq!(registry.resolve("threshold(7)"), Ok(Filter::Threshold(7)));
        assert_eq!(registry.resolve("threshold(50)"), Ok(Filter::Threshold(50)));
        assert_eq!(registry.resolve("threshold(100)"), Ok(Filter::Threshold(100)));
    }

    #[test]
    fn test_reject_bad_levels() {
        let registry = FilterRegistry::with_builtins();
        for token in [
            "threshold(101)",
            "threshold(-1)",
            "threshold(+5)",
            "threshold(05)",
            "threshold(00)",
            "threshold()",
            "threshold( 5)",
            "threshold(1000)",
            "threshold(abc)",
        ] {
            assert!(
                matches!(registry.resolve(token), Err(FilterError::InvalidLevel { .. })),
                "{token} should be rejected"
            );
        }
    }

    #[test]
    fn test_reject_unknown_or_malformed() {
        let registry = FilterRegistry::with_builtins();
        for token in [
            "blur",
            "",
            "Grayscale",
            "threshold",
            "threshold(5",
            "threshold(5)x",
            "sepia(5)",
            "grayscale()",
        ] {
            assert!(
                matches!(registry.resolve(token), Err(FilterError::UnknownFilter(_))),
                "{token} should be unknown"
            );
        }
    }

    #[test]
    fn test_disabled_filter_is_unknown() {
        let mut registry = FilterRegistry::with_builtins();
        assert!(registry.set_enabled("sepia", false));
        assert_eq!(
            registry.resolve("sepia"),
            Err(FilterError::UnknownFilter("sepia".to_string()))
        );
        assert!(!registry.set_enabled("blur", false));
    }
}
