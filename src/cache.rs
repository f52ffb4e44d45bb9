//! Compiled-regex memoization.
//!
//! Naming and value patterns are rebuilt from configuration on every call, so
//! compiled `Regex` values are cached process-wide keyed by
//! `(pattern, case_insensitive)`. Population is idempotent: two threads racing
//! on first use both compile the same pattern and one insert wins. Readers only
//! ever clone a fully built `Regex` out of the map.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::RwLock;

type CacheKey = (String, bool);

lazy_static! {
    static ref PATTERN_CACHE: RwLock<HashMap<CacheKey, Regex>> = RwLock::new(HashMap::new());
}

/// Upper bound on cached entries. User-supplied patterns are few per project,
/// but a long-lived host process may cycle through many configurations.
const MAX_ENTRIES: usize = 1024;

pub struct PatternCache;

impl PatternCache {
    /// Return the compiled regex for `pattern`, compiling it on first use.
    pub fn get(pattern: &str, case_insensitive: bool) -> Result<Regex, regex::Error> {
        let key = (pattern.to_string(), case_insensitive);

        if let Ok(cache) = PATTERN_CACHE.read() {
            if let Some(re) = cache.get(&key) {
                return Ok(re.clone());
            }
        }

        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;

        if let Ok(mut cache) = PATTERN_CACHE.write() {
            if cache.len() >= MAX_ENTRIES {
                tracing::debug!("pattern cache full ({} entries), clearing", cache.len());
                cache.clear();
            }
            cache.entry(key).or_insert_with(|| re.clone());
        }

        Ok(re)
    }

    /// Like [`PatternCache::get`] for patterns built by this crate, which are
    /// always valid. A failure is logged and yields `None`.
    pub fn builtin(pattern: &str) -> Option<Regex> {
        match Self::get(pattern, false) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("internal pattern {:?} failed to compile: {}", pattern, e);
                None
            }
        }
    }

    #[cfg(test)]
    pub fn contains(pattern: &str, case_insensitive: bool) -> bool {
        PATTERN_CACHE
            .read()
            .map(|cache| cache.contains_key(&(pattern.to_string(), case_insensitive)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiles_and_caches() {
        let pattern = r"^cache-test-[a-z]+$";
        let re = PatternCache::get(pattern, false).unwrap();
        assert!(re.is_match("cache-test-abc"));
        assert!(PatternCache::contains(pattern, false));
    }

    #[test]
    fn test_flags_are_part_of_the_key() {
        let pattern = r"^flag-key$";
        let sensitive = PatternCache::get(pattern, false).unwrap();
        let insensitive = PatternCache::get(pattern, true).unwrap();
        assert!(!sensitive.is_match("FLAG-KEY"));
        assert!(insensitive.is_match("FLAG-KEY"));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(PatternCache::get("([unclosed", false).is_err());
        assert!(PatternCache::builtin("([unclosed").is_none());
    }
}
