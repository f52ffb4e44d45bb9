//! Naming Classifier
//!
//! Turns a single class token into Block / Element / Modifier / invalid /
//! external according to the project's `NamingOptions`.
//!
//! ## Classification Priority
//!
//! 1. External allow-list (exact or prefix match), only via `classify_base_class`
//! 2. Block (two or more words, never reserved-prefixed, never modifier-shaped)
//! 3. Anything starting with `-` or `u-` is invalid as a base
//! 4. Element (exactly one word)
//! 5. Invalid
//!
//! Every function here is pure: the same `(name, options)` always yields the
//! same answer. Compiled patterns are shared through the crate's pattern cache.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::PatternCache;

pub const MIN_BLOCK_WORDS: u32 = 2;
pub const MAX_BLOCK_WORDS: u32 = 100;
pub const DEFAULT_BLOCK_MAX_WORDS: u32 = 3;
pub const DEFAULT_MODIFIER_PREFIX: &str = "-";
pub const UTILITY_PREFIX: &str = "u-";

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    #[default]
    Kebab,
    Snake,
    Camel,
    Pascal,
}

impl CaseStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "kebab" => Some(Self::Kebab),
            "snake" => Some(Self::Snake),
            "camel" => Some(Self::Camel),
            "pascal" => Some(Self::Pascal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kebab => "kebab",
            Self::Snake => "snake",
            Self::Camel => "camel",
            Self::Pascal => "pascal",
        }
    }
}

/// A user-supplied naming pattern, reduced to its source and the only flag
/// that is meaningful for a single `is_match` test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPattern {
    source: String,
    case_insensitive: bool,
}

impl CustomPattern {
    pub fn new(source: impl Into<String>, case_insensitive: bool) -> Self {
        Self {
            source: source.into(),
            case_insensitive,
        }
    }

    /// Build from a JavaScript-style `(source, flags)` pair.
    ///
    /// Global and sticky flags make `test()` stateful across calls and are
    /// rejected. `m`, `s` and `u` are folded into the pattern or ignored.
    pub fn from_js(source: &str, flags: &str) -> Result<Self, String> {
        let mut case_insensitive = false;
        let mut inline = String::new();
        for flag in flags.chars() {
            match flag {
                'g' | 'y' => {
                    return Err(format!(
                        "pattern /{}/{} uses the '{}' flag; stateful patterns are not supported",
                        source, flags, flag
                    ))
                }
                'i' => case_insensitive = true,
                'm' => inline.push('m'),
                's' => inline.push('s'),
                'u' | 'd' | 'v' => {}
                other => return Err(format!("unknown regular expression flag '{}'", other)),
            }
        }

        let source = if inline.is_empty() {
            source.to_string()
        } else {
            format!("(?{}){}", inline, source)
        };

        let pattern = Self::new(source, case_insensitive);
        pattern
            .compile()
            .map_err(|e| format!("pattern /{}/ does not compile: {}", pattern.source, e))?;
        Ok(pattern)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    fn compile(&self) -> Result<Regex, regex::Error> {
        PatternCache::get(&self.source, self.case_insensitive)
    }

    /// `None` means "treat as not provided".
    fn regex(&self) -> Option<Regex> {
        match self.compile() {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(
                    "custom naming pattern {:?} ignored: {}",
                    self.source,
                    e
                );
                None
            }
        }
    }
}

/// Per-project naming policy. Constructed by configuration normalization;
/// the classifier trusts these values as given, apart from clamping
/// `block_max_words`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingOptions {
    pub block_case: CaseStyle,
    pub element_case: CaseStyle,
    pub modifier_case: CaseStyle,
    pub block_max_words: u32,
    pub modifier_prefix: String,
    pub custom_block: Option<CustomPattern>,
    pub custom_element: Option<CustomPattern>,
    pub custom_modifier: Option<CustomPattern>,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            block_case: CaseStyle::Kebab,
            element_case: CaseStyle::Kebab,
            modifier_case: CaseStyle::Kebab,
            block_max_words: DEFAULT_BLOCK_MAX_WORDS,
            modifier_prefix: DEFAULT_MODIFIER_PREFIX.to_string(),
            custom_block: None,
            custom_element: None,
            custom_modifier: None,
        }
    }
}

impl NamingOptions {
    /// Same case style for every token kind.
    pub fn with_case(case: CaseStyle) -> Self {
        Self {
            block_case: case,
            element_case: case,
            modifier_case: case,
            ..Self::default()
        }
    }

    pub fn effective_block_max_words(&self) -> u32 {
        clamp_block_max_words(i64::from(self.block_max_words))
    }
}

pub fn clamp_block_max_words(value: i64) -> u32 {
    value.clamp(i64::from(MIN_BLOCK_WORDS), i64::from(MAX_BLOCK_WORDS)) as u32
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTERNAL CLASSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Third-party classes excluded from every naming and structure check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalClasses {
    pub classes: Vec<String>,
    pub prefixes: Vec<String>,
}

impl ExternalClasses {
    pub fn is_external(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c == name)
            || self
                .prefixes
                .iter()
                .any(|p| !p.is_empty() && name.starts_with(p.as_str()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATTERNS
// ═══════════════════════════════════════════════════════════════════════════════

/// Regex body for a word sequence in `case`: one leading word plus
/// `extra_min..=extra_max` further segments.
pub(crate) fn case_body(case: CaseStyle, extra_min: u32, extra_max: u32) -> String {
    let (first, rest) = match case {
        CaseStyle::Kebab => ("[a-z][a-z0-9]*", "-[a-z0-9]+"),
        CaseStyle::Snake => ("[a-z][a-z0-9]*", "_[a-z0-9]+"),
        CaseStyle::Camel => ("[a-z][a-z0-9]*", "[A-Z][a-z0-9]*"),
        CaseStyle::Pascal => ("[A-Z][a-z0-9]*", "[A-Z][a-z0-9]*"),
    };
    if extra_max == 0 {
        first.to_string()
    } else {
        format!("{}(?:{}){{{},{}}}", first, rest, extra_min, extra_max)
    }
}

fn block_pattern(opts: &NamingOptions) -> String {
    let extra = opts.effective_block_max_words() - 1;
    format!("^{}$", case_body(opts.block_case, 1, extra))
}

fn element_pattern(opts: &NamingOptions) -> String {
    format!("^{}$", case_body(opts.element_case, 0, 0))
}

fn modifier_pattern(opts: &NamingOptions) -> String {
    format!(
        "^{}{}$",
        regex::escape(&opts.modifier_prefix),
        case_body(opts.modifier_case, 0, 1)
    )
}

fn matches_custom_or(name: &str, custom: Option<&CustomPattern>, fallback: String) -> bool {
    if let Some(re) = custom.and_then(CustomPattern::regex) {
        return re.is_match(name);
    }
    PatternCache::builtin(&fallback)
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

fn has_reserved_prefix(name: &str, opts: &NamingOptions) -> bool {
    name.starts_with(UTILITY_PREFIX)
        || name.starts_with('_')
        || (!opts.modifier_prefix.is_empty() && name.starts_with(opts.modifier_prefix.as_str()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PREDICATES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn is_modifier_class(name: &str, opts: &NamingOptions) -> bool {
    matches_custom_or(name, opts.custom_modifier.as_ref(), modifier_pattern(opts))
}

pub fn is_utility_class(name: &str) -> bool {
    name.starts_with(UTILITY_PREFIX)
}

pub fn is_block_class(name: &str, opts: &NamingOptions) -> bool {
    if name.is_empty() || has_reserved_prefix(name, opts) || is_modifier_class(name, opts) {
        return false;
    }
    matches_custom_or(name, opts.custom_block.as_ref(), block_pattern(opts))
}

pub fn is_element_base(name: &str, opts: &NamingOptions) -> bool {
    if name.is_empty() || has_reserved_prefix(name, opts) {
        return false;
    }
    matches_custom_or(name, opts.custom_element.as_ref(), element_pattern(opts))
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Block,
    Element,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseClassKind {
    Block,
    Element,
    External,
    Invalid,
}

impl BaseClassKind {
    /// Block or Element: a token that can carry modifiers.
    pub fn is_base(self) -> bool {
        matches!(self, Self::Block | Self::Element)
    }
}

pub fn classify(name: &str, opts: &NamingOptions) -> ClassKind {
    if is_block_class(name, opts) {
        return ClassKind::Block;
    }
    if name.starts_with('-') || name.starts_with(UTILITY_PREFIX) {
        return ClassKind::Invalid;
    }
    if is_element_base(name, opts) {
        return ClassKind::Element;
    }
    ClassKind::Invalid
}

/// External-aware classification used for base tokens.
pub fn classify_base_class(
    name: &str,
    opts: &NamingOptions,
    external: &ExternalClasses,
) -> BaseClassKind {
    if external.is_external(name) {
        return BaseClassKind::External;
    }
    match classify(name, opts) {
        ClassKind::Block => BaseClassKind::Block,
        ClassKind::Element => BaseClassKind::Element,
        ClassKind::Invalid => BaseClassKind::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kebab() -> NamingOptions {
        NamingOptions::default()
    }

    #[test]
    fn test_kebab_block_and_element() {
        let opts = kebab();
        assert_eq!(classify("hero-banner", &opts), ClassKind::Block);
        assert_eq!(classify("title", &opts), ClassKind::Element);
        assert_eq!(classify("Title", &opts), ClassKind::Invalid);
        assert_eq!(classify("hero_banner", &opts), ClassKind::Invalid);
    }

    #[test]
    fn test_block_max_words_bounds_segments() {
        let opts = kebab();
        assert!(is_block_class("site-main-nav", &opts));
        assert!(!is_block_class("site-main-nav-item", &opts));

        let two = NamingOptions {
            block_max_words: 2,
            ..kebab()
        };
        assert!(is_block_class("hero-banner", &two));
        assert!(!is_block_class("site-main-nav", &two));
    }

    #[test]
    fn test_block_max_words_is_clamped() {
        let zero = NamingOptions {
            block_max_words: 0,
            ..kebab()
        };
        // clamped to 2: minimum word count is still two
        assert_eq!(zero.effective_block_max_words(), 2);
        assert!(is_block_class("hero-banner", &zero));
        assert!(!is_block_class("hero", &zero));

        let huge = NamingOptions {
            block_max_words: 10_000,
            ..kebab()
        };
        assert_eq!(huge.effective_block_max_words(), 100);
    }

    #[test]
    fn test_reserved_prefixes_never_classify_as_block() {
        let opts = kebab();
        assert!(!is_block_class("u-hidden-text", &opts));
        assert!(!is_block_class("_private-thing", &opts));
        assert!(!is_block_class("-primary-wide", &opts));
        assert_eq!(classify("u-hidden", &opts), ClassKind::Invalid);
        assert_eq!(classify("-primary", &opts), ClassKind::Invalid);
    }

    #[test]
    fn test_modifier_allows_one_or_two_segments() {
        let opts = kebab();
        assert!(is_modifier_class("-primary", &opts));
        assert!(is_modifier_class("-is-active", &opts));
        assert!(!is_modifier_class("-is-very-active", &opts));
        assert!(!is_modifier_class("primary", &opts));
    }

    #[test]
    fn test_custom_modifier_prefix_is_escaped() {
        let opts = NamingOptions {
            modifier_prefix: "--".to_string(),
            ..kebab()
        };
        assert!(is_modifier_class("--dark", &opts));
        assert!(!is_modifier_class("-dark", &opts));
        assert!(!is_block_class("--dark-mode", &opts));

        let dotted = NamingOptions {
            modifier_prefix: ".".to_string(),
            ..kebab()
        };
        assert!(is_modifier_class(".dark", &dotted));
        assert!(!is_modifier_class("xdark", &dotted));
    }

    #[test]
    fn test_camel_and_pascal_cases() {
        let camel = NamingOptions::with_case(CaseStyle::Camel);
        assert_eq!(classify("heroBanner", &camel), ClassKind::Block);
        assert_eq!(classify("title", &camel), ClassKind::Element);
        assert!(is_modifier_class("-isActive", &camel));

        let pascal = NamingOptions::with_case(CaseStyle::Pascal);
        assert_eq!(classify("HeroBanner", &pascal), ClassKind::Block);
        assert_eq!(classify("Title", &pascal), ClassKind::Element);
        assert_eq!(classify("title", &pascal), ClassKind::Invalid);
    }

    #[test]
    fn test_snake_case() {
        let snake = NamingOptions::with_case(CaseStyle::Snake);
        assert_eq!(classify("hero_banner", &snake), ClassKind::Block);
        assert_eq!(classify("hero-banner", &snake), ClassKind::Invalid);
        assert!(is_modifier_class("-is_open", &snake));
        assert!(!is_block_class("_hero_banner", &snake));
    }

    #[test]
    fn test_custom_block_pattern_is_exclusive() {
        let opts = NamingOptions {
            custom_block: Some(CustomPattern::from_js("^c-[a-z]+$", "").unwrap()),
            ..kebab()
        };
        assert!(is_block_class("c-card", &opts));
        assert!(!is_block_class("hero-banner", &opts));
        // reserved prefixes still win over the custom pattern
        let loose = NamingOptions {
            custom_block: Some(CustomPattern::from_js(".*", "").unwrap()),
            ..kebab()
        };
        assert!(!is_block_class("u-anything", &loose));
    }

    #[test]
    fn test_stateful_flags_are_rejected() {
        assert!(CustomPattern::from_js("^a$", "g").is_err());
        assert!(CustomPattern::from_js("^a$", "y").is_err());
        let pattern = CustomPattern::from_js("^card$", "i").unwrap();
        assert!(pattern.case_insensitive());
    }

    #[test]
    fn test_uncompilable_custom_pattern_falls_back() {
        let opts = NamingOptions {
            custom_element: Some(CustomPattern::new("(", false)),
            ..kebab()
        };
        assert!(is_element_base("title", &opts));
    }

    #[test]
    fn test_external_classes_take_precedence() {
        let external = ExternalClasses {
            classes: vec!["container".to_string()],
            prefixes: vec!["swiper-".to_string()],
        };
        let opts = kebab();
        assert_eq!(
            classify_base_class("container", &opts, &external),
            BaseClassKind::External
        );
        assert_eq!(
            classify_base_class("swiper-slide", &opts, &external),
            BaseClassKind::External
        );
        assert_eq!(
            classify_base_class("hero-banner", &opts, &external),
            BaseClassKind::Block
        );
    }

    #[test]
    fn test_classification_is_stable() {
        let opts = kebab();
        for name in ["hero-banner", "title", "-primary", "u-mt", "Bad"] {
            assert_eq!(classify(name, &opts), classify(name, &opts));
        }
    }
}
