//! Engine configuration.
//!
//! `EngineConfig` is what the config-loading collaborator hands over, as
//! deserialized JSON. `normalize` turns it into the typed options the
//! classifier, linter and emitter consume. Selector policy shape errors are
//! fatal; malformed custom naming patterns are only warnings and the pattern
//! is treated as absent.

use serde::Deserialize;
use serde_json::Value;

use crate::codegen::GenerateOptions;
use crate::error::ConfigError;
use crate::naming::{
    clamp_block_max_words, CaseStyle, CustomPattern, ExternalClasses, NamingOptions,
    DEFAULT_BLOCK_MAX_WORDS, DEFAULT_MODIFIER_PREFIX,
};
use crate::policy::{normalize_selector_policy, SelectorPolicy};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub naming: RawNamingOptions,
    pub selector_policy: Option<Value>,
    pub external_classes: ExternalClasses,
    pub generator: GenerateOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNamingOptions {
    pub block_case: Option<CaseStyle>,
    pub element_case: Option<CaseStyle>,
    pub modifier_case: Option<CaseStyle>,
    pub block_max_words: Option<i64>,
    pub modifier_prefix: Option<String>,
    pub custom_block_pattern: Option<RawPattern>,
    pub custom_element_pattern: Option<RawPattern>,
    pub custom_modifier_pattern: Option<RawPattern>,
}

/// A serialized regular expression: either a bare source string or
/// `{ "source": "...", "flags": "i" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawPattern {
    Source(String),
    Regex {
        source: String,
        #[serde(default)]
        flags: String,
    },
}

impl RawPattern {
    fn parts(&self) -> (&str, &str) {
        match self {
            Self::Source(source) => (source, ""),
            Self::Regex { source, flags } => (source, flags),
        }
    }
}

/// Everything the engine needs for one lint or generate call.
#[derive(Debug, Clone, Default)]
pub struct NormalizedConfig {
    pub naming: NamingOptions,
    pub policy: SelectorPolicy,
    pub external: ExternalClasses,
    pub generate: GenerateOptions,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::new("config", e.to_string()))
    }

    pub fn normalize(&self) -> Result<NormalizedConfig, ConfigError> {
        let policy = normalize_selector_policy(self.selector_policy.as_ref())?;
        let (naming, warnings) = self.naming.normalize();
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        Ok(NormalizedConfig {
            naming,
            policy,
            external: self.external_classes.clone(),
            generate: self.generator.clone(),
        })
    }

    /// Non-fatal problems, for the config-warnings collaborator.
    pub fn warnings(&self) -> Vec<String> {
        self.naming.normalize().1
    }
}

impl RawNamingOptions {
    fn normalize(&self) -> (NamingOptions, Vec<String>) {
        let mut warnings = Vec::new();
        let mut custom = |field: &str, raw: &Option<RawPattern>| {
            let (source, flags) = raw.as_ref()?.parts();
            match CustomPattern::from_js(source, flags) {
                Ok(pattern) => Some(pattern),
                Err(reason) => {
                    warnings.push(format!("naming.{}: {}; using the case-based rule", field, reason));
                    None
                }
            }
        };

        let custom_block = custom("customBlockPattern", &self.custom_block_pattern);
        let custom_element = custom("customElementPattern", &self.custom_element_pattern);
        let custom_modifier = custom("customModifierPattern", &self.custom_modifier_pattern);

        let naming = NamingOptions {
            block_case: self.block_case.unwrap_or_default(),
            element_case: self.element_case.unwrap_or_default(),
            modifier_case: self.modifier_case.unwrap_or_default(),
            block_max_words: self
                .block_max_words
                .map(clamp_block_max_words)
                .unwrap_or(DEFAULT_BLOCK_MAX_WORDS),
            modifier_prefix: self
                .modifier_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_MODIFIER_PREFIX.to_string()),
            custom_block,
            custom_element,
            custom_modifier,
        };
        (naming, warnings)
    }
}

impl NormalizedConfig {
    /// Parse and normalize an optional JSON config; `None` means defaults.
    pub fn from_json(json: Option<&str>) -> Result<Self, ConfigError> {
        match json.map(str::trim).filter(|s| !s.is_empty()) {
            Some(json) => EngineConfig::from_json(json)?.normalize(),
            None => EngineConfig::default().normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::FileCase;
    use crate::policy::SelectorMode;

    #[test]
    fn test_defaults() {
        let config = NormalizedConfig::from_json(None).unwrap();
        assert_eq!(config.naming, NamingOptions::default());
        assert_eq!(config.policy, SelectorPolicy::default());
        assert_eq!(config.generate.child_scss_dir, "children");
    }

    #[test]
    fn test_full_config() {
        let config = NormalizedConfig::from_json(Some(
            r#"{
                "naming": {
                    "blockCase": "pascal",
                    "elementCase": "pascal",
                    "modifierCase": "camel",
                    "blockMaxWords": 500,
                    "modifierPrefix": "is-"
                },
                "selectorPolicy": { "variant": { "mode": "class" } },
                "externalClasses": { "prefixes": ["js-"] },
                "generator": {
                    "globalScssModule": "@/styles/global",
                    "layoutMixins": ["@include sp"],
                    "rootFileCase": "pascal"
                }
            }"#,
        ))
        .unwrap();

        assert_eq!(config.naming.block_case, CaseStyle::Pascal);
        assert_eq!(config.naming.modifier_case, CaseStyle::Camel);
        assert_eq!(config.naming.block_max_words, 100);
        assert_eq!(config.naming.modifier_prefix, "is-");
        assert_eq!(config.policy.variant.mode, SelectorMode::Class);
        assert!(config.external.is_external("js-toggle"));
        assert_eq!(config.generate.global_scss_module, "@/styles/global");
        assert_eq!(config.generate.root_file_case, FileCase::Pascal);
        assert_eq!(config.generate.child_file_case, FileCase::Kebab);
    }

    #[test]
    fn test_block_max_words_is_clamped() {
        let config = EngineConfig::from_json(r#"{"naming":{"blockMaxWords":1}}"#)
            .unwrap()
            .normalize()
            .unwrap();
        assert_eq!(config.naming.block_max_words, 2);
    }

    #[test]
    fn test_stateful_pattern_is_a_warning() {
        let config = EngineConfig::from_json(
            r#"{"naming":{
                "customBlockPattern":{"source":"^c-[a-z]+$","flags":"g"},
                "customElementPattern":"^[a-z]+$"
            }}"#,
        )
        .unwrap();

        let warnings = config.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("naming.customBlockPattern"));

        let normalized = config.normalize().unwrap();
        assert!(normalized.naming.custom_block.is_none());
        assert_eq!(
            normalized.naming.custom_element.as_ref().map(|p| p.source()),
            Some("^[a-z]+$")
        );
    }

    #[test]
    fn test_bad_policy_is_an_error() {
        let err = NormalizedConfig::from_json(Some(
            r#"{"selectorPolicy":{"state":{"mode":"attr"}}}"#,
        ))
        .unwrap_err();
        assert_eq!(err.field, "selectorPolicy.state.mode");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = NormalizedConfig::from_json(Some("{ not json")).unwrap_err();
        assert_eq!(err.field, "config");
        assert!(NormalizedConfig::from_json(Some("   ")).is_ok());
    }
}
