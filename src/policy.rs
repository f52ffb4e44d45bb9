//! Selector Policy Normalizer
//!
//! Validates and defaults the variant/state attribute policy. Input is the raw
//! `selectorPolicy` JSON value from configuration; output is a fully populated
//! `SelectorPolicy` where every key list is non-empty.
//!
//! Shape violations are errors with a field-qualified path. Empty arrays and
//! blank `dataKey` are not errors: they fall back to defaults.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cache::PatternCache;
use crate::error::ConfigError;
use crate::naming::{case_body, CaseStyle};

pub const DEFAULT_VARIANT_KEY: &str = "data-variant";
pub const DEFAULT_STATE_KEY: &str = "data-state";
pub const DEFAULT_ARIA_KEYS: &[&str] = &[
    "aria-expanded",
    "aria-selected",
    "aria-checked",
    "aria-pressed",
    "aria-current",
    "aria-disabled",
    "aria-hidden",
    "aria-invalid",
];
pub const DEFAULT_VALUE_MAX_WORDS: u32 = 2;

const ROOT_FIELD: &str = "selectorPolicy";

// ═══════════════════════════════════════════════════════════════════════════════
// NORMALIZED TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorMode {
    Data,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueNaming {
    pub case: CaseStyle,
    pub max_words: u32,
}

impl Default for ValueNaming {
    fn default() -> Self {
        Self {
            case: CaseStyle::Kebab,
            max_words: DEFAULT_VALUE_MAX_WORDS,
        }
    }
}

impl ValueNaming {
    pub fn pattern(&self) -> String {
        format!("^{}$", case_body(self.case, 0, self.max_words.saturating_sub(1)))
    }

    pub fn matches(&self, value: &str) -> bool {
        PatternCache::builtin(&self.pattern())
            .map(|re: Regex| re.is_match(value))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPolicy {
    pub mode: SelectorMode,
    pub data_keys: Vec<String>,
    pub value_naming: ValueNaming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePolicy {
    pub mode: SelectorMode,
    pub data_key: String,
    pub aria_keys: Vec<String>,
    pub value_naming: ValueNaming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorPolicy {
    pub value_naming: ValueNaming,
    pub variant: VariantPolicy,
    pub state: StatePolicy,
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        let value_naming = ValueNaming::default();
        Self {
            value_naming,
            variant: VariantPolicy {
                mode: SelectorMode::Data,
                data_keys: vec![DEFAULT_VARIANT_KEY.to_string()],
                value_naming,
            },
            state: StatePolicy {
                mode: SelectorMode::Data,
                data_key: DEFAULT_STATE_KEY.to_string(),
                aria_keys: DEFAULT_ARIA_KEYS.iter().map(|k| k.to_string()).collect(),
                value_naming,
            },
        }
    }
}

impl SelectorPolicy {
    pub fn is_variant_key(&self, key: &str) -> bool {
        self.variant.data_keys.iter().any(|k| k == key)
    }

    pub fn is_state_key(&self, key: &str) -> bool {
        self.state.data_key == key || self.state.aria_keys.iter().any(|k| k == key)
    }

    /// Class modifiers are meaningful as soon as either axis uses class mode.
    pub fn allows_class_modifiers(&self) -> bool {
        self.variant.mode == SelectorMode::Class || self.state.mode == SelectorMode::Class
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalize a raw `selectorPolicy` value. `None` and `null` yield defaults.
pub fn normalize_selector_policy(raw: Option<&Value>) -> Result<SelectorPolicy, ConfigError> {
    let raw = match raw {
        None | Some(Value::Null) => return Ok(SelectorPolicy::default()),
        Some(value) => value,
    };
    let root = expect_object(raw, ROOT_FIELD)?;
    reject_unknown_keys(root, ROOT_FIELD, &["valueNaming", "variant", "state"])?;

    let base_naming = match root.get("valueNaming") {
        Some(v) if !v.is_null() => {
            normalize_value_naming(v, &format!("{}.valueNaming", ROOT_FIELD), ValueNaming::default())?
        }
        _ => ValueNaming::default(),
    };

    let defaults = SelectorPolicy::default();

    let variant_field = format!("{}.variant", ROOT_FIELD);
    let variant = match root.get("variant") {
        Some(v) if !v.is_null() => {
            let section = expect_object(v, &variant_field)?;
            reject_unknown_keys(section, &variant_field, &["mode", "dataKeys", "valueNaming"])?;
            VariantPolicy {
                mode: normalize_mode(section.get("mode"), &variant_field)?,
                data_keys: normalize_key_list(
                    section.get("dataKeys"),
                    &format!("{}.dataKeys", variant_field),
                    &defaults.variant.data_keys,
                )?,
                value_naming: cascade_value_naming(section.get("valueNaming"), &variant_field, base_naming)?,
            }
        }
        _ => VariantPolicy {
            value_naming: base_naming,
            ..defaults.variant.clone()
        },
    };

    let state_field = format!("{}.state", ROOT_FIELD);
    let state = match root.get("state") {
        Some(v) if !v.is_null() => {
            let section = expect_object(v, &state_field)?;
            reject_unknown_keys(
                section,
                &state_field,
                &["mode", "dataKey", "ariaKeys", "valueNaming"],
            )?;
            StatePolicy {
                mode: normalize_mode(section.get("mode"), &state_field)?,
                data_key: normalize_data_key(section.get("dataKey"), &state_field)?,
                aria_keys: normalize_key_list(
                    section.get("ariaKeys"),
                    &format!("{}.ariaKeys", state_field),
                    &defaults.state.aria_keys,
                )?,
                value_naming: cascade_value_naming(section.get("valueNaming"), &state_field, base_naming)?,
            }
        }
        _ => StatePolicy {
            value_naming: base_naming,
            ..defaults.state.clone()
        },
    };

    Ok(SelectorPolicy {
        value_naming: base_naming,
        variant,
        state,
    })
}

fn expect_object<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| ConfigError::new(field, "must be an object"))
}

fn reject_unknown_keys(
    section: &Map<String, Value>,
    field: &str,
    known: &[&str],
) -> Result<(), ConfigError> {
    match section.keys().find(|k| !known.contains(&k.as_str())) {
        Some(unknown) => Err(ConfigError::new(
            format!("{}.{}", field, unknown),
            format!("unknown option (expected one of: {})", known.join(", ")),
        )),
        None => Ok(()),
    }
}

fn normalize_mode(value: Option<&Value>, section_field: &str) -> Result<SelectorMode, ConfigError> {
    let field = format!("{}.mode", section_field);
    match value {
        None | Some(Value::Null) => Ok(SelectorMode::Data),
        Some(Value::String(s)) if s == "data" => Ok(SelectorMode::Data),
        Some(Value::String(s)) if s == "class" => Ok(SelectorMode::Class),
        Some(other) => Err(ConfigError::new(
            field,
            format!("must be \"data\" or \"class\", got {}", other),
        )),
    }
}

fn normalize_key_list(
    value: Option<&Value>,
    field: &str,
    fallback: &[String],
) -> Result<Vec<String>, ConfigError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(fallback.to_vec()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ConfigError::new(field, "must be an array of strings")),
    };

    if items.is_empty() {
        return Ok(fallback.to_vec());
    }

    let mut keys: Vec<String> = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item.as_str().map(str::trim) {
            Some(key) if !key.is_empty() => {
                if !keys.iter().any(|k| k == key) {
                    keys.push(key.to_string());
                }
            }
            _ => {
                return Err(ConfigError::new(
                    format!("{}[{}]", field, i),
                    "must be a non-empty string",
                ))
            }
        }
    }
    Ok(keys)
}

fn normalize_data_key(value: Option<&Value>, section_field: &str) -> Result<String, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_STATE_KEY.to_string()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(DEFAULT_STATE_KEY.to_string()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(ConfigError::new(
            format!("{}.dataKey", section_field),
            "must be a string",
        )),
    }
}

fn cascade_value_naming(
    value: Option<&Value>,
    section_field: &str,
    inherited: ValueNaming,
) -> Result<ValueNaming, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(inherited),
        Some(v) => normalize_value_naming(v, &format!("{}.valueNaming", section_field), inherited),
    }
}

fn normalize_value_naming(
    value: &Value,
    field: &str,
    inherited: ValueNaming,
) -> Result<ValueNaming, ConfigError> {
    let section = expect_object(value, field)?;
    reject_unknown_keys(section, field, &["case", "maxWords"])?;

    let case = match section.get("case") {
        None | Some(Value::Null) => inherited.case,
        Some(Value::String(s)) => CaseStyle::parse(s).ok_or_else(|| {
            ConfigError::new(
                format!("{}.case", field),
                format!("unsupported case \"{}\" (expected kebab, snake, camel or pascal)", s),
            )
        })?,
        Some(other) => {
            return Err(ConfigError::new(
                format!("{}.case", field),
                format!("must be a string, got {}", other),
            ))
        }
    };

    let max_words = match section.get("maxWords") {
        None | Some(Value::Null) => inherited.max_words,
        Some(Value::Number(n)) => match n.as_u64() {
            Some(words) if words >= 1 && words <= u64::from(u32::MAX) => words as u32,
            _ => {
                return Err(ConfigError::new(
                    format!("{}.maxWords", field),
                    format!("must be a positive integer, got {}", n),
                ))
            }
        },
        Some(other) => {
            return Err(ConfigError::new(
                format!("{}.maxWords", field),
                format!("must be a positive integer, got {}", other),
            ))
        }
    };

    Ok(ValueNaming { case, max_words })
}
