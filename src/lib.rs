//! # BEM Class-Structure Engine
//!
//! Analyzes the class structure of markup against a BEM-like naming
//! convention and generates the matching nested SCSS.
//!
//! ## Vocabulary
//!
//! 1. **Block**: a component class of two or more words (`news-card`). Every
//!    Block gets its own stylesheet file.
//! 2. **Element**: a single-word class (`title`) naming a part of the nearest
//!    enclosing Block. Elements are nested inline in their Block's file.
//! 3. **Modifier**: a prefixed class (`-primary`) on the same element as its
//!    Block or Element.
//! 4. **Variant / state attribute**: `data-*` / `aria-*` attributes used in
//!    place of modifiers when the selector policy is in `data` mode.
//! 5. **External class**: a third-party class from the allow-list, exempt from
//!    naming checks.
//!
//! ## Pipeline
//!
//! ```text
//! markup -> sanitize -> html5ever DOM -> component tree -> lint issues
//!                                                       -> SCSS files
//! ```
//!
//! Linting never fails and reports every issue in one pass. Generation needs a
//! single deterministic entry point in root mode and fails otherwise.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod batch;
mod cache;
mod codegen;
mod config;
mod document;
mod error;
mod naming;
mod policy;
mod sanitize;
mod tree;
mod validate;


pub use batch::{generate_many, lint_many, BatchGenerate, BatchInput, BatchLint};
pub use codegen::{
    format_file_base, generate_from_html, split_words, FileCase, GenerateOptions, GeneratedFile,
};
pub use config::{EngineConfig, NormalizedConfig, RawNamingOptions, RawPattern};
pub use error::{ConfigError, GenerateError};
pub use naming::{
    classify, classify_base_class, is_block_class, is_element_base, is_modifier_class,
    is_utility_class, BaseClassKind, CaseStyle, ClassKind, CustomPattern, ExternalClasses,
    NamingOptions,
};
pub use policy::{
    normalize_selector_policy, SelectorMode, SelectorPolicy, StatePolicy, ValueNaming,
    VariantPolicy,
};
pub use sanitize::{detect_explicit_root, find_unbalanced_tag, sanitize, ExplicitRoot, TagBalanceError};
pub use tree::{build_tree, AttributeSelector, ComponentStructure, ComponentTree, NodeId, TreeContext, MAX_DEPTH};
pub use validate::{lint_html_structure, HtmlLintIssue, LintCode};

pub use document::ParsedDocument;

#[cfg(feature = "napi")]
pub use codegen::generate_from_html_native;
#[cfg(feature = "napi")]
pub use validate::lint_html_native;

#[cfg(feature = "napi")]
#[napi]
pub fn classify_base_class_native(name: String, config_json: Option<String>) -> napi::Result<String> {
    let config = NormalizedConfig::from_json(config_json.as_deref())
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let kind = classify_base_class(&name, &config.naming, &config.external);
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| napi::Error::from_reason("unserializable class kind"))
}

#[cfg(feature = "napi")]
#[napi]
pub fn sanitize_html_native(html: String) -> String {
    sanitize(&html)
}
