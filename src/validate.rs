//! Structural Linter
//!
//! Walks the parsed markup and reports every naming/structure violation in a
//! single pass. Linting never fails: whatever the input, the result is the
//! complete list of issues.
//!
//! The walk works on the DOM rather than the component tree, because nodes
//! with an invalid base class must be reported, not dissolved.

#[cfg(feature = "napi")]
use napi_derive::napi;
use markup5ever_rcdom::Handle;
use serde::Serialize;

use crate::document::{attributes, class_tokens, element_children, element_name, has_class, ParsedDocument};
use crate::naming::{
    classify_base_class, is_modifier_class, is_utility_class, BaseClassKind, ExternalClasses,
    NamingOptions,
};
use crate::policy::{SelectorMode, SelectorPolicy};
use crate::sanitize::find_unbalanced_tag;
use crate::tree::MAX_DEPTH;

// ═══════════════════════════════════════════════════════════════════════════════
// ISSUE CODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LintCode {
    InvalidBaseClass,
    ModifierWithoutBase,
    UtilityWithoutBase,
    MultipleBaseClasses,
    DisallowedVariantAttribute,
    DisallowedStateAttribute,
    InvalidVariantValue,
    InvalidStateValue,
    DisallowedModifier,
    RootNotBlock,
    ElementWithoutBlockAncestor,
    ElementParentOfBlock,
    UnbalancedHtml,
    MultipleRootElements,
}

impl LintCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidBaseClass => "INVALID_BASE_CLASS",
            Self::ModifierWithoutBase => "MODIFIER_WITHOUT_BASE",
            Self::UtilityWithoutBase => "UTILITY_WITHOUT_BASE",
            Self::MultipleBaseClasses => "MULTIPLE_BASE_CLASSES",
            Self::DisallowedVariantAttribute => "DISALLOWED_VARIANT_ATTRIBUTE",
            Self::DisallowedStateAttribute => "DISALLOWED_STATE_ATTRIBUTE",
            Self::InvalidVariantValue => "INVALID_VARIANT_VALUE",
            Self::InvalidStateValue => "INVALID_STATE_VALUE",
            Self::DisallowedModifier => "DISALLOWED_MODIFIER",
            Self::RootNotBlock => "ROOT_NOT_BLOCK",
            Self::ElementWithoutBlockAncestor => "ELEMENT_WITHOUT_BLOCK_ANCESTOR",
            Self::ElementParentOfBlock => "ELEMENT_PARENT_OF_BLOCK",
            Self::UnbalancedHtml => "UNBALANCED_HTML",
            Self::MultipleRootElements => "MULTIPLE_ROOT_ELEMENTS",
        }
    }

    /// The rule each code protects, for CLI output.
    pub fn rule(self) -> &'static str {
        match self {
            Self::InvalidBaseClass => "The first class of an element must be a Block, an Element or an allowed external class.",
            Self::ModifierWithoutBase => "Modifiers only modify a Block or Element on the same element.",
            Self::UtilityWithoutBase => "Utilities only decorate a Block or Element on the same element.",
            Self::MultipleBaseClasses => "An element has exactly one Block or Element class.",
            Self::DisallowedVariantAttribute => "Variants are expressed as class modifiers in this project.",
            Self::DisallowedStateAttribute => "States are expressed as class modifiers in this project.",
            Self::InvalidVariantValue | Self::InvalidStateValue => {
                "Attribute values follow the configured value naming."
            }
            Self::DisallowedModifier => "Variants and states are expressed as data attributes in this project.",
            Self::RootNotBlock => "A page root is a Block.",
            Self::ElementWithoutBlockAncestor => "Elements only exist inside a Block.",
            Self::ElementParentOfBlock => "A Block is never a direct child of an Element.",
            Self::UnbalancedHtml => "Every opened tag is closed.",
            Self::MultipleRootElements => "A page has a single root element.",
        }
    }
}

impl std::fmt::Display for LintCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlLintIssue {
    pub code: LintCode,
    pub message: String,
    pub base_class: String,
    pub path: Vec<String>,
}

impl HtmlLintIssue {
    fn new(code: LintCode, message: String, base_class: &str, path: &[String]) -> Self {
        Self {
            code,
            message,
            base_class: base_class.to_string(),
            path: path.to_vec(),
        }
    }

    fn document(code: LintCode, message: String) -> Self {
        Self::new(code, message, "", &[])
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WALK
// ═══════════════════════════════════════════════════════════════════════════════

struct Linter<'a> {
    naming: &'a NamingOptions,
    policy: &'a SelectorPolicy,
    external: &'a ExternalClasses,
    issues: Vec<HtmlLintIssue>,
    path: Vec<String>,
}

/// What the walk knows about the classed ancestors of the current element.
#[derive(Clone, Copy)]
struct Ancestry {
    parent: Option<BaseClassKind>,
    has_block_ancestor: bool,
}

impl<'a> Linter<'a> {
    fn walk(&mut self, handle: &Handle, ancestry: Ancestry, is_root: bool, depth: usize) {
        if depth >= MAX_DEPTH {
            return;
        }

        let tokens = class_tokens(handle).unwrap_or_default();
        if tokens.is_empty() {
            for child in element_children(handle) {
                self.walk(&child, ancestry, false, depth + 1);
            }
            return;
        }

        let base = tokens[0].clone();
        let kind = classify_base_class(&base, self.naming, self.external);
        self.path.push(base.clone());

        self.check_node(handle, &tokens, kind, ancestry, is_root);

        let child_ancestry = Ancestry {
            parent: Some(kind),
            has_block_ancestor: ancestry.has_block_ancestor || kind == BaseClassKind::Block,
        };
        for child in element_children(handle) {
            self.walk(&child, child_ancestry, false, depth + 1);
        }

        self.path.pop();
    }

    fn report(&mut self, code: LintCode, base: &str, message: String) {
        self.issues
            .push(HtmlLintIssue::new(code, message, base, &self.path));
    }

    fn check_node(
        &mut self,
        handle: &Handle,
        tokens: &[String],
        kind: BaseClassKind,
        ancestry: Ancestry,
        is_root: bool,
    ) {
        let base = tokens[0].as_str();
        let kinds: Vec<BaseClassKind> = tokens
            .iter()
            .map(|t| classify_base_class(t, self.naming, self.external))
            .collect();
        let base_tokens: Vec<&str> = tokens
            .iter()
            .zip(&kinds)
            .filter(|(_, k)| k.is_base())
            .map(|(t, _)| t.as_str())
            .collect();
        let modifiers: Vec<&str> = tokens
            .iter()
            .filter(|t| is_modifier_class(t, self.naming))
            .map(String::as_str)
            .collect();
        let has_base = !base_tokens.is_empty();

        // INVALID_BASE_CLASS
        match kind {
            BaseClassKind::Invalid => self.report(
                LintCode::InvalidBaseClass,
                base,
                format!(
                    "\"{}\" is not a valid Block or Element class{}",
                    base,
                    describe_element(handle)
                ),
            ),
            BaseClassKind::External => {
                if let Some(real) = base_tokens.first() {
                    self.report(
                        LintCode::InvalidBaseClass,
                        base,
                        format!(
                            "external class \"{}\" precedes base class \"{}\"; put the base class first",
                            base, real
                        ),
                    );
                } else if let Some(modifier) = modifiers.first() {
                    self.report(
                        LintCode::InvalidBaseClass,
                        base,
                        format!(
                            "external class \"{}\" cannot carry modifier \"{}\"",
                            base, modifier
                        ),
                    );
                }
            }
            BaseClassKind::Block | BaseClassKind::Element => {}
        }

        // MODIFIER_WITHOUT_BASE / UTILITY_WITHOUT_BASE
        if !has_base {
            if let Some(modifier) = modifiers.first() {
                self.report(
                    LintCode::ModifierWithoutBase,
                    base,
                    format!("modifier \"{}\" has no Block or Element class to modify", modifier),
                );
            }
            if let Some(utility) = tokens.iter().find(|t| is_utility_class(t)) {
                self.report(
                    LintCode::UtilityWithoutBase,
                    base,
                    format!("utility \"{}\" has no Block or Element class to decorate", utility),
                );
            }
        }

        // MULTIPLE_BASE_CLASSES
        if base_tokens.len() > 1 {
            self.report(
                LintCode::MultipleBaseClasses,
                base,
                format!(
                    "element has {} base classes ({}); use one and express the rest as modifiers",
                    base_tokens.len(),
                    base_tokens.join(", ")
                ),
            );
        }

        self.check_attributes(handle, base);

        // DISALLOWED_MODIFIER
        if self.policy.variant.mode == SelectorMode::Data
            && self.policy.state.mode == SelectorMode::Data
        {
            for modifier in &modifiers {
                self.report(
                    LintCode::DisallowedModifier,
                    base,
                    format!(
                        "modifier class \"{}\" is not allowed; use a data attribute instead",
                        modifier
                    ),
                );
            }
        }

        // ROOT_NOT_BLOCK
        if is_root && kind != BaseClassKind::Block {
            self.report(
                LintCode::RootNotBlock,
                base,
                format!("root class \"{}\" is not a Block", base),
            );
        }

        // ELEMENT_WITHOUT_BLOCK_ANCESTOR
        if kind == BaseClassKind::Element && !ancestry.has_block_ancestor {
            self.report(
                LintCode::ElementWithoutBlockAncestor,
                base,
                format!("Element \"{}\" has no enclosing Block", base),
            );
        }

        // ELEMENT_PARENT_OF_BLOCK
        if kind == BaseClassKind::Block && ancestry.parent == Some(BaseClassKind::Element) {
            let parent = self
                .path
                .len()
                .checked_sub(2)
                .and_then(|i| self.path.get(i))
                .cloned()
                .unwrap_or_default();
            self.report(
                LintCode::ElementParentOfBlock,
                base,
                format!("Block \"{}\" is nested directly inside Element \"{}\"", base, parent),
            );
        }
    }

    fn check_attributes(&mut self, handle: &Handle, base: &str) {
        let policy = self.policy;
        let variant = &policy.variant;
        let state = &policy.state;

        for (key, value) in attributes(handle) {
            if policy.is_variant_key(&key) {
                match variant.mode {
                    SelectorMode::Class => self.report(
                        LintCode::DisallowedVariantAttribute,
                        base,
                        format!("variant attribute {} is not allowed; use a modifier class", key),
                    ),
                    SelectorMode::Data if !variant.value_naming.matches(&value) => self.report(
                        LintCode::InvalidVariantValue,
                        base,
                        format!(
                            "{}=\"{}\" does not follow {} naming (max {} words)",
                            key,
                            value,
                            variant.value_naming.case.as_str(),
                            variant.value_naming.max_words
                        ),
                    ),
                    SelectorMode::Data => {}
                }
            }

            if key == state.data_key {
                match state.mode {
                    SelectorMode::Class => self.report(
                        LintCode::DisallowedStateAttribute,
                        base,
                        format!("state attribute {} is not allowed; use a modifier class", key),
                    ),
                    SelectorMode::Data
                        if key.starts_with("data-") && !state.value_naming.matches(&value) =>
                    {
                        self.report(
                            LintCode::InvalidStateValue,
                            base,
                            format!(
                                "{}=\"{}\" does not follow {} naming (max {} words)",
                                key,
                                value,
                                state.value_naming.case.as_str(),
                                state.value_naming.max_words
                            ),
                        )
                    }
                    SelectorMode::Data => {}
                }
            }
        }
    }
}

fn describe_element(handle: &Handle) -> String {
    element_name(handle)
        .map(|tag| format!(" on <{}>", tag))
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Lint markup against the naming convention.
///
/// In root mode the markup must resolve to exactly one root, which must be a
/// Block. In selection mode every top-level classed element is linted as an
/// independent root with no root-count constraint.
pub fn lint_html_structure(
    html: &str,
    is_root_mode: bool,
    naming: &NamingOptions,
    policy: &SelectorPolicy,
    external: &ExternalClasses,
) -> Vec<HtmlLintIssue> {
    let doc = ParsedDocument::parse(html);
    let mut linter = Linter {
        naming,
        policy,
        external,
        issues: Vec::new(),
        path: Vec::new(),
    };

    if let Some(problem) = find_unbalanced_tag(&doc.sanitized) {
        linter
            .issues
            .push(HtmlLintIssue::document(LintCode::UnbalancedHtml, problem.to_string()));
    }

    let top = Ancestry {
        parent: None,
        has_block_ancestor: false,
    };

    if is_root_mode {
        if let Some((kind, element)) = doc.explicit_root_element() {
            if has_class(&element) {
                linter.walk(&element, top, true, 0);
            } else {
                linter.issues.push(HtmlLintIssue::document(
                    LintCode::InvalidBaseClass,
                    format!("root element <{}> has no class attribute", kind.tag()),
                ));
            }
        } else {
            let roots = doc.top_level_elements(has_class);
            match roots.len() {
                0 => linter.issues.push(HtmlLintIssue::document(
                    LintCode::InvalidBaseClass,
                    "no root element with a class attribute was found".to_string(),
                )),
                1 => {}
                n => linter.issues.push(HtmlLintIssue::document(
                    LintCode::MultipleRootElements,
                    format!("expected a single root element, found {}", n),
                )),
            }
            for root in &roots {
                linter.walk(root, top, true, 0);
            }
        }
    } else {
        for root in doc.top_level_elements(has_class) {
            linter.walk(&root, top, false, 0);
        }
    }

    tracing::debug!("lint finished with {} issue(s)", linter.issues.len());
    linter.issues
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn lint_html_native(
    html: String,
    is_root_mode: bool,
    config_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let config = crate::config::NormalizedConfig::from_json(config_json.as_deref())
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let issues = lint_html_structure(
        &html,
        is_root_mode,
        &config.naming,
        &config.policy,
        &config.external,
    );
    serde_json::to_value(issues).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::CaseStyle;
    use crate::policy::normalize_selector_policy;
    use serde_json::json;

    fn lint(html: &str, is_root_mode: bool) -> Vec<HtmlLintIssue> {
        lint_html_structure(
            html,
            is_root_mode,
            &NamingOptions::default(),
            &SelectorPolicy::default(),
            &ExternalClasses::default(),
        )
    }

    fn codes(issues: &[HtmlLintIssue]) -> Vec<LintCode> {
        issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn test_clean_markup_has_no_issues() {
        let issues = lint(
            r#"<div class="hero-banner"><h1 class="title"></h1><p class="lead" data-variant="large"></p></div>"#,
            true,
        );
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_root_not_block() {
        let issues = lint(r#"<div class="title">text</div>"#, true);
        assert!(codes(&issues).contains(&LintCode::RootNotBlock));
    }

    #[test]
    fn test_invalid_base_class() {
        let issues = lint(r#"<div class="hero-banner"><p class="Bad_Name"></p></div>"#, true);
        assert_eq!(codes(&issues), vec![LintCode::InvalidBaseClass]);
        assert_eq!(issues[0].path, vec!["hero-banner", "Bad_Name"]);
        assert_eq!(issues[0].base_class, "Bad_Name");
    }

    #[test]
    fn test_modifier_and_utility_without_base() {
        let issues = lint(r#"<div class="hero-banner"><p class="-primary u-mt"></p></div>"#, true);
        let found = codes(&issues);
        assert!(found.contains(&LintCode::InvalidBaseClass));
        assert!(found.contains(&LintCode::ModifierWithoutBase));
        assert!(found.contains(&LintCode::UtilityWithoutBase));
    }

    #[test]
    fn test_multiple_base_classes() {
        let issues = lint(r#"<div class="hero-banner"><p class="title lead"></p></div>"#, true);
        assert_eq!(codes(&issues), vec![LintCode::MultipleBaseClasses]);
    }

    #[test]
    fn test_disallowed_modifier_in_data_mode() {
        let issues = lint(r#"<div class="card-box -primary"></div>"#, true);
        assert_eq!(codes(&issues), vec![LintCode::DisallowedModifier]);
    }

    #[test]
    fn test_class_mode_attributes() {
        let policy = normalize_selector_policy(Some(&json!({
            "variant": { "mode": "class" },
            "state": { "mode": "class" }
        })))
        .unwrap();
        let issues = lint_html_structure(
            r#"<div class="card-box -primary" data-variant="primary" data-state="open" aria-expanded="true"></div>"#,
            true,
            &NamingOptions::default(),
            &policy,
            &ExternalClasses::default(),
        );
        assert_eq!(
            codes(&issues),
            vec![
                LintCode::DisallowedVariantAttribute,
                LintCode::DisallowedStateAttribute
            ]
        );
    }

    #[test]
    fn test_invalid_attribute_values() {
        let issues = lint(
            r#"<div class="card-box" data-variant="Primary" data-state="very-long-state" aria-expanded="TRUE"></div>"#,
            true,
        );
        assert_eq!(
            codes(&issues),
            vec![LintCode::InvalidVariantValue, LintCode::InvalidStateValue]
        );
    }

    #[test]
    fn test_element_without_block_ancestor_and_parent_of_block() {
        let issues = lint(
            r#"<div class="page-root"><div class="body"><div class="news-card"></div></div></div>"#,
            true,
        );
        assert_eq!(codes(&issues), vec![LintCode::ElementParentOfBlock]);

        let issues = lint(r#"<p class="title"></p><span class="label"></span>"#, false);
        assert_eq!(
            codes(&issues),
            vec![
                LintCode::ElementWithoutBlockAncestor,
                LintCode::ElementWithoutBlockAncestor
            ]
        );
    }

    #[test]
    fn test_multiple_roots_only_in_root_mode() {
        let html = r#"<div class="alpha-box"></div><div class="beta-box"></div>"#;
        assert_eq!(codes(&lint(html, true)), vec![LintCode::MultipleRootElements]);
        assert!(lint(html, false).is_empty());
    }

    #[test]
    fn test_missing_root() {
        let issues = lint("<div><p>plain</p></div>", true);
        assert_eq!(codes(&issues), vec![LintCode::InvalidBaseClass]);

        let issues = lint(
            "<html><body><div class=\"page-root\"></div></body></html>",
            true,
        );
        assert_eq!(codes(&issues), vec![LintCode::InvalidBaseClass]);
        assert!(issues[0].message.contains("<body>"));
    }

    #[test]
    fn test_unbalanced_html() {
        let issues = lint(r#"<div class="hero-banner"><span class="title"></div>"#, true);
        assert!(codes(&issues).contains(&LintCode::UnbalancedHtml));
    }

    #[test]
    fn test_external_classes() {
        let external = ExternalClasses {
            classes: vec!["swiper".to_string()],
            prefixes: vec!["js-".to_string()],
        };
        let lint_ext = |html: &str| {
            lint_html_structure(
                html,
                false,
                &NamingOptions::default(),
                &SelectorPolicy::default(),
                &external,
            )
        };
        assert!(lint_ext(r#"<div class="gallery-view"><div class="swiper js-slider"></div></div>"#).is_empty());
        assert_eq!(
            codes(&lint_ext(r#"<div class="gallery-view"><div class="swiper title"></div></div>"#)),
            vec![LintCode::InvalidBaseClass]
        );
    }

    #[test]
    fn test_pascal_naming() {
        let naming = NamingOptions::with_case(CaseStyle::Pascal);
        let issues = lint_html_structure(
            r#"<div class="HeroBanner"><h1 class="Title"></h1></div>"#,
            true,
            &naming,
            &SelectorPolicy::default(),
            &ExternalClasses::default(),
        );
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_never_panics_on_garbage() {
        for input in ["", "<", "<<<>>>", "<div class=\"", "{{{", "<% %>", "\u{0}\u{ffff}"] {
            let _ = lint(input, true);
            let _ = lint(input, false);
        }
    }

    #[test]
    fn test_issue_serializes_with_code_string() {
        let issues = lint(r#"<div class="title"></div>"#, true);
        let value = serde_json::to_value(&issues).unwrap();
        assert_eq!(value[0]["code"], "ROOT_NOT_BLOCK");
        assert_eq!(value[0]["baseClass"], "title");
    }
}
