//! # Document Loading
//!
//! Sanitizes markup, parses it with html5ever into an `RcDom`, and resolves the
//! elements that act as roots for linting and generation.
//!
//! ## Root Resolution
//!
//! 1. **Explicit root**: the raw markup contains a genuine top-level `<body>`
//!    (preferred) or `<html>` tag. That element is the root whether or not it
//!    carries a class.
//! 2. **Implicit root**: otherwise html5ever's synthesized `html`/`head`/`body`
//!    wrappers are transparent, and the roots are the first classed elements
//!    reachable from the document without crossing another classed element.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::sanitize::{detect_explicit_root, sanitize, ExplicitRoot};
use crate::tree::MAX_DEPTH;

pub struct ParsedDocument {
    pub sanitized: String,
    pub explicit_root: Option<ExplicitRoot>,
    dom: RcDom,
}

impl ParsedDocument {
    pub fn parse(html: &str) -> Self {
        let sanitized = sanitize(html);
        let explicit_root = detect_explicit_root(&sanitized);
        tracing::debug!(
            "parsing {} bytes of sanitized markup (explicit root: {:?})",
            sanitized.len(),
            explicit_root
        );

        let dom = parse_document(RcDom::default(), Default::default()).one(sanitized.as_str());

        Self {
            sanitized,
            explicit_root,
            dom,
        }
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    /// The `<html>` or `<body>` element html5ever placed for an explicit root.
    pub fn explicit_root_element(&self) -> Option<(ExplicitRoot, Handle)> {
        let root = self.explicit_root?;
        let html = child_element(&self.dom.document, "html")?;
        match root {
            ExplicitRoot::Html => Some((root, html)),
            ExplicitRoot::Body => child_element(&html, "body").map(|body| (root, body)),
        }
    }

    /// First elements under the document satisfying `is_candidate`, found by
    /// descending through elements that do not.
    pub fn top_level_elements<F>(&self, is_candidate: F) -> Vec<Handle>
    where
        F: Fn(&Handle) -> bool,
    {
        let mut found = Vec::new();
        collect_candidates(&self.dom.document, &is_candidate, 0, &mut found);
        found
    }
}

fn collect_candidates<F>(handle: &Handle, is_candidate: &F, depth: usize, found: &mut Vec<Handle>)
where
    F: Fn(&Handle) -> bool,
{
    if depth >= MAX_DEPTH {
        tracing::warn!("markup nesting exceeds {} levels; deeper elements ignored", MAX_DEPTH);
        return;
    }
    for child in element_children(handle) {
        if is_candidate(&child) {
            found.push(child);
        } else {
            collect_candidates(&child, is_candidate, depth + 1, found);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLE HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn element_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn is_element(handle: &Handle) -> bool {
    matches!(handle.data, NodeData::Element { .. })
}

pub fn element_children(handle: &Handle) -> Vec<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .filter(|child| is_element(child))
        .cloned()
        .collect()
}

fn child_element(handle: &Handle, tag: &str) -> Option<Handle> {
    element_children(handle)
        .into_iter()
        .find(|child| element_name(child).is_some_and(|name| name == tag))
}

/// All attributes in source order, names as html5ever reports them (lowercase).
pub fn attributes(handle: &Handle) -> Vec<(String, String)> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn attribute(handle: &Handle, key: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == key)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Whitespace-split `class` tokens. `None` when the attribute is missing,
/// `Some(empty)` when it is present but blank.
pub fn class_tokens(handle: &Handle) -> Option<Vec<String>> {
    attribute(handle, "class").map(|value| value.split_whitespace().map(str::to_string).collect())
}

/// Element carries at least one class token.
pub fn has_class(handle: &Handle) -> bool {
    class_tokens(handle).is_some_and(|tokens| !tokens.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implicit_roots_skip_wrappers() {
        let doc = ParsedDocument::parse(
            r#"<div><section class="alpha-box"><p class="text"></p></section></div><div class="beta-box"></div>"#,
        );
        assert_eq!(doc.explicit_root, None);
        let roots = doc.top_level_elements(has_class);
        let classes: Vec<_> = roots
            .iter()
            .map(|r| attribute(r, "class").unwrap())
            .collect();
        assert_eq!(classes, vec!["alpha-box", "beta-box"]);
    }

    #[test]
    fn test_explicit_body_root() {
        let doc = ParsedDocument::parse(
            r#"<!doctype html><html><head><title>x</title></head><body class="page-root"><main class="content"></main></body></html>"#,
        );
        let (kind, element) = doc.explicit_root_element().unwrap();
        assert_eq!(kind, ExplicitRoot::Body);
        assert_eq!(element_name(&element).as_deref(), Some("body"));
        assert_eq!(class_tokens(&element), Some(vec!["page-root".to_string()]));
    }

    #[test]
    fn test_class_tokens_distinguish_missing_and_blank() {
        let doc = ParsedDocument::parse(r#"<p class=""></p><span></span>"#);
        let body = doc.explicit_root_element();
        assert!(body.is_none());
        let all = doc.top_level_elements(|h| element_name(h).is_some_and(|n| n == "p" || n == "span"));
        assert_eq!(class_tokens(&all[0]), Some(vec![]));
        assert_eq!(class_tokens(&all[1]), None);
        assert!(!has_class(&all[0]));
    }
}
