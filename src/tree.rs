//! Tree Builder
//!
//! Turns a DOM subtree into a logical component tree: one node per element
//! with a usable base class, with unclassed (or invalid-classed) wrapper
//! elements dissolved so their classed descendants attach to the nearest
//! classed ancestor.
//!
//! Nodes live in an arena (`ComponentTree`) and refer to each other by
//! `NodeId`. Duplicate sibling base classes are merged into the first-seen
//! node; the merged-away node stays in the arena but is no longer reachable.

use markup5ever_rcdom::Handle;
use serde::Serialize;

use crate::document::{attributes, class_tokens, element_children};
use crate::naming::{classify_base_class, BaseClassKind, ExternalClasses, NamingOptions};
use crate::policy::SelectorPolicy;

/// Maximum DOM depth explored below a root. Deeper content is ignored.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSelector {
    pub key: String,
    pub value: String,
}

impl AttributeSelector {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `[key="value"]`, or `[key]` for a valueless attribute.
    pub fn to_selector(&self) -> String {
        if self.value.is_empty() {
            format!("[{}]", self.key)
        } else {
            format!("[{}=\"{}\"]", self.key, self.value.replace('"', "\\\""))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStructure {
    pub base_class: String,
    pub is_independent: bool,
    pub modifiers: Vec<String>,
    pub variant_attributes: Vec<AttributeSelector>,
    pub state_attributes: Vec<AttributeSelector>,
    pub nested_children: Vec<NodeId>,
    pub independent_children: Vec<NodeId>,
    pub ordered_children: Vec<NodeId>,
    pub element_tag: String,
    pub is_root: bool,
    pub via_deep: bool,
}

/// Naming inputs shared by every node of one build.
#[derive(Debug, Clone, Copy)]
pub struct TreeContext<'a> {
    pub naming: &'a NamingOptions,
    pub policy: &'a SelectorPolicy,
    pub external: &'a ExternalClasses,
}

impl TreeContext<'_> {
    pub fn base_kind(&self, name: &str) -> BaseClassKind {
        classify_base_class(name, self.naming, self.external)
    }

    /// The element's first class token classifies as Block, Element or external.
    pub fn has_usable_base(&self, handle: &Handle) -> bool {
        class_tokens(handle)
            .and_then(|tokens| tokens.into_iter().next())
            .is_some_and(|base| self.base_kind(&base) != BaseClassKind::Invalid)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ComponentTree {
    nodes: Vec<ComponentStructure>,
    roots: Vec<NodeId>,
}

impl ComponentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &ComponentStructure {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ComponentStructure {
        &mut self.nodes[id.0]
    }

    fn alloc(&mut self, node: ComponentStructure) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn add_root(&mut self, id: NodeId) {
        self.node_mut(id).is_root = true;
        self.roots.push(id);
    }

    /// Merge top-level roots sharing a base class.
    pub fn dedup_roots(&mut self) {
        let roots = std::mem::take(&mut self.roots);
        self.roots = self.dedup_children(roots);
    }

    /// Levels in the longest chain starting at `id`.
    pub fn depth(&self, id: NodeId) -> usize {
        1 + self
            .node(id)
            .ordered_children
            .iter()
            .map(|&child| self.depth(child))
            .max()
            .unwrap_or(0)
    }

    /// Independent nodes strictly below `id`, depth-first pre-order.
    pub fn independent_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_independent(id, &mut found);
        found
    }

    fn collect_independent(&self, id: NodeId, found: &mut Vec<NodeId>) {
        for &child in &self.node(id).ordered_children {
            if self.node(child).is_independent {
                found.push(child);
            }
            self.collect_independent(child, found);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MERGE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Merge duplicate base classes into their first occurrence, preserving
    /// first-seen order.
    fn dedup_children(&mut self, ids: Vec<NodeId>) -> Vec<NodeId> {
        let mut kept: Vec<NodeId> = Vec::with_capacity(ids.len());
        for id in ids {
            let existing = kept
                .iter()
                .copied()
                .find(|&k| k != id && self.node(k).base_class == self.node(id).base_class);
            match existing {
                Some(target) => self.merge_into(target, id),
                None if !kept.contains(&id) => kept.push(id),
                None => {}
            }
        }
        kept
    }

    /// Merge a node from elsewhere in the tree into `target`. Unlike a
    /// sibling merge, `target` keeps its own selector position; `source`
    /// stays in place with no content left.
    pub fn absorb(&mut self, target: NodeId, source: NodeId) {
        if target == source {
            return;
        }
        let via_deep = self.node(target).via_deep;
        self.merge_into(target, source);
        self.node_mut(target).via_deep = via_deep;
    }

    fn merge_into(&mut self, target: NodeId, source: NodeId) {
        let src = self.node_mut(source);
        let modifiers = std::mem::take(&mut src.modifiers);
        let variant_attributes = std::mem::take(&mut src.variant_attributes);
        let state_attributes = std::mem::take(&mut src.state_attributes);
        let children = std::mem::take(&mut src.ordered_children);
        src.nested_children.clear();
        src.independent_children.clear();
        let src_independent = src.is_independent;
        let src_via_deep = src.via_deep;

        let dst = self.node_mut(target);
        if dst.is_independent != src_independent {
            // Independence is a function of the base class alone, so two
            // occurrences should never disagree.
            tracing::warn!(
                "duplicate .{} disagrees on independence; following the later occurrence",
                dst.base_class
            );
            dst.is_independent = src_independent;
        }
        dst.via_deep = dst.via_deep && src_via_deep;
        extend_unique(&mut dst.modifiers, modifiers);
        extend_unique(&mut dst.variant_attributes, variant_attributes);
        extend_unique(&mut dst.state_attributes, state_attributes);

        let mut combined = std::mem::take(&mut dst.ordered_children);
        combined.extend(children);
        let merged = self.dedup_children(combined);
        self.set_children(target, merged);
    }

    /// Store `ordered` and derive both buckets from it.
    fn set_children(&mut self, id: NodeId, ordered: Vec<NodeId>) {
        let (independent, nested): (Vec<NodeId>, Vec<NodeId>) = ordered
            .iter()
            .copied()
            .partition(|&child| self.node(child).is_independent);
        let node = self.node_mut(id);
        node.ordered_children = ordered;
        node.nested_children = nested;
        node.independent_children = independent;
    }
}

fn extend_unique<T: PartialEq>(into: &mut Vec<T>, items: Vec<T>) {
    for item in items {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILD
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the subtree rooted at `element`. Returns `None` when the element has
/// no usable base class or `depth` reached `MAX_DEPTH`.
pub fn build_tree(
    tree: &mut ComponentTree,
    element: &Handle,
    ctx: &TreeContext<'_>,
    depth: usize,
) -> Option<NodeId> {
    if depth >= MAX_DEPTH {
        tracing::warn!("component tree deeper than {} levels; truncating", MAX_DEPTH);
        return None;
    }

    let tokens = class_tokens(element)?;
    let (base, rest) = tokens.split_first()?;
    let kind = ctx.base_kind(base);
    if kind == BaseClassKind::Invalid {
        return None;
    }

    let mut modifiers = Vec::new();
    extend_unique(&mut modifiers, rest.to_vec());
    let (variant_attributes, state_attributes) = attribute_selectors(element, ctx.policy);

    let mut children = Vec::new();
    for child in element_children(element) {
        if ctx.has_usable_base(&child) {
            if let Some(id) = build_tree(tree, &child, ctx, depth + 1) {
                children.push(id);
            }
        } else {
            collect_deep(tree, &child, ctx, depth + 1, &mut children);
        }
    }

    let id = tree.alloc(ComponentStructure {
        base_class: base.clone(),
        is_independent: kind == BaseClassKind::Block,
        modifiers,
        variant_attributes,
        state_attributes,
        nested_children: Vec::new(),
        independent_children: Vec::new(),
        ordered_children: Vec::new(),
        element_tag: crate::document::element_name(element).unwrap_or_default(),
        is_root: false,
        via_deep: false,
    });

    let ordered = tree.dedup_children(children);
    tree.set_children(id, ordered);
    Some(id)
}

/// Descend through a wrapper without a usable class, collecting the first
/// usable descendants on every branch.
fn collect_deep(
    tree: &mut ComponentTree,
    wrapper: &Handle,
    ctx: &TreeContext<'_>,
    depth: usize,
    out: &mut Vec<NodeId>,
) {
    if depth >= MAX_DEPTH {
        return;
    }
    for child in element_children(wrapper) {
        if ctx.has_usable_base(&child) {
            if let Some(id) = build_tree(tree, &child, ctx, depth + 1) {
                tree.node_mut(id).via_deep = true;
                out.push(id);
            }
        } else {
            collect_deep(tree, &child, ctx, depth + 1, out);
        }
    }
}

/// Variant and state attribute candidates, each deduplicated by key=value.
fn attribute_selectors(
    element: &Handle,
    policy: &SelectorPolicy,
) -> (Vec<AttributeSelector>, Vec<AttributeSelector>) {
    let mut variants = Vec::new();
    let mut states = Vec::new();
    for (key, value) in attributes(element) {
        let selector = AttributeSelector::new(key.as_str(), value.trim());
        if policy.is_variant_key(&key) && !variants.contains(&selector) {
            variants.push(selector.clone());
        }
        if policy.is_state_key(&key) && !states.contains(&selector) {
            states.push(selector);
        }
    }
    (variants, states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ParsedDocument;

    fn build(html: &str) -> (ComponentTree, Vec<NodeId>) {
        let naming = NamingOptions::default();
        let policy = SelectorPolicy::default();
        let external = ExternalClasses {
            classes: vec!["swiper".to_string()],
            prefixes: vec![],
        };
        let ctx = TreeContext {
            naming: &naming,
            policy: &policy,
            external: &external,
        };
        let doc = ParsedDocument::parse(html);
        let mut tree = ComponentTree::new();
        for top in doc.top_level_elements(|h| ctx.has_usable_base(h)) {
            if let Some(id) = build_tree(&mut tree, &top, &ctx, 0) {
                tree.add_root(id);
            }
        }
        let roots = tree.roots().to_vec();
        (tree, roots)
    }

    fn bases(tree: &ComponentTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| tree.node(id).base_class.clone()).collect()
    }

    #[test]
    fn test_builds_blocks_and_elements() {
        let (tree, roots) = build(
            r#"<div class="hero-banner"><h1 class="title"></h1><div class="cta-button"></div></div>"#,
        );
        assert_eq!(roots.len(), 1);
        let root = tree.node(roots[0]);
        assert!(root.is_root);
        assert!(root.is_independent);
        assert_eq!(bases(&tree, &root.ordered_children), vec!["title", "cta-button"]);
        assert_eq!(bases(&tree, &root.nested_children), vec!["title"]);
        assert_eq!(bases(&tree, &root.independent_children), vec!["cta-button"]);
    }

    #[test]
    fn test_unclassed_wrappers_are_dissolved() {
        let (tree, roots) = build(
            r#"<div class="card-list"><div><ul><li class="item"></li></ul></div><p class="note"></p></div>"#,
        );
        let root = tree.node(roots[0]);
        assert_eq!(bases(&tree, &root.ordered_children), vec!["item", "note"]);
        assert!(tree.node(root.ordered_children[0]).via_deep);
        assert!(!tree.node(root.ordered_children[1]).via_deep);
    }

    #[test]
    fn test_invalid_base_is_skipped_like_a_wrapper() {
        let (tree, roots) = build(
            r#"<div class="card-box"><div class="u-flex"><span class="label"></span></div></div>"#,
        );
        let root = tree.node(roots[0]);
        assert_eq!(bases(&tree, &root.ordered_children), vec!["label"]);
        assert!(tree.node(root.ordered_children[0]).via_deep);
    }

    #[test]
    fn test_duplicate_siblings_are_merged() {
        let (tree, roots) = build(
            r#"<ul class="tag-list">
                <li class="tag -red" data-variant="en"><span class="name"></span></li>
                <li class="tag -blue" data-variant="ja"><span class="count"></span></li>
                <li class="tag -red" data-variant="en"><span class="name -bold"></span></li>
            </ul>"#,
        );
        let root = tree.node(roots[0]);
        assert_eq!(root.ordered_children.len(), 1);
        let tag = tree.node(root.ordered_children[0]);
        assert_eq!(tag.modifiers, vec!["-red", "-blue"]);
        assert_eq!(
            tag.variant_attributes,
            vec![
                AttributeSelector::new("data-variant", "en"),
                AttributeSelector::new("data-variant", "ja"),
            ]
        );
        assert_eq!(bases(&tree, &tag.ordered_children), vec!["name", "count"]);
        let name = tree.node(tag.ordered_children[0]);
        assert_eq!(name.modifiers, vec!["-bold"]);
    }

    #[test]
    fn test_ordered_children_match_buckets() {
        let (tree, roots) = build(
            r#"<div class="page-shell"><p class="lead"></p><nav class="site-nav"></nav><p class="lead"></p><nav class="site-nav"></nav></div>"#,
        );
        let root = tree.node(roots[0]);
        assert_eq!(bases(&tree, &root.ordered_children), vec!["lead", "site-nav"]);
        for id in &root.ordered_children {
            let in_nested = root.nested_children.contains(id);
            let in_independent = root.independent_children.contains(id);
            assert!(in_nested ^ in_independent);
        }
    }

    #[test]
    fn test_state_and_variant_attributes_are_collected() {
        let (tree, roots) = build(
            r#"<div class="menu-panel" data-variant="dark" data-state="open" aria-expanded="true" data-other="x"></div>"#,
        );
        let root = tree.node(roots[0]);
        assert_eq!(
            root.variant_attributes,
            vec![AttributeSelector::new("data-variant", "dark")]
        );
        assert_eq!(
            root.state_attributes,
            vec![
                AttributeSelector::new("data-state", "open"),
                AttributeSelector::new("aria-expanded", "true"),
            ]
        );
    }

    #[test]
    fn test_external_base_is_nested() {
        let (tree, roots) = build(r#"<div class="gallery-view"><div class="swiper"></div></div>"#);
        let root = tree.node(roots[0]);
        let external = tree.node(root.ordered_children[0]);
        assert_eq!(external.base_class, "swiper");
        assert!(!external.is_independent);
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut html = String::from(r#"<div class="deep-root">"#);
        for _ in 0..400 {
            html.push_str(r#"<div class="level">"#);
        }
        for _ in 0..400 {
            html.push_str("</div>");
        }
        html.push_str("</div>");
        let (tree, roots) = build(&html);
        assert_eq!(roots.len(), 1);
        assert!(tree.depth(roots[0]) <= MAX_DEPTH);
    }

    #[test]
    fn test_dedup_roots() {
        let (mut tree, _) = build(
            r#"<div class="info-card -a"></div><div class="info-card -b"></div>"#,
        );
        tree.dedup_roots();
        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.node(tree.roots()[0]).modifiers, vec!["-a", "-b"]);
    }

    #[test]
    fn test_absorb_keeps_target_position() {
        let (mut tree, roots) = build(
            r#"<main class="top-page"><article class="news-card"><h2 class="title"></h2></article><aside class="side-bar"><div><article class="news-card -dark"><p class="excerpt"></p></article></div></aside></main>"#,
        );
        let root = tree.node(roots[0]);
        let first = root.ordered_children[0];
        let side_bar = root.ordered_children[1];
        let later = tree.node(side_bar).ordered_children[0];
        assert!(tree.node(later).via_deep);

        tree.absorb(first, later);
        let card = tree.node(first);
        assert!(!card.via_deep);
        assert_eq!(card.modifiers, vec!["-dark"]);
        assert_eq!(bases(&tree, &card.ordered_children), vec!["title", "excerpt"]);
        assert!(tree.node(later).ordered_children.is_empty());
        assert_eq!(tree.node(side_bar).ordered_children, vec![later]);
    }

    #[test]
    fn test_attribute_selector_format() {
        assert_eq!(
            AttributeSelector::new("data-state", "loading").to_selector(),
            r#"[data-state="loading"]"#
        );
        assert_eq!(AttributeSelector::new("data-open", "").to_selector(), "[data-open]");
    }
}
