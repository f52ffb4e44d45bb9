//! SCSS Emitter
//!
//! Generates one stylesheet per file-owning node (every root, plus every
//! independent Block below it) and an aggregator `index.scss`.
//!
//! ## File Layout
//!
//! ```text
//! <doc_dir>/<root>.scss                 page entry (root mode only)
//! <doc_dir>/<child_dir>/<block>.scss    every other Block, and selection-mode roots
//! <doc_dir>/<child_dir>/index.scss      one @use per non-entry file
//! ```
//!
//! The marker comments (`// --shared`, `// --interaction`, `// @rel/<path>`)
//! and the `@use` order are re-parsed by the stylelint rule package and must
//! not change shape.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::config::NormalizedConfig;
use crate::document::{class_tokens, has_class, ParsedDocument};
use crate::error::GenerateError;
use crate::naming::is_modifier_class;
use crate::policy::{SelectorMode, SelectorPolicy};
use crate::tree::{build_tree, AttributeSelector, ComponentTree, NodeId, TreeContext};

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS / OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCase {
    #[default]
    Kebab,
    Snake,
    Camel,
    Pascal,
    Preserve,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    pub global_scss_module: String,
    pub page_entry_prefix: String,
    /// Text after the page entry prefix. Defaults to the root file stem.
    pub page_entry_hint: Option<String>,
    pub child_scss_dir: String,
    pub layout_mixins: Vec<String>,
    pub root_file_case: FileCase,
    pub child_file_case: FileCase,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            global_scss_module: "../global".to_string(),
            page_entry_prefix: "@page".to_string(),
            page_entry_hint: None,
            child_scss_dir: "children".to_string(),
            layout_mixins: Vec::new(),
            root_file_case: FileCase::Kebab,
            child_file_case: FileCase::Kebab,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILE NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Lowercased words of a class name, split on `-`, `_`, whitespace and case
/// boundaries (`heroBanner`, `HTMLView` -> `html`, `view`).
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == '_' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.into_iter().map(|w| w.to_lowercase()).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn format_file_base(name: &str, case: FileCase) -> String {
    if case == FileCase::Preserve {
        return name.to_string();
    }
    let words = split_words(name);
    if words.is_empty() {
        return name.to_string();
    }
    match case {
        FileCase::Kebab => words.join("-"),
        FileCase::Snake => words.join("_"),
        FileCase::Camel => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
            .collect(),
        FileCase::Pascal => words.iter().map(|w| capitalize(w)).collect(),
        FileCase::Preserve => name.to_string(),
    }
}

fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn indent(lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(|line| {
        if line.is_empty() {
            line
        } else {
            format!("  {}", line)
        }
    })
}

/// `selector {}` when empty, otherwise a block with an indented body.
fn rule(selector: &str, body: Vec<String>) -> Vec<String> {
    if body.is_empty() {
        return vec![format!("{} {{}}", selector)];
    }
    let mut out = vec![format!("{} {{", selector)];
    out.extend(indent(body));
    out.push("}".to_string());
    out
}

/// Non-empty sections separated by one blank line.
fn join_sections(sections: Vec<Vec<String>>) -> Vec<String> {
    let mut out = Vec::new();
    for section in sections.into_iter().filter(|s| !s.is_empty()) {
        if !out.is_empty() {
            out.push(String::new());
        }
        out.extend(section);
    }
    out
}

fn mixin_name(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("@include ")
        .map(str::trim)
        .unwrap_or(trimmed)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMITTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a file-owning node's stylesheet lives, relative to the document dir.
#[derive(Debug, Clone)]
struct FileSlot {
    dir: String,
    stem: String,
}

impl FileSlot {
    fn file_name(&self) -> String {
        format!("{}.scss", self.stem)
    }
}

struct Emitter<'a> {
    tree: &'a ComponentTree,
    ctx: TreeContext<'a>,
    options: &'a GenerateOptions,
    doc_dir: &'a str,
    child_dir: String,
    is_root_mode: bool,
}

impl<'a> Emitter<'a> {
    fn is_page_entry(&self, id: NodeId) -> bool {
        self.is_root_mode && self.tree.node(id).is_root
    }

    fn slot(&self, id: NodeId) -> FileSlot {
        let base = &self.tree.node(id).base_class;
        if self.is_page_entry(id) {
            FileSlot {
                dir: String::new(),
                stem: format_file_base(base, self.options.root_file_case),
            }
        } else {
            FileSlot {
                dir: self.child_dir.clone(),
                stem: format_file_base(base, self.options.child_file_case),
            }
        }
    }

    /// Path of `to` as seen from a file in `from_dir`.
    fn relative(&self, from_dir: &str, to: &FileSlot) -> String {
        if from_dir == to.dir {
            to.file_name()
        } else if from_dir.is_empty() {
            join_path(&[&to.dir, &to.file_name()])
        } else {
            let ups = "../".repeat(from_dir.split('/').filter(|s| !s.is_empty()).count());
            format!("{}{}", ups, join_path(&[&to.dir, &to.file_name()]))
        }
    }

    /// File owners in pre-order, each with the owner whose file references it.
    fn owners(&self) -> Vec<(NodeId, Option<NodeId>)> {
        let mut out = Vec::new();
        for &root in self.tree.roots() {
            out.push((root, None));
            self.collect_owners(root, root, &mut out);
        }
        out
    }

    fn collect_owners(&self, id: NodeId, owner: NodeId, out: &mut Vec<(NodeId, Option<NodeId>)>) {
        for &child in &self.tree.node(id).ordered_children {
            if self.tree.node(child).is_independent {
                out.push((child, Some(owner)));
                self.collect_owners(child, child, out);
            } else {
                self.collect_owners(child, owner, out);
            }
        }
    }

    fn child_selector(&self, id: NodeId) -> String {
        let node = self.tree.node(id);
        if node.via_deep {
            format!(".{}", node.base_class)
        } else {
            format!("> .{}", node.base_class)
        }
    }

    // ── file ──────────────────────────────────────────────────────────────

    fn file(&self, id: NodeId, parent: Option<NodeId>) -> String {
        let node = self.tree.node(id);
        let slot = self.slot(id);

        let mut lines = vec![format!("@use \"{}\" as *;", self.options.global_scss_module)];
        if self.is_page_entry(id) {
            let hint = self
                .options
                .page_entry_hint
                .clone()
                .unwrap_or_else(|| slot.stem.clone());
            lines.push("@use \"sass:meta\";".to_string());
            lines.push(format!("// {}/{}", self.options.page_entry_prefix, hint));
        } else if let Some(parent) = parent {
            lines.push(format!(
                "// @rel/{}",
                self.relative(&slot.dir, &self.slot(parent))
            ));
        }
        lines.push(String::new());
        lines.extend(rule(&format!(".{}", node.base_class), self.owner_body(id, &slot)));

        let mut content = lines.join("\n");
        content.push('\n');
        content
    }

    fn owner_body(&self, id: NodeId, slot: &FileSlot) -> Vec<String> {
        let mut sections = Vec::new();
        if self.is_page_entry(id) && !self.tree.independent_descendants(id).is_empty() {
            let target = if self.child_dir.is_empty() {
                "index"
            } else {
                self.child_dir.as_str()
            };
            sections.push(vec![format!("@include meta.load-css(\"{}\");", target)]);
        }
        sections.extend(self.node_sections(id, &slot.dir));
        sections.push(vec!["// --shared".to_string()]);

        let mut interaction = vec!["// --interaction".to_string()];
        interaction.extend(rule("@at-root &", self.interaction_rules(id)));
        sections.push(interaction);

        join_sections(sections)
    }

    /// Scaffold, variants and children of a node, shared by file owners and
    /// inlined Elements.
    fn node_sections(&self, id: NodeId, file_dir: &str) -> Vec<Vec<String>> {
        let mut sections = vec![self.scaffold(), self.variant_rules(id)];
        for &child in &self.tree.node(id).ordered_children {
            sections.push(self.child_rule(child, file_dir));
        }
        sections
    }

    fn scaffold(&self) -> Vec<String> {
        if self.options.layout_mixins.is_empty() {
            return vec!["// layout".to_string()];
        }
        self.options
            .layout_mixins
            .iter()
            .flat_map(|mixin| {
                rule(
                    &format!("@include {}", mixin_name(mixin)),
                    vec!["// layout".to_string()],
                )
            })
            .collect()
    }

    fn variant_rules(&self, id: NodeId) -> Vec<String> {
        let node = self.tree.node(id);
        let policy = self.ctx.policy;
        let mut selectors = Vec::new();

        if policy.allows_class_modifiers() {
            selectors.extend(
                node.modifiers
                    .iter()
                    .filter(|m| is_modifier_class(m, self.ctx.naming))
                    .map(|m| format!("&.{}", m)),
            );
        }
        if policy.variant.mode == SelectorMode::Data {
            selectors.extend(
                node.variant_attributes
                    .iter()
                    .map(|attr| format!("&{}", attr.to_selector())),
            );
        }

        let includes: Vec<String> = self
            .options
            .layout_mixins
            .iter()
            .map(|mixin| format!("@include {} {{}}", mixin_name(mixin)))
            .collect();
        selectors
            .iter()
            .flat_map(|selector| rule(selector, includes.clone()))
            .collect()
    }

    fn child_rule(&self, id: NodeId, file_dir: &str) -> Vec<String> {
        let selector = self.child_selector(id);
        if self.tree.node(id).is_independent {
            let link = format!("// @rel/{}", self.relative(file_dir, &self.slot(id)));
            return rule(&selector, vec![link]);
        }
        rule(&selector, join_sections(self.node_sections(id, file_dir)))
    }

    // ── interaction ──────────────────────────────────────────────────────

    fn interaction_rules(&self, id: NodeId) -> Vec<String> {
        let mut out: Vec<String> = state_selectors(&self.tree.node(id).state_attributes, self.ctx.policy)
            .into_iter()
            .map(|selector| format!("{} {{}}", selector))
            .collect();
        self.collect_state_groups(id, "", &mut out);
        out
    }

    fn collect_state_groups(&self, id: NodeId, prefix: &str, out: &mut Vec<String>) {
        for &child in &self.tree.node(id).ordered_children {
            let node = self.tree.node(child);
            if node.is_independent {
                continue;
            }
            let path = if prefix.is_empty() {
                self.child_selector(child)
            } else {
                format!("{} {}", prefix, self.child_selector(child))
            };
            let states = state_selectors(&node.state_attributes, self.ctx.policy);
            if !states.is_empty() {
                let body = states.into_iter().map(|s| format!("{} {{}}", s)).collect();
                out.extend(rule(&path, body));
            }
            self.collect_state_groups(child, &path, out);
        }
    }

    // ── all files ────────────────────────────────────────────────────────

    fn emit(&self) -> Vec<GeneratedFile> {
        let mut files: Vec<GeneratedFile> = Vec::new();
        let mut index = Vec::new();

        for (id, parent) in self.owners() {
            let slot = self.slot(id);
            let path = join_path(&[self.doc_dir, &slot.dir, &slot.file_name()]);
            if files.iter().any(|f| f.path == path) {
                // merged into the first occurrence
                continue;
            }
            if !self.is_page_entry(id) {
                index.push(format!("@use \"{}\";", slot.stem));
            }
            files.push(GeneratedFile {
                path,
                content: self.file(id, parent),
            });
        }

        if !index.is_empty() {
            let mut content = index.join("\n");
            content.push('\n');
            files.push(GeneratedFile {
                path: join_path(&[self.doc_dir, &self.child_dir, "index.scss"]),
                content,
            });
        }
        files
    }
}

/// Emitted state selectors. The configured `data-` key only counts in data
/// mode; aria attributes always do.
fn state_selectors(states: &[AttributeSelector], policy: &SelectorPolicy) -> Vec<String> {
    states
        .iter()
        .filter(|attr| policy.state.mode == SelectorMode::Data || attr.key != policy.state.data_key)
        .map(|attr| format!("&{}", attr.to_selector()))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

fn resolve_root(
    doc: &ParsedDocument,
    ctx: &TreeContext<'_>,
    tree: &mut ComponentTree,
) -> Result<NodeId, GenerateError> {
    if let Some((kind, element)) = doc.explicit_root_element() {
        let base = class_tokens(&element)
            .and_then(|tokens| tokens.into_iter().next())
            .ok_or_else(|| GenerateError::MissingRootClass(kind.tag().to_string()))?;
        return build_tree(tree, &element, ctx, 0).ok_or(GenerateError::UnusableRootClass(base));
    }

    // Candidates are counted exactly as the linter counts them.
    let tops = doc.top_level_elements(has_class);
    match tops.as_slice() {
        [] => Err(GenerateError::NoRoot),
        [root] => build_tree(tree, root, ctx, 0).ok_or_else(|| {
            let base = class_tokens(root)
                .and_then(|tokens| tokens.into_iter().next())
                .unwrap_or_default();
            GenerateError::UnusableRootClass(base)
        }),
        many => Err(GenerateError::MultipleRoots(many.len())),
    }
}

/// Fold Blocks that land in the same file (the same Block used under
/// different parents) into their first occurrence, so that file carries
/// every occurrence's modifiers, attributes and children.
fn merge_shared_files(tree: &mut ComponentTree, is_root_mode: bool, case: FileCase) {
    let mut merged: HashSet<NodeId> = HashSet::new();
    loop {
        let owners: Vec<NodeId> = tree
            .roots()
            .iter()
            .flat_map(|&root| std::iter::once(root).chain(tree.independent_descendants(root)))
            .collect();

        let mut seen: HashMap<String, NodeId> = HashMap::new();
        let mut duplicate = None;
        for id in owners {
            let node = tree.node(id);
            if merged.contains(&id) || (is_root_mode && node.is_root) {
                continue;
            }
            let stem = format_file_base(&node.base_class, case);
            if let Some(&first) = seen.get(&stem) {
                duplicate = Some((first, id));
                break;
            }
            seen.insert(stem, id);
        }

        let Some((first, later)) = duplicate else {
            return;
        };
        tracing::debug!(
            ".{} appears under several parents; merging into one file",
            tree.node(first).base_class
        );
        tree.absorb(first, later);
        merged.insert(later);
    }
}

/// Generate the stylesheets for one markup document.
///
/// Root mode requires exactly one resolvable root with a class. Selection
/// mode turns every top-level classed element into its own root, merging
/// repeated roots with the same base class.
pub fn generate_from_html(
    html: &str,
    doc_dir: &str,
    is_root_mode: bool,
    config: &NormalizedConfig,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let doc = ParsedDocument::parse(html);
    let ctx = TreeContext {
        naming: &config.naming,
        policy: &config.policy,
        external: &config.external,
    };

    let mut tree = ComponentTree::new();
    if is_root_mode {
        let root = resolve_root(&doc, &ctx, &mut tree)?;
        tree.add_root(root);
    } else {
        for top in doc.top_level_elements(|h| ctx.has_usable_base(h)) {
            if let Some(id) = build_tree(&mut tree, &top, &ctx, 0) {
                tree.add_root(id);
            }
        }
        tree.dedup_roots();
    }
    merge_shared_files(&mut tree, is_root_mode, config.generate.child_file_case);

    let emitter = Emitter {
        tree: &tree,
        ctx,
        options: &config.generate,
        doc_dir,
        child_dir: config.generate.child_scss_dir.trim_matches('/').to_string(),
        is_root_mode,
    };
    let files = emitter.emit();
    tracing::debug!("generated {} file(s) under {:?}", files.len(), doc_dir);
    Ok(files)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn generate_from_html_native(
    html: String,
    doc_dir: String,
    is_root_mode: bool,
    config_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let config = NormalizedConfig::from_json(config_json.as_deref())
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let files = generate_from_html(&html, &doc_dir, is_root_mode, &config)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_value(files).map_err(|e| napi::Error::from_reason(e.to_string()))
}
