//! HTML Sanitizer
//!
//! Regex pipeline that makes templated markup (JSX, Astro, EJS, Nunjucks, Vue
//! and Svelte attribute syntax) digestible by html5ever while keeping every
//! static class token intact.
//!
//! Steps run in a fixed order so later steps always see `class="..."`:
//!
//! 1. Fold templated `className` / `class` attributes into `class="..."`
//! 2. Strip frontmatter, CDATA and `<script>` / `<style>` contents
//! 3. Remove template-engine syntax and binding attributes
//! 4. Close capitalized self-closing tags
//! 5. Clean class value whitespace
//!
//! The module also hosts the structure scanners that work on raw text rather
//! than the parsed DOM: explicit root detection and tag balance.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashSet;

lazy_static! {
    // Step 1
    static ref TEMPLATE_CLASS_RE: Regex =
        Regex::new(r"(^|\s)(?:className|class)\s*=\s*\{\s*`([^`]*)`\s*\}").unwrap();
    static ref BRACED_STRING_CLASS_RE: Regex =
        Regex::new(r#"(^|\s)(?:className|class)\s*=\s*\{\s*(?:"([^"]*)"|'([^']*)')\s*\}"#).unwrap();
    static ref QUOTED_CLASS_RE: Regex =
        Regex::new(r#"(^|\s)(?:className\s*=\s*(?:"([^"]*)"|'([^']*)')|class\s*=\s*'([^']*)')"#).unwrap();
    static ref INTERPOLATION_RE: Regex = Regex::new(r"\$\{[^}]*\}").unwrap();

    // Step 2
    static ref FRONTMATTER_RE: Regex =
        Regex::new(r"\A\s*---[ \t]*\r?\n[\s\S]*?\r?\n---[ \t]*(?:\r?\n|\z)").unwrap();
    static ref CDATA_RE: Regex = Regex::new(r"<!\[CDATA\[[\s\S]*?\]\]>").unwrap();
    static ref SCRIPT_RE: Regex = Regex::new(r"(?is)<script\b([^>]*)>.*?</script\s*>").unwrap();
    static ref STYLE_RE: Regex = Regex::new(r"(?is)<style\b([^>]*)>.*?</style\s*>").unwrap();

    // Step 3
    static ref JSX_COMMENT_RE: Regex = Regex::new(r"\{\s*/\*[\s\S]*?\*/\s*\}").unwrap();
    static ref BRACE_ATTR_RE: Regex =
        Regex::new(r"\s+(?:[A-Za-z_:@#$][\w:.\-@#$]*\s*=\s*\{|\{\s*\.\.\.)").unwrap();
    static ref EJS_RE: Regex = Regex::new(r"<%[\s\S]*?%>").unwrap();
    static ref NUNJUCKS_OUTPUT_RE: Regex = Regex::new(r"\{\{[\s\S]*?\}\}").unwrap();
    static ref NUNJUCKS_TAG_RE: Regex = Regex::new(r"\{%[\s\S]*?%\}").unwrap();
    static ref NUNJUCKS_COMMENT_RE: Regex = Regex::new(r"\{#[\s\S]*?#\}").unwrap();
    static ref JSX_FRAGMENT_RE: Regex = Regex::new(r"</?>").unwrap();
    static ref START_TAG_RE: Regex =
        Regex::new(r#"<([A-Za-z][^\s/>]*)((?:"[^"]*"|'[^']*'|[^'">])*)>"#).unwrap();
    static ref ATTRIBUTE_RE: Regex =
        Regex::new(r#"\s+([^\s=>/"'<]+)(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>"']+))?"#).unwrap();
    static ref MULTI_SPACE_RE: Regex = Regex::new(r"[ \t]{2,}").unwrap();

    // Step 4
    static ref SELF_CLOSING_RE: Regex =
        Regex::new(r"<([A-Z][a-zA-Z0-9.]*)\s*([^>]*?)\s*/>").unwrap();

    // Step 5
    static ref CLASS_VALUE_RE: Regex = Regex::new(r#"(\s)class\s*=\s*"([^"]*)""#).unwrap();

    // Structure scanning
    static ref COMMENT_RE: Regex = Regex::new(r"<!--[\s\S]*?-->").unwrap();
    static ref SCRIPT_BLOCK_RE: Regex = Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap();
    static ref STYLE_BLOCK_RE: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap();
    static ref TEXT_CONTAINER_RES: Vec<Regex> = TEXT_CONTAINER_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect();
    static ref TAG_RE: Regex = Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9:.\-]*)[^>]*?(/?)>").unwrap();

    static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr", "keygen", "command",
    ]
    .into_iter()
    .collect();
}

/// Elements whose content is text, not structure.
pub const TEXT_CONTAINER_TAGS: &[&str] = &[
    "template",
    "textarea",
    "noscript",
    "xmp",
    "listing",
    "foreignObject",
];

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Sanitize raw markup for DOM parsing. Total over all strings.
pub fn sanitize(raw: &str) -> String {
    let folded = fold_class_attributes(raw);
    let stripped = strip_blocks(&folded);
    let detemplated = strip_template_syntax(&stripped);
    let closed = convert_self_closing_components(&detemplated);
    clean_class_values(&closed)
}

fn fold_class_attributes(html: &str) -> String {
    let result = TEMPLATE_CLASS_RE.replace_all(html, |caps: &Captures| {
        let static_text = INTERPOLATION_RE.replace_all(&caps[2], " ");
        format!("{}class=\"{}\"", &caps[1], static_text)
    });

    let result = BRACED_STRING_CLASS_RE.replace_all(&result, |caps: &Captures| {
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        format!("{}class=\"{}\"", &caps[1], value)
    });

    QUOTED_CLASS_RE
        .replace_all(&result, |caps: &Captures| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            format!("{}class=\"{}\"", &caps[1], value)
        })
        .into_owned()
}

/// Drop frontmatter and CDATA; empty `<script>` / `<style>` while keeping the
/// tags so tag balance is unaffected.
fn strip_blocks(html: &str) -> String {
    let result = FRONTMATTER_RE.replace(html, "");
    let result = CDATA_RE.replace_all(&result, "");
    let result = SCRIPT_RE.replace_all(&result, "<script$1></script>");
    STYLE_RE.replace_all(&result, "<style$1></style>").into_owned()
}

fn strip_template_syntax(html: &str) -> String {
    let result = JSX_COMMENT_RE.replace_all(html, "");
    let result = strip_brace_attributes(&result);
    let result = EJS_RE.replace_all(&result, "");
    let result = NUNJUCKS_OUTPUT_RE.replace_all(&result, "");
    let result = NUNJUCKS_TAG_RE.replace_all(&result, "");
    let result = NUNJUCKS_COMMENT_RE.replace_all(&result, "");
    let result = JSX_FRAGMENT_RE.replace_all(&result, "");
    let result = strip_binding_attributes(&result);
    let result = INTERPOLATION_RE.replace_all(&result, "");
    MULTI_SPACE_RE.replace_all(&result, " ").into_owned()
}

/// Drop `on*`, `:`/`@`/`#` directive and `dangerouslySetInnerHTML`
/// attributes. Only start tags are rewritten; text content is left alone.
fn strip_binding_attributes(html: &str) -> String {
    START_TAG_RE
        .replace_all(html, |caps: &Captures| {
            let attrs = ATTRIBUTE_RE.replace_all(&caps[2], |attr: &Captures| {
                if is_binding_attribute(&attr[1]) {
                    String::new()
                } else {
                    attr[0].to_string()
                }
            });
            format!("<{}{}>", &caps[1], attrs)
        })
        .into_owned()
}

fn is_binding_attribute(name: &str) -> bool {
    let is_event = name
        .strip_prefix("on")
        .is_some_and(|event| !event.is_empty() && event.chars().all(|c| c.is_ascii_alphabetic()));
    is_event || name.starts_with([':', '@', '#']) || name == "dangerouslySetInnerHTML"
}

/// Remove `name={...}` attributes and `{...spread}` with a balanced scan, so
/// nested braces and strings inside handlers do not cut the match short.
fn strip_brace_attributes(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    let mut search_from = 0;

    while search_from < html.len() {
        let Some(m) = BRACE_ATTR_RE.find_at(html, search_from) else {
            break;
        };
        let brace = m.start() + m.as_str().find('{').unwrap_or(0);
        match find_balanced_brace_end(html, brace) {
            Some(end) => {
                out.push_str(&html[last..m.start()]);
                last = end;
                search_from = end;
            }
            None => search_from = m.end(),
        }
    }

    out.push_str(&html[last..]);
    out
}

/// Find the byte index just past the brace closing the one at `start`,
/// skipping over string and template literals. `None` if unbalanced.
pub(crate) fn find_balanced_brace_end(html: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut in_template_literal = false;
    let mut template_brace_depth = 0usize;
    let mut escaped = false;

    for (i, c) in html[start..].char_indices() {
        let pos = start + i;

        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }

        if let Some(quote) = in_string {
            if c == quote {
                in_string = None;
            }
            continue;
        }

        if in_template_literal {
            match c {
                '`' if template_brace_depth == 0 => in_template_literal = false,
                '{' if html[..pos].ends_with('$') => template_brace_depth += 1,
                '}' if template_brace_depth > 0 => template_brace_depth -= 1,
                _ => {}
            }
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            '`' => in_template_literal = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(pos + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// `<Foo/>` → `<Foo></Foo>`; html5ever would otherwise treat it as an open tag
/// and nest the following siblings inside it.
fn convert_self_closing_components(html: &str) -> String {
    SELF_CLOSING_RE
        .replace_all(html, |caps: &Captures| {
            let name = &caps[1];
            let attrs = caps[2].trim();
            if attrs.is_empty() {
                format!("<{}></{}>", name, name)
            } else {
                format!("<{} {}></{}>", name, attrs, name)
            }
        })
        .into_owned()
}

fn clean_class_values(html: &str) -> String {
    CLASS_VALUE_RE
        .replace_all(html, |caps: &Captures| {
            let tokens: Vec<&str> = caps[2]
                .split_whitespace()
                .filter(|t| *t != "-" && *t != "_")
                .collect();
            format!("{}class=\"{}\"", &caps[1], tokens.join(" "))
        })
        .into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRUCTURE SCANNING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplicitRoot {
    Html,
    Body,
}

impl ExplicitRoot {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Body => "body",
        }
    }
}

/// Copy of `markup` reduced to real structure: comments, CDATA, script/style,
/// text containers removed and quoted attribute values blanked.
fn strip_for_structure(markup: &str) -> String {
    let result = COMMENT_RE.replace_all(markup, "");
    let result = CDATA_RE.replace_all(&result, "");
    let result = SCRIPT_BLOCK_RE.replace_all(&result, "");
    let mut result = STYLE_BLOCK_RE.replace_all(&result, "").into_owned();
    for re in TEXT_CONTAINER_RES.iter() {
        result = re.replace_all(&result, "").into_owned();
    }
    blank_attribute_values(&result)
}

/// Empty every quoted attribute value inside tags, so markup-looking text in
/// attributes cannot be mistaken for tags. Text outside tags is untouched.
fn blank_attribute_values(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut chars = markup.chars().peekable();
    let mut in_tag = false;
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
                out.push(c);
            }
            continue;
        }
        if in_tag {
            match c {
                '"' | '\'' => quote = Some(c),
                '>' => in_tag = false,
                _ => {}
            }
            out.push(c);
            continue;
        }
        if c == '<' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_alphabetic() || next == '/' {
                    in_tag = true;
                }
            }
        }
        out.push(c);
    }

    out
}

fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(name)
}

/// Find a genuine top-level `<html>` or `<body>` tag. `<body>` counts at depth
/// 0, or at depth 1 directly inside a top-level `<html>`.
pub fn detect_explicit_root(markup: &str) -> Option<ExplicitRoot> {
    let structure = strip_for_structure(markup);
    let mut depth = 0usize;
    let mut html_open = false;
    let mut found_html = false;
    let mut found_body = false;

    for caps in TAG_RE.captures_iter(&structure) {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        let self_closing = !caps[3].is_empty();

        if closing {
            if is_void_element(&name) {
                continue;
            }
            depth = depth.saturating_sub(1);
            if name == "html" && depth == 0 {
                html_open = false;
            }
            continue;
        }

        match name.as_str() {
            "html" if depth == 0 => {
                found_html = true;
                html_open = true;
            }
            "body" if depth == 0 || (depth == 1 && html_open) => found_body = true,
            _ => {}
        }

        if !self_closing && !is_void_element(&name) {
            depth += 1;
        }
    }

    if found_body {
        Some(ExplicitRoot::Body)
    } else if found_html {
        Some(ExplicitRoot::Html)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagBalanceError {
    #[error("<{0}> is never closed")]
    Unclosed(String),
    #[error("</{0}> has no matching opening tag")]
    UnexpectedClose(String),
}

/// First tag-balance problem in `markup`, ignoring void elements,
/// self-closing tags and text containers.
pub fn find_unbalanced_tag(markup: &str) -> Option<TagBalanceError> {
    let structure = strip_for_structure(markup);
    let mut stack: Vec<String> = Vec::new();

    for caps in TAG_RE.captures_iter(&structure) {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        let self_closing = !caps[3].is_empty();

        if is_void_element(&name) || (self_closing && !closing) {
            continue;
        }

        if !closing {
            stack.push(name);
            continue;
        }

        match stack.last().cloned() {
            Some(top) if top == name => {
                stack.pop();
            }
            Some(top) if stack.contains(&name) => return Some(TagBalanceError::Unclosed(top)),
            _ => return Some(TagBalanceError::UnexpectedClose(name)),
        }
    }

    stack.pop().map(TagBalanceError::Unclosed)
}
