//! Batch runs over many documents.
//!
//! Each document is parsed, linted or generated independently, so the work
//! fans out over rayon's pool. Results come back in input order.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::codegen::{generate_from_html, GeneratedFile};
use crate::config::NormalizedConfig;
use crate::error::GenerateError;
use crate::validate::{lint_html_structure, HtmlLintIssue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInput {
    /// Path of the markup document; its parent directory is the output dir.
    pub path: String,
    pub html: String,
}

impl BatchInput {
    pub fn new(path: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            html: html.into(),
        }
    }

    fn doc_dir(&self) -> String {
        Path::new(&self.path)
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchLint {
    pub path: String,
    pub issues: Vec<HtmlLintIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchGenerate {
    pub path: String,
    pub result: Result<Vec<GeneratedFile>, GenerateError>,
}

pub fn lint_many(inputs: &[BatchInput], is_root_mode: bool, config: &NormalizedConfig) -> Vec<BatchLint> {
    tracing::debug!("linting {} document(s)", inputs.len());
    inputs
        .par_iter()
        .map(|input| BatchLint {
            path: input.path.clone(),
            issues: lint_html_structure(
                &input.html,
                is_root_mode,
                &config.naming,
                &config.policy,
                &config.external,
            ),
        })
        .collect()
}

pub fn generate_many(
    inputs: &[BatchInput],
    is_root_mode: bool,
    config: &NormalizedConfig,
) -> Vec<BatchGenerate> {
    tracing::debug!("generating styles for {} document(s)", inputs.len());
    inputs
        .par_iter()
        .map(|input| {
            let result = generate_from_html(&input.html, &input.doc_dir(), is_root_mode, config);
            if let Err(e) = &result {
                tracing::warn!("{}: {}", input.path, e);
            }
            BatchGenerate {
                path: input.path.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::LintCode;

    fn inputs() -> Vec<BatchInput> {
        vec![
            BatchInput::new("src/pages/index.html", r#"<div class="top-page"></div>"#),
            BatchInput::new("src/pages/about.html", r#"<div class="title"></div>"#),
            BatchInput::new(
                "about-page.html",
                r#"<div class="alpha-box"></div><div class="beta-box"></div>"#,
            ),
        ]
    }

    #[test]
    fn test_lint_many_keeps_order() {
        let results = lint_many(&inputs(), true, &NormalizedConfig::default());
        let summary: Vec<(&str, usize)> = results
            .iter()
            .map(|r| (r.path.as_str(), r.issues.len()))
            .collect();
        assert_eq!(summary[0], ("src/pages/index.html", 0));
        assert_eq!(summary[1].0, "src/pages/about.html");
        assert!(results[1]
            .issues
            .iter()
            .any(|i| i.code == LintCode::RootNotBlock));
        assert_eq!(results[2].issues[0].code, LintCode::MultipleRootElements);
    }

    #[test]
    fn test_generate_many_uses_document_dir() {
        let results = generate_many(&inputs(), true, &NormalizedConfig::default());
        let first = results[0].result.as_ref().unwrap();
        assert_eq!(first[0].path, "src/pages/top-page.scss");
        assert!(results[1].result.is_ok());
        assert_eq!(results[2].result, Err(GenerateError::MultipleRoots(2)));
    }
}
