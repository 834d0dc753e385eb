//! `{{ .Key }}` placeholder expansion for asset names, URLs and post commands.

use crate::error::{RelsyncError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE
        .get_or_init(|| Regex::new(r"\{\{\s*\.?([A-Za-z][A-Za-z0-9_]*)\s*\}\}").unwrap())
}

/// Values available to templates, keyed by placeholder name.
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    values: BTreeMap<&'static str, String>,
}

impl TemplateData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Expand every placeholder in `template`. Unknown keys are an error.
pub fn render(template: &str, data: &TemplateData) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in placeholder_re().captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let key = &caps[1];
        let value = data.get(key).ok_or_else(|| RelsyncError::Template {
            template: template.to_string(),
            reason: format!("unknown key '{key}'"),
        })?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}
