use std::sync::Arc;

use crate::prompt::catalog::{PromptCatalog, PromptEntry, ResolvedTag};
use crate::prompt::scanner::{self, ScanResult};

// Suggestions open once the trailing partial has at least this many characters.
const MIN_PARTIAL_LEN: usize = 2;

/// What one text edit did to the tracked state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditOutcome {
    /// Ids newly added to the tracked set, in order of appearance.
    pub added: Vec<String>,
    /// Complete-looking markers with no catalog entry. Never tracked.
    pub invalid: Vec<String>,
    pub suggestions_open: bool,
}

/// Prompt editing session: the raw text, the tracked tag set derived from
/// it, and the suggestion list for the trailing partial. The text is the
/// single source of truth; the tracked set always equals the valid complete
/// tags currently present in it.
pub struct PromptInput {
    catalog: Arc<dyn PromptCatalog>,
    user: String,
    text: String,
    tags: Vec<String>,
    suggestions: Vec<PromptEntry>,
}

impl PromptInput {
    pub fn new(catalog: Arc<dyn PromptCatalog>, user: impl Into<String>) -> Self {
        Self {
            catalog,
            user: user.into(),
            text: String::new(),
            tags: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Session seeded from existing text, tracking the valid tags it
    /// already contains.
    pub fn from_text(
        catalog: Arc<dyn PromptCatalog>,
        user: impl Into<String>,
        text: &str,
    ) -> Self {
        let mut input = Self::new(catalog, user);
        input.set_text(text);
        input
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn suggestions(&self) -> &[PromptEntry] {
        &self.suggestions
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Each tracked tag with its user-facing resolution.
    pub fn resolved_tags(&self) -> Vec<(String, ResolvedTag)> {
        self.tags
            .iter()
            .map(|id| (id.clone(), self.catalog.resolve(id, &self.user)))
            .collect()
    }

    /// Replace the text wholesale and re-derive tracked tags and
    /// suggestions from it.
    pub fn set_text(&mut self, new_text: &str) -> EditOutcome {
        self.text = new_text.to_string();
        let ScanResult { complete, partial } = scanner::scan(&self.text);

        let mut outcome = EditOutcome::default();
        let mut present: Vec<String> = Vec::new();
        for token in &complete {
            if self.catalog.lookup(&token.id).is_some() {
                if !present.contains(&token.id) {
                    present.push(token.id.clone());
                }
            } else if !outcome.invalid.contains(&token.id) {
                outcome.invalid.push(token.id.clone());
            }
        }

        outcome.added = present
            .iter()
            .filter(|id| !self.tags.contains(id))
            .cloned()
            .collect();
        self.tags = present;

        self.suggestions = match partial {
            Some(ref p) if p.len() >= MIN_PARTIAL_LEN => self
                .catalog
                .accessible(&self.user)
                .into_iter()
                .filter(|entry| entry.id.starts_with(p.as_str()) && !self.tags.contains(&entry.id))
                .collect(),
            _ => Vec::new(),
        };
        outcome.suggestions_open = !self.suggestions.is_empty();
        outcome
    }

    /// Accept a suggested entry: the trailing partial marker is replaced by
    /// the complete tag plus one space, and the id joins the tracked set.
    /// Returns the new cursor position (end of text).
    pub fn accept_suggestion(&mut self, entry: &PromptEntry) -> usize {
        let replaced = match trailing_marker_start(&self.text) {
            Some(start) => {
                let mut text = self.text[..start].to_string();
                text.push_str(&format!("##{} ", entry.id));
                text
            }
            None => {
                let mut text = self.text.clone();
                if !text.is_empty() && !text.ends_with(char::is_whitespace) {
                    text.push(' ');
                }
                text.push_str(&format!("##{} ", entry.id));
                text
            }
        };

        self.text = replaced;
        if !self.tags.contains(&entry.id) {
            self.tags.push(entry.id.clone());
        }
        self.suggestions.clear();
        self.text.len()
    }

    /// Drop a tag: it leaves the tracked set and every complete occurrence
    /// of its marker (plus the whitespace run after it) leaves the text.
    pub fn remove_tag(&mut self, id: &str) {
        self.tags.retain(|t| t != id);

        let needle = format!("##{id}");
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        while let Some(pos) = rest.find(&needle) {
            let after = pos + needle.len();
            let at_boundary = rest[after..]
                .chars()
                .next()
                .map_or(true, |c| c.is_whitespace());
            if at_boundary {
                out.push_str(&rest[..pos]);
                let trailing_ws = rest[after..].len() - rest[after..].trim_start().len();
                rest = &rest[after + trailing_ws..];
            } else {
                out.push_str(&rest[..after]);
                rest = &rest[after..];
            }
        }
        out.push_str(rest);
        self.text = out.trim().to_string();
    }

    pub fn dismiss_suggestions(&mut self) {
        self.suggestions.clear();
    }
}

// Byte offset of the ## opening the trailing marker, complete or not: the
// last ## whose word run extends to the end of input.
fn trailing_marker_start(text: &str) -> Option<usize> {
    let start = text.rfind("##")?;
    let rest = &text[start + 2..];
    rest.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        .then_some(start)
}
