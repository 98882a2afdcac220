use serde::Serialize;

use crate::models::{CapPolicy, CompletionEntry, ResultModel, Settings};

/// A single actionable result link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub label: String,
    pub index: String,
    pub href: String,
}

/// Exact-match signal shown on the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Exists,
    Missing,
}

/// A flattened, capped result set for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedList {
    pub input: InputState,
    pub entries: Vec<Entry>,
    pub status: Option<String>,
}

/// Flattens index responses into the ordered list the result surface shows.
#[derive(Debug, Clone)]
pub struct ResultRenderer {
    max_completions: usize,
    exact_cap: CapPolicy,
    wiki_url: String,
}

impl ResultRenderer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            max_completions: settings.max_completions,
            exact_cap: settings.exact_cap,
            wiki_url: settings.wiki_url.clone(),
        }
    }

    /// Build the list for `word`. Exact matches come first, then completions
    /// in the order the index delivered them, one entry per (word, index)
    /// pair, stopping as soon as the cap is reached.
    pub fn render(&self, word: &str, model: &ResultModel) -> RenderedList {
        let max = self.max_completions;
        let mut entries = Vec::new();

        if model.exists {
            for index in &model.indexes {
                if entries.len() >= max {
                    break;
                }
                entries.push(self.entry(word, index));
            }
        }

        let mut used = match self.exact_cap {
            CapPolicy::Each => entries.len(),
            CapPolicy::Once => usize::from(!entries.is_empty()),
        };

        let completions: &[CompletionEntry] = match &model.completions {
            Some(c) if !word.is_empty() => c.as_slice(),
            _ => &[],
        };

        'completions: for c in completions {
            for index in &c.indexes {
                if used >= max {
                    break 'completions;
                }
                entries.push(self.entry(&c.word, index));
                used += 1;
            }
        }

        let status = model.stats.as_ref().map(|s| {
            format!(
                "{} titles, {} letters, {} nodes in {}",
                s.titles, s.letters, s.nodes, s.elapsed
            )
        });

        RenderedList {
            input: if model.exists {
                InputState::Exists
            } else {
                InputState::Missing
            },
            entries,
            status,
        }
    }

    /// Target URL for `word` in the wiki `index`.
    pub fn link(&self, index: &str, word: &str) -> String {
        self.wiki_url
            .replace("{index}", &urlencoding::encode(index))
            .replace("{word}", &urlencoding::encode(word))
    }

    fn entry(&self, word: &str, index: &str) -> Entry {
        Entry {
            label: word.to_string(),
            index: index.to_string(),
            href: self.link(index, word),
        }
    }
}
