mod config;

pub use config::{
    CapPolicy, Config, Settings, DEFAULT_ENDPOINT, DEFAULT_EXISTS_COLOR, DEFAULT_MAX_COMPLETIONS,
    DEFAULT_NOT_EXISTS_COLOR, DEFAULT_TIMEOUT_MS, DEFAULT_WIKI_URL,
};

use serde::{Deserialize, Serialize};

/// Raw `/api/word` response body, as sent by the index service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordResponse {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikis: Option<Vec<String>>,
    #[serde(default)]
    pub completions: Option<Vec<Completion>>,

    // Index statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titles: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letters: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// A completion as it appears on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    pub word: String,
    #[serde(default)]
    pub wikis: Option<Vec<String>>,
}

/// One completed query, ready to be rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultModel {
    pub exists: bool,
    /// Sub-indexes containing the exact word. Empty unless `exists`.
    pub indexes: Vec<String>,
    pub completions: Option<Vec<CompletionEntry>>,
    pub stats: Option<IndexStats>,
}

/// A candidate word sharing the typed prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionEntry {
    pub word: String,
    pub indexes: Vec<String>,
}

/// Informational counters computed by the index service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStats {
    pub titles: u64,
    pub letters: u64,
    pub nodes: u64,
    pub elapsed: String,
}

impl From<WordResponse> for ResultModel {
    fn from(r: WordResponse) -> Self {
        let indexes = if r.exists {
            r.wikis.unwrap_or_default()
        } else {
            Vec::new()
        };

        let completions = r.completions.map(|list| {
            list.into_iter()
                .map(|c| CompletionEntry {
                    word: c.word,
                    indexes: c.wikis.unwrap_or_default(),
                })
                .collect()
        });

        // Stats are only meaningful when all the counters are present.
        let stats = match (r.titles, r.letters, r.nodes) {
            (Some(titles), Some(letters), Some(nodes)) => Some(IndexStats {
                titles,
                letters,
                nodes,
                elapsed: r.time.unwrap_or_default(),
            }),
            _ => None,
        };

        Self {
            exists: r.exists,
            indexes,
            completions,
            stats,
        }
    }
}
