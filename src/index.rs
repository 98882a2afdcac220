use std::{
    collections::BTreeMap,
    io::{BufRead, BufReader},
    path::Path,
    time::Instant,
};

use trie_rs::map::{Trie, TrieBuilder};

use crate::models::{Completion, WordResponse};

/// Number of wikis that fit in the membership mask.
pub const MAX_WIKIS: usize = u64::BITS as usize;

/// Log progress every this many titles while loading.
const LOAD_LOG_INTERVAL: u64 = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("too many wikis: {0} (max {MAX_WIKIS})")]
    TooManyWikis(usize),
    #[error("duplicate wiki: {0}")]
    DuplicateWiki(String),
}

/// Accumulates titles per wiki before the trie is frozen.
#[derive(Default)]
pub struct IndexBuilder {
    wikis: Vec<String>,
    words: BTreeMap<String, u64>,
    titles: u64,
    letters: u64,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wiki and get the bit that marks its titles.
    pub fn add_wiki(&mut self, wiki: &str) -> Result<u64, IndexError> {
        if self.wikis.iter().any(|w| w == wiki) {
            return Err(IndexError::DuplicateWiki(wiki.to_string()));
        }
        if self.wikis.len() == MAX_WIKIS {
            return Err(IndexError::TooManyWikis(self.wikis.len() + 1));
        }
        self.wikis.push(wiki.to_string());
        Ok(1 << (self.wikis.len() - 1))
    }

    /// Add a title under the given wiki mask.
    pub fn add(&mut self, title: &str, mask: u64) {
        if title.is_empty() {
            return;
        }

        self.titles += 1;
        self.letters += title.len() as u64;
        *self.words.entry(title.to_string()).or_insert(0) |= mask;

        if self.titles % LOAD_LOG_INTERVAL == 0 {
            log::info!("loaded {} titles", self.titles);
        }
    }

    /// Load titles from a reader. Lines are either plain titles or
    /// `offset:id:title` lines from a multistream dump index.
    pub fn load(&mut self, wiki: &str, r: impl BufRead) -> Result<u64, IndexError> {
        let mask = self.add_wiki(wiki)?;

        let mut n = 0;
        for line in r.lines() {
            let line = line?;
            self.add(parse_title(&line), mask);
            n += 1;
        }

        log::info!("finished loading {} records from {}", n, wiki);
        Ok(n)
    }

    /// Load titles for `wiki` from a file. Multistream dump indexes are read
    /// as they are published (`.bz2`); `.gz` and plain text also work.
    pub fn load_file(&mut self, wiki: &str, path: &Path) -> Result<u64, IndexError> {
        log::info!("loading {} from {}", wiki, path.display());
        let f = BufReader::new(std::fs::File::open(path)?);

        match path.extension().and_then(|e| e.to_str()) {
            Some("bz2") => {
                let decoder = bzip2::read::MultiBzDecoder::new(f);
                self.load(wiki, BufReader::new(decoder))
            }
            Some("gz") => {
                let decoder = flate2::read::MultiGzDecoder::new(f);
                self.load(wiki, BufReader::new(decoder))
            }
            _ => self.load(wiki, f),
        }
    }

    pub fn build(self) -> WordIndex {
        let mut b: TrieBuilder<u8, u64> = TrieBuilder::new();
        let mut nodes = 0u64;
        let mut prev: &str = "";

        // Keys are sorted, so each one adds a node per byte beyond the prefix
        // it shares with the previous key.
        for (word, mask) in &self.words {
            let shared = prev
                .bytes()
                .zip(word.bytes())
                .take_while(|(a, b)| a == b)
                .count();
            nodes += (word.len() - shared) as u64;
            prev = word;

            b.push(word, *mask);
        }

        log::info!(
            "index ready: {} titles, {} letters, {} nodes",
            self.titles,
            self.letters,
            nodes
        );

        WordIndex {
            trie: b.build(),
            wikis: self.wikis,
            titles: self.titles,
            letters: self.letters,
            nodes,
        }
    }
}

/// Pull the title out of an index line.
fn parse_title(line: &str) -> &str {
    let mut parts = line.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(offset), Some(id), Some(title))
            if offset.parse::<u64>().is_ok() && id.parse::<u64>().is_ok() =>
        {
            title
        }
        _ => line,
    }
}

/// In-memory trie of titles, each tagged with the wikis that contain it.
pub struct WordIndex {
    trie: Trie<u8, u64>,
    wikis: Vec<String>,
    titles: u64,
    letters: u64,
    nodes: u64,
}

impl WordIndex {
    /// Wiki names whose bit is set in `mask`, in registration order.
    fn wikis_of(&self, mask: u64) -> Vec<String> {
        self.wikis
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, w)| w.clone())
            .collect()
    }

    /// Answer an `/api/word` lookup: whether `word` is a title, the wikis
    /// holding it, and up to `num` other titles starting with it.
    pub fn lookup(&self, word: &str, num: usize) -> WordResponse {
        let start = Instant::now();

        let exact = self.trie.exact_match(word).copied();

        let completions = if word.is_empty() {
            None
        } else {
            let list: Vec<Completion> = self
                .trie
                .predictive_search(word)
                .filter(|(w, _): &(String, &u64)| w != word)
                .take(num)
                .map(|(w, mask)| Completion {
                    wikis: Some(self.wikis_of(*mask)),
                    word: w,
                })
                .collect();
            Some(list)
        };

        WordResponse {
            exists: exact.is_some(),
            wikis: exact.map(|mask| self.wikis_of(mask)),
            completions,
            titles: Some(self.titles),
            letters: Some(self.letters),
            nodes: Some(self.nodes),
            time: Some(format!("{:?}", start.elapsed())),
        }
    }
}
