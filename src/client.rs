use std::{future::Future, sync::Arc, time::Duration};

use tokio::sync::mpsc;

use crate::models::{ResultModel, WordResponse};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("index returned HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// A word index that can be asked about one word at a time.
pub trait Backend: Send + Sync + 'static {
    fn lookup(&self, word: &str) -> impl Future<Output = Result<ResultModel, QueryError>> + Send;
}

/// Word index reached over HTTP: `GET {endpoint}?word=...` returning JSON.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpBackend {
    pub fn new(endpoint: reqwest::Url) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("wikisearch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

impl Backend for HttpBackend {
    async fn lookup(&self, word: &str) -> Result<ResultModel, QueryError> {
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(&[("word", word)])
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let r: WordResponse =
            serde_json::from_slice(&body).map_err(|e| QueryError::Malformed(e.to_string()))?;
        Ok(r.into())
    }
}

/// The outcome of one dispatched query.
#[derive(Debug)]
pub struct Reply {
    pub seq: u64,
    pub word: String,
    pub result: Result<ResultModel, QueryError>,
}

/// Dispatches lookups as independent tasks and decides which replies are
/// still current. Every query gets a sequence number; only the reply carrying
/// the latest one is ever accepted. Superseded requests run to completion and
/// their replies are dropped.
pub struct QueryClient<B> {
    backend: Arc<B>,
    timeout: Duration,
    seq: u64,
    dispatched: u64,
    // The latest query is dispatched and its reply not yet accepted.
    awaiting: bool,
    tx: mpsc::UnboundedSender<Reply>,
    rx: mpsc::UnboundedReceiver<Reply>,
}

impl<B: Backend> QueryClient<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend: Arc::new(backend),
            timeout,
            seq: 0,
            dispatched: 0,
            awaiting: false,
            tx,
            rx,
        }
    }

    /// Start a lookup for `word` and return its sequence number. Must be
    /// called from within a tokio runtime.
    pub fn query(&mut self, word: &str) -> u64 {
        self.seq += 1;
        self.dispatched += 1;
        self.awaiting = true;

        let seq = self.seq;
        let word = word.to_string();
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let timeout = self.timeout;

        log::debug!("query #{}: '{}'", seq, word);

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, backend.lookup(&word)).await {
                Ok(r) => r,
                Err(_) => Err(QueryError::Timeout(timeout)),
            };

            // The receiver only goes away with the client itself.
            let _ = tx.send(Reply { seq, word, result });
        });

        seq
    }

    /// Make every in-flight query stale without dispatching a new one.
    pub fn supersede(&mut self) {
        self.seq += 1;
        self.awaiting = false;
    }

    /// Whether the latest query is still waiting for its reply.
    pub fn awaiting(&self) -> bool {
        self.awaiting
    }

    /// Number of requests sent so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Pass the reply through if it is current, drop it otherwise.
    pub fn accept(&mut self, reply: Reply) -> Option<Reply> {
        if reply.seq == self.seq {
            self.awaiting = false;
            return Some(reply);
        }

        log::debug!(
            "dropping stale reply #{} for '{}' (latest #{})",
            reply.seq,
            reply.word,
            self.seq
        );
        None
    }

    /// Wait for the next reply, current or not.
    pub async fn next_reply(&mut self) -> Option<Reply> {
        self.rx.recv().await
    }
}
