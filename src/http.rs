use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::{index::WordIndex, models::WordResponse};

/// Completions returned per lookup unless configured otherwise.
pub const DEFAULT_SERVER_COMPLETIONS: usize = 25;

/// Shared state for the development index server.
pub struct Ctx {
    pub index: WordIndex,
    pub max_completions: usize,
}

#[derive(Debug, serde::Deserialize, Default)]
pub struct WordQuery {
    #[serde(default)]
    pub word: String,
}

/// Initialize HTTP routes.
pub fn init_handlers(ctx: Arc<Ctx>) -> Router {
    Router::new()
        .route("/api/word", get(get_word))
        .with_state(ctx)
}

/// Look up a word: exact match, containing wikis and prefix completions.
async fn get_word(State(ctx): State<Arc<Ctx>>, Query(q): Query<WordQuery>) -> Json<WordResponse> {
    Json(ctx.index.lookup(&q.word, ctx.max_completions))
}
