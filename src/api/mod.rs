//! Backend capabilities. The historical search index is always present; the official
//! API is optional and only reachable with valid credentials. Both are traits so the
//! `Reddit` handle can be driven by in-memory fakes.

mod official;
mod pushshift;

pub use official::RedditClient;
pub use pushshift::{page_backwards, PushshiftClient};

use crate::forest::CommentNode;
use crate::query::SearchParams;
use anyhow::Result;
use serde_json::Value;

/// One aggregation bucket (`{"key": ..., "doc_count": ...}`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggBucket {
    pub key: String,
    pub doc_count: u64,
}

/// Historical search/aggregation index (unauthenticated).
pub trait SearchIndex {
    /// All items matching `params`, newest first, at most `limit` of them.
    fn search(&self, params: &SearchParams, limit: Option<usize>) -> Result<Vec<Value>>;

    /// Aggregation-only request on `params.aggs`; no rows.
    fn aggregate(&self, params: &SearchParams) -> Result<Vec<AggBucket>>;

    /// Subreddit names of the submissions created in `(after, before)` (raw endpoint).
    fn subreddit_activity(&self, after: i64, before: i64) -> Result<Vec<String>>;
}

/// Official, authenticated Reddit API.
pub trait RedditApi {
    /// Identity check; returns the authenticated username.
    fn me(&self) -> Result<String>;

    /// Current objects for the given fullnames (`t3_..`, `t1_..`). Unknown ids are omitted.
    fn info(&self, fullnames: &[String]) -> Result<Vec<Value>>;

    /// The comment forest of a submission, as returned (placeholders included).
    fn comment_forest(&self, submission_id: &str) -> Result<Vec<CommentNode>>;

    /// The `about` object of a subreddit.
    fn subreddit_about(&self, name: &str) -> Result<Value>;
}
