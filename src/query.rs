//! Query description (what to fetch) and the index search parameters built from it,
//! plus small normalization helpers for subreddit/author/submission identifiers.

use crate::chunking::TimeChunk;

/// Which index collection a query targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Submission,
    Comment,
}

impl ContentKind {
    /// Path segment on the search index (`/search/<segment>/`).
    pub fn endpoint(&self) -> &'static str {
        match self {
            ContentKind::Submission => "submission",
            ContentKind::Comment => "comment",
        }
    }

    /// Fullname prefix on the official API.
    pub fn fullname_prefix(&self) -> &'static str {
        match self {
            ContentKind::Submission => "t3_",
            ContentKind::Comment => "t1_",
        }
    }
}

/// Target of a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Subreddit(String),
    Author(String),
    /// Bare submission ids (no `t3_` prefix).
    SubmissionSet(Vec<String>),
    FreeText { query: String, subreddit: Option<String> },
}

impl Entity {
    /// Field the index aggregates on to estimate a document count.
    /// `None` means the entity is not time-chunked (no count request).
    pub fn agg_field(&self) -> Option<&'static str> {
        match self {
            Entity::Subreddit(_) => Some("subreddit"),
            Entity::Author(_) => Some("author"),
            Entity::FreeText { .. } => Some("subreddit"),
            Entity::SubmissionSet(_) => None,
        }
    }

    /// Aggregation bucket key that belongs to this entity, if it names one.
    /// Authors sum every bucket: the query already filters on the author.
    pub fn agg_key(&self) -> Option<&str> {
        match self {
            Entity::Subreddit(s) => Some(s),
            Entity::Author(_) => None,
            Entity::FreeText { subreddit, .. } => subreddit.as_deref(),
            Entity::SubmissionSet(_) => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Entity::Subreddit(s) => format!("r/{}", s),
            Entity::Author(a) => format!("u/{}", a),
            Entity::SubmissionSet(ids) => format!("{} submission(s)", ids.len()),
            Entity::FreeText { query, subreddit: Some(s) } => format!("{:?} in r/{}", query, s),
            Entity::FreeText { query, subreddit: None } => format!("{:?}", query),
        }
    }
}

/// Result cap for a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    Unlimited,
    AtMost(usize),
    /// Look up the total count first (aggregation request) and use it as the cap.
    Auto,
}

impl Limit {
    pub fn cap(&self) -> Option<usize> {
        match self {
            Limit::AtMost(n) => Some(*n),
            Limit::Unlimited | Limit::Auto => None,
        }
    }
}

/// One logical fetch. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub kind: ContentKind,
    pub entity: Entity,
    pub start: i64,
    pub end: i64,
    pub limit: Limit,
    pub filter_columns: Option<Vec<String>>,
}

impl Query {
    pub fn new(kind: ContentKind, entity: Entity, start: i64, end: i64) -> Self {
        Self { kind, entity, start, end, limit: Limit::Unlimited, filter_columns: None }
    }

    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter_columns<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_columns = Some(cols.into_iter().map(Into::into).collect());
        self
    }

    pub fn chunk(&self) -> TimeChunk {
        TimeChunk::new(self.start, self.end)
    }

    /// Base index parameters for this query (no time window, size, or aggregation).
    pub fn search_params(&self) -> SearchParams {
        let mut p = SearchParams::new(self.kind);
        match &self.entity {
            Entity::Subreddit(s) => p.subreddit = Some(s.clone()),
            Entity::Author(a) => p.author = Some(a.clone()),
            Entity::SubmissionSet(ids) => {
                p.link_ids = ids.iter().map(|id| format!("t3_{}", id)).collect();
            }
            Entity::FreeText { query, subreddit } => {
                p.subreddit = subreddit.clone();
                match self.kind {
                    ContentKind::Submission => p.title = Some(format!("\"{}\"", query)),
                    ContentKind::Comment => p.q = Some(query.clone()),
                }
            }
        }
        p.filter = self.filter_columns.clone();
        p
    }
}

/// Parameters of one index search request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub kind: Option<ContentKind>,
    pub after: Option<i64>,
    pub before: Option<i64>,
    pub subreddit: Option<String>,
    pub author: Option<String>,
    pub link_ids: Vec<String>,
    pub title: Option<String>,
    pub q: Option<String>,
    pub filter: Option<Vec<String>>,
    pub aggs: Option<String>,
    pub size: Option<usize>,
}

impl SearchParams {
    pub fn new(kind: ContentKind) -> Self {
        Self { kind: Some(kind), ..Default::default() }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind.unwrap_or(ContentKind::Submission)
    }

    /// Restrict to a half-open window.
    pub fn window(mut self, chunk: TimeChunk) -> Self {
        self.after = Some(chunk.after());
        self.before = Some(chunk.before());
        self
    }

    /// Aggregation-only request: no rows, just bucket counts on `field`.
    pub fn count_on(mut self, field: &str) -> Self {
        self.aggs = Some(field.to_string());
        self.size = Some(0);
        self.filter = Some(vec!["id".to_string()]);
        self
    }

    /// Query-string pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        let mut push = |k: &str, v: String| out.push((k.to_string(), v));
        if let Some(a) = self.after { push("after", a.to_string()); }
        if let Some(b) = self.before { push("before", b.to_string()); }
        if let Some(s) = &self.subreddit { push("subreddit", s.clone()); }
        if let Some(a) = &self.author { push("author", a.clone()); }
        if !self.link_ids.is_empty() { push("link_id", self.link_ids.join(",")); }
        if let Some(t) = &self.title { push("title", t.clone()); }
        if let Some(q) = &self.q { push("q", q.clone()); }
        if let Some(f) = &self.filter { push("filter", f.join(",")); }
        if let Some(a) = &self.aggs { push("aggs", a.clone()); }
        if let Some(s) = self.size { push("size", s.to_string()); }
        out
    }
}

// ----------------------------- Normalization ------------------------------------

/// Trim and drop an `r/` or `/r/` prefix.
pub fn normalize_subreddit(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_prefix('/').unwrap_or(s);
    let s = s.strip_prefix("r/").or_else(|| s.strip_prefix("R/")).unwrap_or(s);
    s.trim_end_matches('/').to_string()
}

/// Trim and drop a `u/` or `/u/` prefix.
pub fn normalize_author(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_prefix('/').unwrap_or(s);
    let s = s.strip_prefix("u/").or_else(|| s.strip_prefix("U/")).unwrap_or(s);
    s.trim_end_matches('/').to_string()
}

/// Accept a bare id, a `t3_` fullname, or a Reddit URL containing `comments/<id>/`.
pub fn clean_submission_id(s: &str) -> String {
    let mut s = s.trim();
    if s.contains("https") || s.contains("reddit") {
        if let Some(rest) = s.split("comments/").nth(1) {
            s = rest.split('/').next().unwrap_or(rest);
        }
    }
    s.strip_prefix("t3_").unwrap_or(s).to_string()
}

/// Which per-author history to tally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryType {
    Comment,
    Submission,
}

impl HistoryType {
    pub fn kind(&self) -> ContentKind {
        match self {
            HistoryType::Comment => ContentKind::Comment,
            HistoryType::Submission => ContentKind::Submission,
        }
    }
}

impl std::str::FromStr for HistoryType {
    type Err = crate::error::RetrieverError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comment" => Ok(HistoryType::Comment),
            "submission" => Ok(HistoryType::Submission),
            other => Err(crate::error::RetrieverError::InvalidHistoryType(other.to_string())),
        }
    }
}
