//! The `Reddit` handle: picks a backend once at construction and runs every query
//! through time-chunked, retried index requests, normalizing what comes back.

use crate::api::{AggBucket, PushshiftClient, RedditApi, RedditClient, SearchIndex};
use crate::chunking::{plan_chunks, TimeChunk};
use crate::config::{Credentials, RetrieverOptions};
use crate::counting::{is_excluded_author, is_user_subreddit, ranked, tally, Tally};
use crate::date::{end_epoch, start_epoch};
use crate::error::RetrieverError;
use crate::forest::flatten_forest;
use crate::logging::init_tracing_once;
use crate::normalize::{normalize_batch, normalize_item, sort_by_created, Record, RecordKind};
use crate::progress::{finish, maybe_count_progress};
use crate::query::{
    clean_submission_id, normalize_author, normalize_subreddit, ContentKind, Entity, HistoryType, Limit, Query,
    SearchParams,
};
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;

/// Fullnames per official `info` request.
const INFO_BATCH: usize = 100;
/// Items requested per sub-range, as a multiple of the target chunk size.
const PER_CHUNK_HEADROOM: u64 = 100;

/// Which backend a handle ended up with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Historical index only.
    Index,
    /// Historical index for search and counts, official API for objects.
    Authenticated,
}

/// Records from one chunked query, plus the sub-ranges that were given up on.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    pub records: Vec<Record>,
    pub abandoned: Vec<TimeChunk>,
    pub estimated: Option<u64>,
}

/// Outcome of an aggregation count.
enum Count {
    Known(u64),
    /// The index answered but had no matching bucket.
    Unknown,
}

pub struct Reddit {
    opts: RetrieverOptions,
    index: Box<dyn SearchIndex>,
    official: Option<Box<dyn RedditApi>>,
}

impl Reddit {
    /// Build the HTTP clients and select a backend.
    /// `use_official` without credentials, or with credentials that fail the
    /// identity check, falls back to the index with a warning.
    pub fn connect(opts: RetrieverOptions, use_official: bool, creds: Option<Credentials>) -> Result<Self> {
        init_tracing_once();
        let index: Box<dyn SearchIndex> = Box::new(PushshiftClient::new(&opts)?);
        let official: Option<Box<dyn RedditApi>> = match (use_official, creds) {
            (true, Some(c)) => Some(Box::new(RedditClient::new(c, &opts)?)),
            (true, None) => {
                tracing::warn!("Reddit API credentials not detected. Defaulting to the historical index.");
                None
            }
            (false, _) => None,
        };
        Ok(Self::select(opts, index, official))
    }

    /// Validate `official` with a single identity check and keep it only if that succeeds.
    pub fn select(opts: RetrieverOptions, index: Box<dyn SearchIndex>, official: Option<Box<dyn RedditApi>>) -> Self {
        let official = official.and_then(|api| match api.me() {
            Ok(name) => {
                tracing::info!("Authenticated to the official API as u/{}", name);
                Some(api)
            }
            Err(e) => {
                tracing::warn!("Reddit API credentials invalid ({:#}). Defaulting to the historical index.", e);
                None
            }
        });
        Self { opts, index, official }
    }

    pub fn unauthenticated(opts: RetrieverOptions, index: Box<dyn SearchIndex>) -> Self {
        Self { opts, index, official: None }
    }

    pub fn backend(&self) -> Backend {
        if self.official.is_some() { Backend::Authenticated } else { Backend::Index }
    }

    pub fn is_authenticated(&self) -> bool {
        self.official.is_some()
    }

    pub fn options(&self) -> &RetrieverOptions {
        &self.opts
    }

    /// The configured default cap (`request_limit`) for callers that do not pick one.
    pub fn default_limit(&self) -> Limit {
        Limit::AtMost(self.opts.request_limit)
    }

    fn official(&self, operation: &'static str) -> Result<&dyn RedditApi, RetrieverError> {
        self.official
            .as_deref()
            .ok_or(RetrieverError::RequiresAuthentication { operation })
    }

    // -------- Chunked query engine --------

    /// Run a query: count, plan sub-ranges, fetch each with retries, normalize,
    /// then order by `created_utc` and apply the limit.
    /// `Ok(None)` means nothing was found (or the count step was abandoned).
    pub fn fetch(&self, query: &Query) -> Result<Option<Batch>> {
        init_tracing_once();
        let what = format!("{} {}s", query.entity.describe(), query.kind.endpoint());
        if query.end <= query.start {
            tracing::debug!("{}: empty time range", what);
            return Ok(None);
        }

        let count = match query.entity.agg_field() {
            Some(field) => match self.count(query, field) {
                Some(c) => Some(c),
                None => {
                    tracing::warn!("{}: count request abandoned; no result", what);
                    return Ok(None);
                }
            },
            None => None,
        };
        let known = match count {
            Some(Count::Known(n)) => Some(n),
            _ => None,
        };

        // Auto without a count step (submission-set comments) fetches everything.
        let cap = match query.limit {
            Limit::Auto if count.is_some() => Some(known.unwrap_or(0) as usize),
            Limit::Auto => None,
            other => other.cap(),
        };
        if cap == Some(0) {
            tracing::info!("{}: nothing to fetch", what);
            return Ok(None);
        }

        let plan = match count {
            Some(_) => plan_chunks(query.start, query.end, known.unwrap_or(1), self.opts.target_chunk_size),
            None => vec![query.chunk()],
        };
        tracing::debug!("{}: estimated {:?} documents over {} sub-range(s)", what, known, plan.len());

        let base = query.search_params();
        let per_request = (self.opts.target_chunk_size.saturating_mul(PER_CHUNK_HEADROOM)) as usize;
        let kind = RecordKind::from(query.kind);
        let pb = maybe_count_progress(self.opts.progress, plan.len() as u64, &what);

        let mut records: Vec<Record> = Vec::new();
        let mut abandoned = Vec::new();
        for chunk in plan {
            if cap.is_some_and(|c| records.len() >= c) {
                break;
            }
            let params = base.clone().window(chunk);
            let label = format!("{} {}", what, chunk);
            match self.opts.retry.run(&label, || self.search_items(&params, Some(per_request))) {
                Some(items) => records.extend(normalize_batch(&items, kind)),
                None => {
                    tracing::warn!("{}: abandoned sub-range {}; its records are missing", what, chunk);
                    abandoned.push(chunk);
                }
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        finish(pb);

        sort_by_created(&mut records);
        if let Some(c) = cap {
            records.truncate(c);
        }
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(Batch { records, abandoned, estimated: known }))
    }

    /// Aggregation-only count for the whole query range. `None` when every attempt failed.
    fn count(&self, query: &Query, field: &str) -> Option<Count> {
        let params = query.search_params().window(query.chunk()).count_on(field);
        let label = format!("count {} {}s", query.entity.describe(), query.kind.endpoint());
        let buckets = self.opts.retry.run(&label, || self.index.aggregate(&params))?;
        Some(match count_from_buckets(&buckets, query.entity.agg_key()) {
            Some(n) => Count::Known(n),
            None => Count::Unknown,
        })
    }

    /// Index search, re-fetched through the official API when authenticated.
    fn search_items(&self, params: &SearchParams, limit: Option<usize>) -> Result<Vec<Value>> {
        let items = self.index.search(params, limit)?;
        match self.official.as_deref() {
            Some(api) => hydrate(api, params.kind(), items),
            None => Ok(items),
        }
    }

    fn fetch_records(&self, query: Query) -> Result<Option<Vec<Record>>> {
        Ok(self.fetch(&query)?.map(|b| b.records))
    }

    // -------- Operations --------

    pub fn retrieve_subreddit_submissions(
        &self,
        subreddit: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Limit,
        cols: Option<&[&str]>,
    ) -> Result<Option<Vec<Record>>> {
        let entity = Entity::Subreddit(normalize_subreddit(subreddit));
        let mut q = Query::new(ContentKind::Submission, entity, start_epoch(start_date)?, end_epoch(end_date)?)
            .with_limit(limit);
        if let Some(cols) = cols {
            q = q.with_filter_columns(cols.iter().copied());
        }
        self.fetch_records(q)
    }

    /// Comments of the given submissions (bare ids, `t3_` fullnames, or URLs).
    /// When authenticated and the index has none, each submission's forest is
    /// fetched from the official API and flattened.
    pub fn retrieve_submission_comments<S: AsRef<str>>(&self, submissions: &[S]) -> Result<Option<Vec<Record>>> {
        let ids: Vec<String> = submissions.iter().map(|s| clean_submission_id(s.as_ref())).collect();
        if ids.is_empty() {
            return Ok(None);
        }
        let q = Query::new(ContentKind::Comment, Entity::SubmissionSet(ids.clone()), 0, end_epoch(None)?);
        if let Some(records) = self.fetch_records(q)? {
            return Ok(Some(records));
        }

        let Some(api) = self.official.as_deref() else { return Ok(None) };
        let mut records = Vec::new();
        for id in &ids {
            let label = format!("comment forest for t3_{}", id);
            if let Some(forest) = self.opts.retry.run(&label, || api.comment_forest(id)) {
                let flat = flatten_forest(forest);
                records.extend(normalize_batch(&flat, RecordKind::Comment));
            }
        }
        sort_by_created(&mut records);
        Ok(if records.is_empty() { None } else { Some(records) })
    }

    pub fn retrieve_author_submissions(
        &self,
        author: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Limit,
    ) -> Result<Option<Vec<Record>>> {
        self.author_query(ContentKind::Submission, author, start_date, end_date, limit)
    }

    pub fn retrieve_author_comments(
        &self,
        author: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Limit,
    ) -> Result<Option<Vec<Record>>> {
        self.author_query(ContentKind::Comment, author, start_date, end_date, limit)
    }

    fn author_query(
        &self,
        kind: ContentKind,
        author: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Limit,
    ) -> Result<Option<Vec<Record>>> {
        let entity = Entity::Author(normalize_author(author));
        let q = Query::new(kind, entity, start_epoch(start_date)?, end_epoch(end_date)?).with_limit(limit);
        self.fetch_records(q)
    }

    /// Submissions whose title contains `query` as a phrase.
    pub fn search_for_submissions(
        &self,
        query: &str,
        subreddit: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Limit,
    ) -> Result<Option<Vec<Record>>> {
        self.text_query(ContentKind::Submission, query, subreddit, start_date, end_date, limit)
    }

    /// Comments whose body matches `query`.
    pub fn search_for_comments(
        &self,
        query: &str,
        subreddit: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Limit,
    ) -> Result<Option<Vec<Record>>> {
        self.text_query(ContentKind::Comment, query, subreddit, start_date, end_date, limit)
    }

    fn text_query(
        &self,
        kind: ContentKind,
        query: &str,
        subreddit: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Limit,
    ) -> Result<Option<Vec<Record>>> {
        let entity = Entity::FreeText { query: query.to_string(), subreddit: subreddit.map(normalize_subreddit) };
        let q = Query::new(kind, entity, start_epoch(start_date)?, end_epoch(end_date)?).with_limit(limit);
        self.fetch_records(q)
    }

    /// Subreddit `about` data over the metadata allow-list. Authenticated only.
    pub fn retrieve_subreddit_metadata(&self, subreddit: &str) -> Result<Option<Record>> {
        let api = self.official("retrieve_subreddit_metadata")?;
        let name = normalize_subreddit(subreddit);
        let label = format!("metadata for r/{}", name);
        Ok(self
            .opts
            .retry
            .run(&label, || api.subreddit_about(&name))
            .map(|about| normalize_item(&about, RecordKind::SubredditMetadata)))
    }

    /// Submission counts per subreddit, sampled in `search_freq_minutes` windows
    /// from the raw endpoint. User-profile subreddits are dropped.
    pub fn identify_active_subreddits(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
        search_freq_minutes: u32,
    ) -> Result<Vec<(String, u64)>> {
        init_tracing_once();
        let start = start_epoch(start_date)?;
        let end = end_epoch(end_date)?;
        let step = i64::from(search_freq_minutes.max(1)) * 60;

        let mut windows = Vec::new();
        let mut lo = start;
        while lo < end {
            let hi = (lo + step).min(end);
            windows.push(TimeChunk::new(lo, hi));
            lo = hi;
        }

        let pb = maybe_count_progress(self.opts.progress, windows.len() as u64, "Active subreddits");
        let mut counts = Tally::new();
        for w in windows {
            let label = format!("subreddit activity {}", w);
            match self.opts.retry.run(&label, || self.index.subreddit_activity(w.after(), w.before())) {
                Some(names) => tally(&mut counts, names),
                None => tracing::warn!("abandoned activity window {}", w),
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        finish(pb);

        counts.retain(|name, _| !is_user_subreddit(name));
        Ok(ranked(counts))
    }

    /// Per-author post counts in a subreddit, excluding deleted/removed authors and
    /// names ending in "bot". `history_type` is `"comment"` or `"submission"`.
    pub fn retrieve_subreddit_user_history(
        &self,
        subreddit: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        history_type: &str,
        docs_per_chunk: u64,
    ) -> Result<Option<Vec<(String, u64)>>> {
        init_tracing_once();
        let history: HistoryType = history_type.parse()?;
        let sub = normalize_subreddit(subreddit);
        let q = Query::new(history.kind(), Entity::Subreddit(sub.clone()), start_epoch(start_date)?, end_epoch(end_date)?);

        let Some(count) = self.count(&q, "subreddit") else {
            tracing::warn!("r/{}: count request abandoned; no result", sub);
            return Ok(None);
        };
        let doc_count = match count {
            Count::Known(n) => n,
            Count::Unknown => return Ok(None),
        };

        let plan = plan_chunks(q.start, q.end, doc_count, docs_per_chunk);
        let mut base = q.search_params();
        base.filter = Some(vec!["author".to_string()]);
        let label = format!("r/{} {} authors", sub, history.kind().endpoint());
        let pb = maybe_count_progress(self.opts.progress, plan.len() as u64, &label);

        let mut authors = Tally::new();
        for chunk in plan {
            let params = base.clone().window(chunk);
            let chunk_label = format!("{} {}", label, chunk);
            match self.opts.retry.run(&chunk_label, || self.index.search(&params, None)) {
                Some(items) => tally(
                    &mut authors,
                    items
                        .iter()
                        .filter_map(|i| i.get("author").and_then(Value::as_str))
                        .filter(|a| !is_excluded_author(a)),
                ),
                None => tracing::warn!("{}: abandoned sub-range {}", label, chunk),
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        finish(pb);
        Ok(Some(ranked(authors)))
    }
}

/// Sum of buckets whose key matches `key` (case-insensitive), or of all buckets
/// when there is no key. `None` when nothing matched.
pub fn count_from_buckets(buckets: &[AggBucket], key: Option<&str>) -> Option<u64> {
    let mut matched = buckets
        .iter()
        .filter(|b| key.map_or(true, |k| b.key.eq_ignore_ascii_case(k)))
        .peekable();
    matched.peek()?;
    Some(matched.map(|b| b.doc_count).sum())
}

/// Replace index items with the official objects, keeping index order and
/// dropping ids the official API does not know.
fn hydrate(api: &dyn RedditApi, kind: ContentKind, items: Vec<Value>) -> Result<Vec<Value>> {
    let prefix = kind.fullname_prefix();
    let ids: Vec<String> = items
        .iter()
        .filter_map(|i| i.get("id").and_then(Value::as_str).map(str::to_string))
        .collect();

    let mut by_id: HashMap<String, Value> = HashMap::with_capacity(ids.len());
    for batch in ids.chunks(INFO_BATCH) {
        let fullnames: Vec<String> = batch.iter().map(|id| format!("{}{}", prefix, id)).collect();
        for obj in api.info(&fullnames)? {
            if let Some(id) = obj.get("id").and_then(Value::as_str) {
                by_id.insert(id.to_string(), obj.clone());
            }
        }
    }
    Ok(ids.into_iter().filter_map(|id| by_id.remove(&id)).collect())
}
