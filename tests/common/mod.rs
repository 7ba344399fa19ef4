#![allow(dead_code)]

use anyhow::{anyhow, Result};
use retriever::api::{AggBucket, RedditApi, SearchIndex};
use retriever::{CommentNode, ContentKind, Reddit, RetrieverOptions, RetryPolicy, SearchParams};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// Call counters shared between a fake backend and the test that owns it.
#[derive(Default, Debug)]
pub struct Calls {
    pub search: Cell<usize>,
    pub aggregate: Cell<usize>,
    pub activity: Cell<usize>,
    pub me: Cell<usize>,
    pub info: Cell<usize>,
    pub forest: Cell<usize>,
    pub about: Cell<usize>,
    /// `(after, before)` of every search request, in order.
    pub windows: RefCell<Vec<(i64, i64)>>,
}

impl Calls {
    pub fn network(&self) -> usize {
        self.search.get()
            + self.aggregate.get()
            + self.activity.get()
            + self.me.get()
            + self.info.get()
            + self.forest.get()
            + self.about.get()
    }
}

fn bump(c: &Cell<usize>) {
    c.set(c.get() + 1);
}

fn str_field<'a>(v: &'a Value, k: &str) -> Option<&'a str> {
    v.get(k).and_then(Value::as_str)
}

/// In-memory historical index over a fixed set of submissions and comments.
#[derive(Default)]
pub struct FakeIndex {
    pub submissions: Vec<Value>,
    pub comments: Vec<Value>,
    pub calls: Rc<Calls>,
    /// Every aggregation request fails.
    pub fail_aggregate: bool,
    /// Search requests whose `after` equals one of these always fail.
    pub fail_after: Vec<i64>,
    /// The first N search requests fail, later ones succeed.
    pub flaky_searches: Cell<usize>,
}

impl FakeIndex {
    pub fn new(submissions: Vec<Value>, comments: Vec<Value>) -> Self {
        Self { submissions, comments, ..Default::default() }
    }

    fn items(&self, kind: ContentKind) -> &[Value] {
        match kind {
            ContentKind::Submission => &self.submissions,
            ContentKind::Comment => &self.comments,
        }
    }

    fn matches(&self, p: &SearchParams, v: &Value) -> bool {
        let created = v.get("created_utc").and_then(Value::as_i64).unwrap_or(0);
        if p.after.is_some_and(|a| created <= a) || p.before.is_some_and(|b| created >= b) {
            return false;
        }
        if let Some(s) = &p.subreddit {
            if !str_field(v, "subreddit").is_some_and(|x| x.eq_ignore_ascii_case(s)) {
                return false;
            }
        }
        if let Some(a) = &p.author {
            if !str_field(v, "author").is_some_and(|x| x.eq_ignore_ascii_case(a)) {
                return false;
            }
        }
        if !p.link_ids.is_empty() && !str_field(v, "link_id").is_some_and(|l| p.link_ids.iter().any(|x| x == l)) {
            return false;
        }
        if let Some(t) = &p.title {
            let phrase = t.trim_matches('"').to_lowercase();
            if !str_field(v, "title").is_some_and(|x| x.to_lowercase().contains(&phrase)) {
                return false;
            }
        }
        if let Some(q) = &p.q {
            if !str_field(v, "body").is_some_and(|x| x.to_lowercase().contains(&q.to_lowercase())) {
                return false;
            }
        }
        true
    }
}

impl SearchIndex for FakeIndex {
    fn search(&self, params: &SearchParams, limit: Option<usize>) -> Result<Vec<Value>> {
        bump(&self.calls.search);
        let after = params.after.unwrap_or(i64::MIN);
        self.calls.windows.borrow_mut().push((after, params.before.unwrap_or(i64::MAX)));
        if self.flaky_searches.get() > 0 {
            self.flaky_searches.set(self.flaky_searches.get() - 1);
            return Err(anyhow!("transient failure"));
        }
        if self.fail_after.contains(&after) {
            return Err(anyhow!("index unavailable for window after {}", after));
        }
        let mut out: Vec<Value> =
            self.items(params.kind()).iter().filter(|v| self.matches(params, v)).cloned().collect();
        out.sort_by_key(|v| std::cmp::Reverse(v.get("created_utc").and_then(Value::as_i64).unwrap_or(0)));
        if let Some(l) = limit {
            out.truncate(l);
        }
        Ok(out)
    }

    fn aggregate(&self, params: &SearchParams) -> Result<Vec<AggBucket>> {
        bump(&self.calls.aggregate);
        if self.fail_aggregate {
            return Err(anyhow!("aggregation unavailable"));
        }
        let field = params.aggs.clone().ok_or_else(|| anyhow!("no aggs"))?;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for v in self.items(params.kind()).iter().filter(|v| self.matches(params, v)) {
            if let Some(key) = str_field(v, &field) {
                *counts.entry(key.to_string()).or_insert(0) += 1;
            }
        }
        let mut buckets: Vec<AggBucket> =
            counts.into_iter().map(|(key, doc_count)| AggBucket { key, doc_count }).collect();
        buckets.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(buckets)
    }

    fn subreddit_activity(&self, after: i64, before: i64) -> Result<Vec<String>> {
        bump(&self.calls.activity);
        Ok(self
            .submissions
            .iter()
            .filter(|v| {
                let c = v.get("created_utc").and_then(Value::as_i64).unwrap_or(0);
                c > after && c < before
            })
            .filter_map(|v| str_field(v, "subreddit").map(str::to_string))
            .collect())
    }
}

/// In-memory official API.
#[derive(Default)]
pub struct FakeApi {
    pub calls: Rc<Calls>,
    /// Identity check result; `None` fails like bad credentials.
    pub username: Option<String>,
    /// Official objects by fullname (`t3_..`, `t1_..`).
    pub objects: HashMap<String, Value>,
    pub forests: HashMap<String, Vec<CommentNode>>,
    pub abouts: HashMap<String, Value>,
}

impl FakeApi {
    pub fn valid(name: &str) -> Self {
        Self { username: Some(name.to_string()), ..Default::default() }
    }

    pub fn invalid() -> Self {
        Self::default()
    }
}

impl RedditApi for FakeApi {
    fn me(&self) -> Result<String> {
        bump(&self.calls.me);
        self.username.clone().ok_or_else(|| anyhow!("401 Unauthorized"))
    }

    fn info(&self, fullnames: &[String]) -> Result<Vec<Value>> {
        bump(&self.calls.info);
        assert!(fullnames.len() <= 100, "info batches hold at most 100 fullnames");
        Ok(fullnames.iter().filter_map(|f| self.objects.get(f).cloned()).collect())
    }

    fn comment_forest(&self, submission_id: &str) -> Result<Vec<CommentNode>> {
        bump(&self.calls.forest);
        self.forests.get(submission_id).cloned().ok_or_else(|| anyhow!("404 for {}", submission_id))
    }

    fn subreddit_about(&self, name: &str) -> Result<Value> {
        bump(&self.calls.about);
        self.abouts.get(name).cloned().ok_or_else(|| anyhow!("404 for r/{}", name))
    }
}

/// Options that never sleep or draw progress bars.
pub fn quiet_options() -> RetrieverOptions {
    RetrieverOptions::default()
        .with_retry_policy(RetryPolicy::immediate(3))
        .with_page_delay(Duration::ZERO)
        .with_progress(false)
}

pub fn index_only(index: FakeIndex) -> Reddit {
    Reddit::unauthenticated(quiet_options(), Box::new(index))
}

pub fn submission(id: &str, subreddit: &str, author: &str, created: i64, num_comments: i64) -> Value {
    json!({
        "id": id,
        "subreddit": subreddit,
        "author": author,
        "created_utc": created,
        "num_comments": num_comments,
        "title": format!("post {}", id),
        "selftext": "",
        "permalink": format!("/r/{}/comments/{}/", subreddit, id),
        "score": 1,
        "retrieved_on": created + 10
    })
}

pub fn comment(id: &str, link: &str, subreddit: &str, author: &str, created: i64) -> Value {
    json!({
        "id": id,
        "link_id": format!("t3_{}", link),
        "parent_id": format!("t3_{}", link),
        "subreddit": subreddit,
        "author": author,
        "created_utc": created,
        "body": format!("comment {}", id),
        "score": 1
    })
}

/// UTC midnight epochs used across the tests.
pub const JAN_1_2020: i64 = 1_577_836_800;
pub const JAN_8_2020: i64 = 1_578_441_600;
pub const JAN_10_2020: i64 = 1_578_614_400;
pub const DAY: i64 = 86_400;
