use super::{AggBucket, SearchIndex};
use crate::config::RetrieverOptions;
use crate::normalize::coerce_epoch;
use crate::query::{ContentKind, SearchParams};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;
use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

/// Page size the raw activity endpoint is asked for.
const ACTIVITY_PAGE_SIZE: usize = 1000;

/// Blocking client for the Pushshift-style historical index.
pub struct PushshiftClient {
    http: HttpClient,
    base_url: String,
    page_size: usize,
    page_delay: Duration,
}

impl PushshiftClient {
    pub fn new(opts: &RetrieverOptions) -> Result<Self> {
        let http = HttpClient::builder()
            .user_agent(format!("retriever/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: opts.index_base_url.trim_end_matches('/').to_string(),
            page_size: opts.page_size.max(1),
            page_delay: opts.page_delay,
        })
    }

    fn endpoint(&self, kind: ContentKind) -> String {
        format!("{}/search/{}/", self.base_url, kind.endpoint())
    }

    fn get_json(&self, url: &str, pairs: &[(String, String)]) -> Result<Value> {
        let resp = self.http.get(url).query(pairs).send().with_context(|| format!("GET {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("index request failed ({}): {}", status, url);
        }
        Ok(resp.json()?)
    }
}

fn data_array(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Object(mut m) => match m.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(anyhow!("index response has no data array")),
        },
        _ => Err(anyhow!("index response is not an object")),
    }
}

impl SearchIndex for PushshiftClient {
    /// Pages backwards in time, newest first; see [`page_backwards`].
    fn search(&self, params: &SearchParams, limit: Option<usize>) -> Result<Vec<Value>> {
        let url = self.endpoint(params.kind());
        let mut params = params.clone();
        params.aggs = None;
        // Paging needs created_utc even when the caller limits columns.
        if let Some(cols) = params.filter.as_mut() {
            for must in ["id", "created_utc"] {
                if !cols.iter().any(|c| c == must) {
                    cols.push(must.to_string());
                }
            }
        }

        let delay = self.page_delay;
        page_backwards(&params, limit, self.page_size, delay, |page| {
            let mut pairs = page.to_pairs();
            pairs.push(("sort".into(), "desc".into()));
            pairs.push(("sort_type".into(), "created_utc".into()));
            data_array(self.get_json(&url, &pairs)?)
        })
    }

    fn aggregate(&self, params: &SearchParams) -> Result<Vec<AggBucket>> {
        let field = params.aggs.clone().ok_or_else(|| anyhow!("aggregate called without aggs"))?;
        let url = self.endpoint(params.kind());
        let body = self.get_json(&url, &params.to_pairs())?;
        let buckets = body
            .pointer(&format!("/aggs/{}", field))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(buckets
            .iter()
            .filter_map(|b| {
                let key = match b.get("key")? {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let doc_count = b.get("doc_count").and_then(Value::as_u64)?;
                Some(AggBucket { key, doc_count })
            })
            .collect())
    }

    fn subreddit_activity(&self, after: i64, before: i64) -> Result<Vec<String>> {
        let url = self.endpoint(ContentKind::Submission);
        let pairs = vec![
            ("after".to_string(), after.to_string()),
            ("before".to_string(), before.to_string()),
            ("filter".to_string(), "subreddit".to_string()),
            ("size".to_string(), ACTIVITY_PAGE_SIZE.to_string()),
        ];
        let data = data_array(self.get_json(&url, &pairs)?)?;
        let names = data
            .iter()
            .filter_map(|d| d.get("subreddit").and_then(Value::as_str).map(str::to_string))
            .collect();
        sleep(self.page_delay);
        Ok(names)
    }
}

fn created(item: &Value) -> Option<i64> {
    item.get("created_utc").and_then(coerce_epoch)
}

/// Drive a newest-first paged search until it runs dry or `limit` items are kept.
///
/// The next page ends at the oldest second of the previous one, inclusive, so items
/// sharing that second are not dropped at a page edge; repeats are removed by `id`.
/// A second that is re-read is then stepped past. Only when a single second holds
/// more than a full page can items be missed, and that is logged.
pub fn page_backwards<F>(
    params: &SearchParams,
    limit: Option<usize>,
    page_size: usize,
    page_delay: Duration,
    mut fetch_page: F,
) -> Result<Vec<Value>>
where
    F: FnMut(&SearchParams) -> Result<Vec<Value>>,
{
    let mut params = params.clone();
    let page_size = page_size.max(1);
    let mut out: Vec<Value> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut last_oldest = None;
    loop {
        if limit.is_some_and(|l| out.len() >= l) {
            break;
        }
        params.size = Some(page_size);

        let page = fetch_page(&params)?;
        let n = page.len();
        let oldest = page.iter().filter_map(created).min();
        let single_second = n > 0 && oldest.is_some() && page.iter().all(|i| created(i) == oldest);
        for item in page {
            let fresh = match item.get("id").and_then(Value::as_str) {
                Some(id) => seen.insert(id.to_string()),
                None => true,
            };
            if fresh {
                out.push(item);
            }
        }
        if n < page_size {
            break;
        }

        let before = match oldest {
            Some(ts) if last_oldest != Some(ts) => ts.saturating_add(1),
            Some(ts) => {
                if single_second {
                    tracing::debug!("a full page created at {}; items beyond it in that second may be missing", ts);
                }
                ts
            }
            None => break,
        };
        last_oldest = oldest;
        params.before = Some(before);
        sleep(page_delay);
    }
    if let Some(l) = limit {
        out.truncate(l);
    }
    Ok(out)
}
