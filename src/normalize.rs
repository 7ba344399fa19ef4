//! Response normalization: map a backend item onto a fixed per-type allow-list of
//! fields. Missing fields become `null`; nested author/subreddit objects collapse to
//! their names; creation timestamps become integer epoch seconds.

use crate::query::ContentKind;
use serde_json::{Map, Value};

/// One normalized row: allow-listed field name -> scalar or null.
pub type Record = Map<String, Value>;

pub const SUBMISSION_FIELDS: &[&str] = &[
    "archived",
    "author",
    "author_flair_text",
    "author_flair_type",
    "author_fullname",
    "category",
    "comment_limit",
    "content_categories",
    "created_utc",
    "crosspost_parent",
    "domain",
    "discussion_type",
    "distinguished",
    "downs",
    "full_link",
    "gilded",
    "id",
    "is_meta",
    "is_original_content",
    "is_reddit_media_domain",
    "is_self",
    "is_video",
    "link_flair_text",
    "link_flair_type",
    "locked",
    "media",
    "num_comments",
    "num_crossposts",
    "num_duplicates",
    "num_reports",
    "over_18",
    "permalink",
    "score",
    "selftext",
    "subreddit",
    "subreddit_id",
    "thumbnail",
    "title",
    "url",
    "ups",
    "upvote_ratio",
];

pub const COMMENT_FIELDS: &[&str] = &[
    "author",
    "author_flair_text",
    "author_flair_type",
    "author_fullname",
    "body",
    "collapsed",
    "collapsed_reason",
    "controversiality",
    "created_utc",
    "downs",
    "edited",
    "gildings",
    "id",
    "is_submitter",
    "link_id",
    "locked",
    "parent_id",
    "permalink",
    "stickied",
    "subreddit",
    "subreddit_id",
    "score",
    "score_hidden",
    "total_awards_received",
    "ups",
];

pub const SUBREDDIT_METADATA_FIELDS: &[&str] = &[
    "display_name",
    "restrict_posting",
    "wiki_enabled",
    "title",
    "primary_color",
    "active_user_count",
    "display_name_prefixed",
    "accounts_active",
    "public_traffic",
    "subscribers",
    "name",
    "quarantine",
    "hide_ads",
    "emojis_enabled",
    "advertiser_category",
    "public_description",
    "spoilers_enabled",
    "all_original_content",
    "key_color",
    "created",
    "submission_type",
    "allow_videogifs",
    "allow_polls",
    "collapse_deleted_comments",
    "allow_discovery",
    "link_flair_enabled",
    "subreddit_type",
    "suggested_comment_sort",
    "id",
    "over18",
    "description",
    "restrict_commenting",
    "allow_images",
    "lang",
    "whitelist_status",
    "url",
    "created_utc",
];

/// Column subset the subreddit puller requests when limiting submission metadata.
pub const SUBMISSION_FILTER_COLUMNS: &[&str] = &[
    "author",
    "author_fullname",
    "num_comments",
    "created_utc",
    "id",
    "permalink",
    "selftext",
    "title",
    "subreddit",
    "subreddit_id",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Submission,
    Comment,
    SubredditMetadata,
}

impl RecordKind {
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Submission => SUBMISSION_FIELDS,
            RecordKind::Comment => COMMENT_FIELDS,
            RecordKind::SubredditMetadata => SUBREDDIT_METADATA_FIELDS,
        }
    }
}

impl From<ContentKind> for RecordKind {
    fn from(k: ContentKind) -> Self {
        match k {
            ContentKind::Submission => RecordKind::Submission,
            ContentKind::Comment => RecordKind::Comment,
        }
    }
}

/// Epoch seconds from an integer, float, or numeric string.
pub fn coerce_epoch(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

/// A name from either a plain string or an object carrying `key` (e.g. `name`).
fn name_of(v: &Value, key: &str) -> Value {
    match v {
        Value::String(_) => v.clone(),
        Value::Object(map) => map.get(key).filter(|x| x.is_string()).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn normalize_field(field: &str, v: &Value) -> Value {
    if v.is_null() {
        return Value::Null;
    }
    match field {
        "author" => name_of(v, "name"),
        "subreddit" => name_of(v, "display_name"),
        "created_utc" | "created" => coerce_epoch(v).map(Value::from).unwrap_or(Value::Null),
        _ => v.clone(),
    }
}

/// Map one backend item to a record holding exactly the allow-listed fields.
pub fn normalize_item(item: &Value, kind: RecordKind) -> Record {
    let src = item.as_object();
    let mut rec = Record::new();
    for &field in kind.fields() {
        let v = src
            .and_then(|m| m.get(field))
            .map(|v| normalize_field(field, v))
            .unwrap_or(Value::Null);
        rec.insert(field.to_string(), v);
    }
    rec
}

pub fn created_utc(rec: &Record) -> Option<i64> {
    rec.get("created_utc").and_then(Value::as_i64)
}

/// Stable ascending sort on `created_utc`; records without one sort first.
pub fn sort_by_created(records: &mut [Record]) {
    records.sort_by_key(|r| created_utc(r).unwrap_or(i64::MIN));
}

/// Normalize a response batch and order it by creation time.
pub fn normalize_batch<'a, I>(items: I, kind: RecordKind) -> Vec<Record>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut out: Vec<Record> = items.into_iter().map(|v| normalize_item(v, kind)).collect();
    sort_by_created(&mut out);
    out
}

pub fn record_str<'a>(rec: &'a Record, field: &str) -> Option<&'a str> {
    rec.get(field).and_then(Value::as_str)
}
