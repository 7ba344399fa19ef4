//! Time-chunked, retrying retrieval of Reddit submissions and comments from a
//! historical search index, optionally hydrated through the official API.

mod chunking;
mod config;
mod counting;
mod date;
mod error;
mod forest;
mod jsonl;
mod logging;
mod normalize;
mod progress;
mod pulls;
mod query;
mod reddit;
mod retry;

pub mod api;
pub mod cli;

pub use crate::chunking::{chunk_count, plan_chunks, TimeChunk};
pub use crate::config::{
    Credentials, RetrieverOptions, CONFIG_ENV, DEFAULT_CONFIG_FILE, DEFAULT_INDEX_BASE_URL, DEFAULT_PAGE_SIZE,
    DEFAULT_REDDIT_AUTH_URL, DEFAULT_REDDIT_BASE_URL, DEFAULT_TARGET_CHUNK_SIZE, REQUEST_LIMIT,
};
pub use crate::counting::{is_excluded_author, is_user_subreddit, merge_counts, ranked, tally, Tally};
pub use crate::date::{
    date_boundaries, date_boundaries_iso, date_to_epoch, end_epoch, epoch_to_datetime, format_date, parse_iso_date,
    start_epoch, tomorrow_utc, windows, FreqUnit, QueryFreq, DEFAULT_START_DATE, MAX_FREQ_MULTIPLE,
};
pub use crate::error::RetrieverError;
pub use crate::forest::{flatten_forest, parse_listing, CommentNode};
pub use crate::jsonl::{output_path, read_records, record_file_stem, write_records, Codec};
pub use crate::logging::{default_level, init_logging, init_tracing_once};
pub use crate::normalize::{
    coerce_epoch, created_utc, normalize_batch, normalize_item, record_str, sort_by_created, Record, RecordKind,
    COMMENT_FIELDS, SUBMISSION_FIELDS, SUBMISSION_FILTER_COLUMNS, SUBREDDIT_METADATA_FIELDS,
};
pub use crate::progress::{finish as finish_progress, make_count_progress, maybe_count_progress};
pub use crate::pulls::{sample_records, PullSummary, SubredditPull, UserPull};
pub use crate::query::{
    clean_submission_id, normalize_author, normalize_subreddit, ContentKind, Entity, HistoryType, Limit, Query,
    SearchParams,
};
pub use crate::reddit::{count_from_buckets, Backend, Batch, Reddit};
pub use crate::retry::{Backoff, RetryPolicy};
