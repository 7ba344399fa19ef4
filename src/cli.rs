//! Command-line arguments for the two pull binaries and the glue that turns
//! them into a `Reddit` handle plus a pull.

use crate::config::{Credentials, RetrieverOptions};
use crate::date::{parse_iso_date, QueryFreq};
use crate::error::RetrieverError;
use crate::jsonl::Codec;
use crate::logging::init_logging;
use crate::pulls::{PullSummary, SubredditPull, UserPull};
use crate::reddit::Reddit;
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn parse_fraction(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("{:?} is not a number", s))?;
    if v > 0.0 && v <= 1.0 {
        Ok(v)
    } else {
        Err(format!("{} is outside (0, 1]", v))
    }
}

fn parse_freq(s: &str) -> Result<QueryFreq, String> {
    s.parse::<QueryFreq>().map_err(|e| e.to_string())
}

/// Query Reddit submissions and comments of one subreddit.
#[derive(Parser, Debug, Clone)]
#[command(name = "retrieve-subreddit-data")]
#[command(version, about)]
pub struct SubredditArgs {
    /// Name of the subreddit to find submissions and comments for
    pub subreddit: String,

    /// Path to output directory
    #[arg(long, required = true)]
    pub output_dir: PathBuf,

    /// Start date for data (YYYY-MM-DD)
    #[arg(long, default_value = "2019-01-01")]
    pub start_date: String,

    /// End date for data (YYYY-MM-DD)
    #[arg(long, default_value = "2020-08-01")]
    pub end_date: String,

    /// How to break up the submission query (e.g. 7D, 1W, MS, 1Y)
    #[arg(long, default_value = "7D", value_parser = parse_freq)]
    pub query_freq: QueryFreq,

    /// Only fetch comments of submissions with more than this many comments
    #[arg(long, default_value_t = 0)]
    pub min_comments: i64,

    /// Hydrate results through the official API (slower)
    #[arg(long)]
    pub use_praw: bool,

    /// Number of submissions to request comments for at once
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunksize: u32,

    /// Submission sample fraction, in (0, 1]
    #[arg(long, default_value_t = 1.0, value_parser = parse_fraction)]
    pub sample_percent: f64,

    /// Seed for submission sampling
    #[arg(long, default_value_t = 42)]
    pub random_state: u64,

    /// Run in debug mode
    #[arg(long)]
    pub debug: bool,

    /// Write log to this file instead of standard out
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Skip the submission phase and use existing submission files
    #[arg(long)]
    pub comments_only: bool,

    /// Request only the submission columns needed for the comment phase
    #[arg(long)]
    pub limit_cols: bool,

    /// Credentials file (defaults to $RETRIEVER_CONFIG, then ./config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write .json.zst instead of .json.gz
    #[arg(long)]
    pub zstd: bool,
}

/// Query Reddit submissions and comments by a specific user.
#[derive(Parser, Debug, Clone)]
#[command(name = "retrieve-user-data")]
#[command(version, about)]
pub struct UserArgs {
    /// Name of the user to find submissions and comments for
    pub author: String,

    /// Path to output directory
    #[arg(long, required = true)]
    pub output_dir: PathBuf,

    /// Start date for data (YYYY-MM-DD); full history when omitted
    #[arg(long)]
    pub start_date: Option<String>,

    /// End date for data (YYYY-MM-DD); tomorrow when omitted
    #[arg(long)]
    pub end_date: Option<String>,

    /// How to break up the query
    #[arg(long, default_value = "1Y", value_parser = parse_freq)]
    pub query_freq: QueryFreq,

    /// Hydrate results through the official API (slower)
    #[arg(long)]
    pub use_praw: bool,

    /// Run in debug mode
    #[arg(long)]
    pub debug: bool,

    /// Write log to this file instead of standard out
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Credentials file (defaults to $RETRIEVER_CONFIG, then ./config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write .json.zst instead of .json.gz
    #[arg(long)]
    pub zstd: bool,
}

fn codec(zstd: bool) -> Codec {
    if zstd { Codec::Zstd } else { Codec::Gzip }
}

fn connect(use_praw: bool, config: Option<&Path>) -> Result<Reddit> {
    let creds = if use_praw { Credentials::load(&Credentials::locate(config)) } else { None };
    Reddit::connect(RetrieverOptions::default(), use_praw, creds)
}

impl SubredditArgs {
    /// The pull these arguments describe. Fails on malformed dates.
    pub fn to_pull(&self) -> Result<SubredditPull, RetrieverError> {
        Ok(SubredditPull::new(
            self.subreddit.clone(),
            self.output_dir.clone(),
            parse_iso_date(&self.start_date)?,
            parse_iso_date(&self.end_date)?,
        )
        .with_freq(self.query_freq)
        .with_min_comments(self.min_comments)
        .with_chunksize(self.chunksize as usize)
        .with_sample(self.sample_percent, self.random_state)
        .with_comments_only(self.comments_only)
        .with_limit_cols(self.limit_cols)
        .with_codec(codec(self.zstd)))
    }

    pub fn run(&self) -> Result<PullSummary> {
        init_logging(self.debug, self.log_file.as_deref())?;
        let pull = self.to_pull()?;
        let reddit = connect(self.use_praw, self.config.as_deref())?;
        pull.run(&reddit)
    }
}

impl UserArgs {
    pub fn to_pull(&self) -> UserPull {
        UserPull::new(self.author.clone(), self.output_dir.clone())
            .with_dates(self.start_date.clone(), self.end_date.clone())
            .with_freq(self.query_freq)
            .with_codec(codec(self.zstd))
    }

    pub fn run(&self) -> Result<PullSummary> {
        init_logging(self.debug, self.log_file.as_deref())?;
        let pull = self.to_pull();
        let reddit = connect(self.use_praw, self.config.as_deref())?;
        pull.run(&reddit)
    }
}

/// Status 0 on success (including "nothing found"), 1 on any failure.
/// Configuration mistakes are logged as such.
pub fn exit_code(outcome: Result<PullSummary>) -> ExitCode {
    match outcome {
        Ok(summary) => {
            tracing::info!(
                "done: {} file(s) written, {} skipped, {} record(s)",
                summary.files_written,
                summary.files_skipped,
                summary.records_written
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<RetrieverError>() {
                Some(cfg) if cfg.is_configuration() => tracing::error!("configuration error: {}", cfg),
                _ => tracing::error!("{:#}", e),
            }
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
