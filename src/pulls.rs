//! File-producing pulls behind the two binaries. Output is resumable at file
//! granularity: any expected file that already exists is skipped untouched.

use crate::date::{date_boundaries, format_date, parse_iso_date, tomorrow_utc, windows, QueryFreq, DEFAULT_START_DATE};
use crate::jsonl::{output_path, read_records, write_records, Codec};
use crate::normalize::{record_str, Record, SUBMISSION_FILTER_COLUMNS};
use crate::progress::{finish, maybe_count_progress};
use crate::query::Limit;
use crate::reddit::Reddit;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use time::Date;

/// What a pull did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PullSummary {
    /// Records fetched and written during this run (pre-existing files excluded).
    pub records_written: usize,
    pub files_written: usize,
    pub files_skipped: usize,
    /// Nothing was found and no earlier output exists.
    pub nothing_found: bool,
}

// ------------------------------ Subreddit pull ------------------------------

/// Submissions of one subreddit per date window, then the comments of those
/// submissions, one file per submission.
#[derive(Clone, Debug)]
pub struct SubredditPull {
    pub subreddit: String,
    pub output_dir: PathBuf,
    pub start: Date,
    pub end: Date,
    pub freq: QueryFreq,
    pub min_comments: i64,
    pub chunksize: usize,
    pub sample_percent: f64,
    pub random_state: u64,
    pub comments_only: bool,
    pub limit_cols: bool,
    pub codec: Codec,
    pub progress: bool,
}

impl SubredditPull {
    pub fn new(subreddit: impl Into<String>, output_dir: impl Into<PathBuf>, start: Date, end: Date) -> Self {
        Self {
            subreddit: subreddit.into(),
            output_dir: output_dir.into(),
            start,
            end,
            freq: QueryFreq::days(7),
            min_comments: 0,
            chunksize: 50,
            sample_percent: 1.0,
            random_state: 42,
            comments_only: false,
            limit_cols: false,
            codec: Codec::Gzip,
            progress: true,
        }
    }

    pub fn with_freq(mut self, freq: QueryFreq) -> Self { self.freq = freq; self }
    pub fn with_min_comments(mut self, n: i64) -> Self { self.min_comments = n; self }
    pub fn with_chunksize(mut self, n: usize) -> Self { self.chunksize = n.max(1); self }
    /// Fraction of each submission file to fetch comments for, in (0, 1].
    pub fn with_sample(mut self, percent: f64, seed: u64) -> Self {
        self.sample_percent = percent.clamp(f64::MIN_POSITIVE, 1.0);
        self.random_state = seed;
        self
    }
    pub fn with_comments_only(mut self, yes: bool) -> Self { self.comments_only = yes; self }
    pub fn with_limit_cols(mut self, yes: bool) -> Self { self.limit_cols = yes; self }
    pub fn with_codec(mut self, codec: Codec) -> Self { self.codec = codec; self }
    pub fn with_progress(mut self, yes: bool) -> Self { self.progress = yes; self }

    pub fn subreddit_dir(&self) -> PathBuf {
        self.output_dir.join(&self.subreddit)
    }

    pub fn submissions_dir(&self) -> PathBuf {
        self.subreddit_dir().join("submissions")
    }

    pub fn comments_dir(&self) -> PathBuf {
        self.subreddit_dir().join("comments")
    }

    /// Fails with `IncompatibleDateRange` before any request when the range and
    /// frequency produce no windows.
    pub fn run(&self, reddit: &Reddit) -> Result<PullSummary> {
        let boundaries = date_boundaries(self.start, self.end, self.freq)?;
        fs::create_dir_all(self.submissions_dir())
            .with_context(|| format!("create {}", self.submissions_dir().display()))?;
        tracing::info!("Starting query for r/{}", self.subreddit);

        let mut summary = PullSummary::default();
        let submission_files = if self.comments_only {
            existing_record_files(&self.submissions_dir())?
        } else {
            self.pull_submissions(reddit, &boundaries, &mut summary)?
        };

        if submission_files.is_empty() {
            tracing::info!(
                "No submissions found from {} to {}. Exiting.",
                format_date(self.start),
                format_date(self.end)
            );
            summary.nothing_found = true;
            return Ok(summary);
        }

        self.pull_comments(reddit, &submission_files, &mut summary)?;
        tracing::info!("r/{} complete", self.subreddit);
        Ok(summary)
    }

    fn pull_submissions(&self, reddit: &Reddit, boundaries: &[Date], summary: &mut PullSummary) -> Result<Vec<PathBuf>> {
        tracing::info!("Pulling submissions");
        let cols = self.limit_cols.then_some(SUBMISSION_FILTER_COLUMNS);
        let dir = self.submissions_dir();
        let pb = maybe_count_progress(self.progress, boundaries.len().saturating_sub(1) as u64, "Date range");

        let mut files = Vec::new();
        let mut fetched = 0usize;
        for (a, b) in windows(boundaries) {
            let (a, b) = (format_date(a), format_date(b));
            let path = output_path(&dir, &format!("{}_{}", a, b), self.codec);
            if path.exists() {
                tracing::info!("Skipping {} because it already exists.", path.display());
                summary.files_skipped += 1;
                files.push(path);
            } else if let Some(records) =
                reddit.retrieve_subreddit_submissions(&self.subreddit, Some(&a), Some(&b), Limit::Unlimited, cols)?
            {
                fetched += write_records(&path, &records, self.codec)?;
                summary.files_written += 1;
                files.push(path);
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        finish(pb);

        summary.records_written += fetched;
        tracing::info!("Found {} submissions (pre-pulled files not included)", fetched);
        Ok(files)
    }

    fn pull_comments(&self, reddit: &Reddit, submission_files: &[PathBuf], summary: &mut PullSummary) -> Result<()> {
        tracing::info!("Pulling comments");
        let dir = self.comments_dir();
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let pb = maybe_count_progress(self.progress, submission_files.len() as u64, "Submission files");

        for file in submission_files {
            let submissions = read_records(file)?;
            let sampled = sample_records(submissions, self.sample_percent, self.random_state);

            let mut ids = Vec::new();
            for rec in &sampled {
                let Some(id) = record_str(rec, "id") else { continue };
                if num_comments(rec) <= self.min_comments {
                    continue;
                }
                if output_path(&dir, id, self.codec).exists() {
                    summary.files_skipped += 1;
                    continue;
                }
                ids.push(id.to_string());
            }
            tracing::debug!("{}: {} submission(s) need comments", file.display(), ids.len());

            for batch in ids.chunks(self.chunksize.max(1)) {
                let Some(comments) = reddit.retrieve_submission_comments(batch)? else { continue };
                let mut by_link = group_by_link_id(comments);
                for id in batch {
                    if let Some(recs) = by_link.remove(&format!("t3_{}", id)) {
                        summary.records_written += write_records(&output_path(&dir, id, self.codec), &recs, self.codec)?;
                        summary.files_written += 1;
                    }
                }
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        finish(pb);
        Ok(())
    }
}

fn num_comments(rec: &Record) -> i64 {
    match rec.get("num_comments") {
        Some(v) => v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)).unwrap_or(0),
        None => 0,
    }
}

fn group_by_link_id(records: Vec<Record>) -> HashMap<String, Vec<Record>> {
    let mut out: HashMap<String, Vec<Record>> = HashMap::new();
    for rec in records {
        if let Some(link) = rec.get("link_id").and_then(Value::as_str).map(str::to_string) {
            out.entry(link).or_default().push(rec);
        }
    }
    out
}

/// Keep `round(percent * n)` records chosen with a seeded RNG, in their original order.
/// A percent of 1 or more keeps everything.
pub fn sample_records(records: Vec<Record>, percent: f64, seed: u64) -> Vec<Record> {
    if percent >= 1.0 || records.is_empty() {
        return records;
    }
    let n = records.len();
    let k = ((percent * n as f64).round() as usize).min(n);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep = sample(&mut rng, n, k).into_vec();
    keep.sort_unstable();

    let mut keep = keep.into_iter().peekable();
    records
        .into_iter()
        .enumerate()
        .filter_map(|(i, r)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(r)
            } else {
                None
            }
        })
        .collect()
}

/// Record files in `dir`, sorted by name.
fn existing_record_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && Codec::from_path(p).is_some())
        .collect();
    files.sort();
    Ok(files)
}

// -------------------------------- User pull ---------------------------------

/// One author's full submission and comment history, each to a single file.
#[derive(Clone, Debug)]
pub struct UserPull {
    pub author: String,
    pub output_dir: PathBuf,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub freq: QueryFreq,
    pub codec: Codec,
    pub progress: bool,
}

impl UserPull {
    pub fn new(author: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            author: author.into(),
            output_dir: output_dir.into(),
            start_date: None,
            end_date: None,
            freq: QueryFreq { n: 1, unit: crate::date::FreqUnit::YearEnd },
            codec: Codec::Gzip,
            progress: true,
        }
    }

    pub fn with_dates(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }
    pub fn with_freq(mut self, freq: QueryFreq) -> Self { self.freq = freq; self }
    pub fn with_codec(mut self, codec: Codec) -> Self { self.codec = codec; self }
    pub fn with_progress(mut self, yes: bool) -> Self { self.progress = yes; self }

    pub fn submissions_path(&self) -> PathBuf {
        output_path(&self.output_dir, &format!("{}_submissions", self.author), self.codec)
    }

    pub fn comments_path(&self) -> PathBuf {
        output_path(&self.output_dir, &format!("{}_comments", self.author), self.codec)
    }

    pub fn run(&self, reddit: &Reddit) -> Result<PullSummary> {
        let start = parse_iso_date(self.start_date.as_deref().unwrap_or(DEFAULT_START_DATE))?;
        let end = match self.end_date.as_deref() {
            Some(s) => parse_iso_date(s)?,
            None => tomorrow_utc(),
        };
        let boundaries = date_boundaries(start, end, self.freq)?;
        fs::create_dir_all(&self.output_dir).with_context(|| format!("create {}", self.output_dir.display()))?;
        tracing::info!("Starting query for u/{}", self.author);

        let mut summary = PullSummary::default();
        for (label, path, fetch) in [
            ("submissions", self.submissions_path(), Reddit::retrieve_author_submissions as AuthorFetch),
            ("comments", self.comments_path(), Reddit::retrieve_author_comments as AuthorFetch),
        ] {
            if path.exists() {
                tracing::info!("{} already exists. Skipping.", path.display());
                summary.files_skipped += 1;
                continue;
            }
            let records = self.collect_windows(reddit, &boundaries, label, fetch)?;
            tracing::info!("u/{} has {} {}", self.author, records.len(), label);
            if !records.is_empty() {
                summary.records_written += write_records(&path, &records, self.codec)?;
                summary.files_written += 1;
            }
        }
        summary.nothing_found = summary.files_written == 0 && summary.files_skipped == 0;
        Ok(summary)
    }

    fn collect_windows(&self, reddit: &Reddit, boundaries: &[Date], label: &str, fetch: AuthorFetch) -> Result<Vec<Record>> {
        let pb = maybe_count_progress(self.progress, boundaries.len().saturating_sub(1) as u64, label);
        let mut all = Vec::new();
        for (a, b) in windows(boundaries) {
            let (a, b) = (format_date(a), format_date(b));
            if let Some(records) = fetch(reddit, &self.author, Some(&a), Some(&b), Limit::Auto)? {
                all.extend(records);
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        finish(pb);
        Ok(all)
    }
}

type AuthorFetch = fn(&Reddit, &str, Option<&str>, Option<&str>, Limit) -> Result<Option<Vec<Record>>>;
