use clap::Parser;
use retriever::cli::{SubredditArgs, UserArgs};
use retriever::{Codec, FreqUnit, QueryFreq, RetrieverError};
use std::path::PathBuf;

#[test]
fn subreddit_defaults() {
    let args = SubredditArgs::try_parse_from(["retrieve-subreddit-data", "rust", "--output-dir", "out"]).unwrap();
    assert_eq!(args.subreddit, "rust");
    assert_eq!(args.output_dir, PathBuf::from("out"));
    assert_eq!(args.start_date, "2019-01-01");
    assert_eq!(args.end_date, "2020-08-01");
    assert_eq!(args.query_freq, QueryFreq::days(7));
    assert_eq!(args.min_comments, 0);
    assert_eq!(args.chunksize, 50);
    assert_eq!(args.sample_percent, 1.0);
    assert_eq!(args.random_state, 42);
    assert!(!args.use_praw && !args.debug && !args.comments_only && !args.limit_cols && !args.zstd);
    assert!(args.log_file.is_none() && args.config.is_none());

    let pull = args.to_pull().unwrap();
    assert_eq!(pull.codec, Codec::Gzip);
    assert_eq!(pull.submissions_dir(), PathBuf::from("out").join("rust").join("submissions"));
}

#[test]
fn subreddit_flags() {
    let args = SubredditArgs::try_parse_from([
        "retrieve-subreddit-data",
        "rust",
        "--output-dir",
        "/tmp/o",
        "--query-freq",
        "2W",
        "--min-comments",
        "3",
        "--chunksize",
        "10",
        "--sample-percent",
        "0.25",
        "--random-state",
        "7",
        "--comments-only",
        "--limit-cols",
        "--use-praw",
        "--zstd",
        "--config",
        "creds.json",
    ])
    .unwrap();
    assert_eq!(args.query_freq, QueryFreq { n: 2, unit: FreqUnit::Week });
    let pull = args.to_pull().unwrap();
    assert_eq!(pull.min_comments, 3);
    assert_eq!(pull.chunksize, 10);
    assert_eq!((pull.sample_percent, pull.random_state), (0.25, 7));
    assert!(pull.comments_only && pull.limit_cols);
    assert_eq!(pull.codec, Codec::Zstd);
    assert_eq!(args.config, Some(PathBuf::from("creds.json")));
}

#[test]
fn subreddit_rejects_bad_values() {
    let base = ["retrieve-subreddit-data", "rust", "--output-dir", "o"];
    let with = |extra: &[&str]| SubredditArgs::try_parse_from(base.iter().chain(extra.iter()).copied());

    assert!(with(&["--sample-percent", "0"]).is_err());
    assert!(with(&["--sample-percent", "1.5"]).is_err());
    assert!(with(&["--query-freq", "fortnightly"]).is_err());
    assert!(with(&["--chunksize", "0"]).is_err());
    assert!(SubredditArgs::try_parse_from(["retrieve-subreddit-data", "rust"]).is_err(), "output dir is required");

    let args = with(&["--start-date", "2020-02-30"]).unwrap();
    assert!(matches!(args.to_pull(), Err(RetrieverError::InvalidDate(_))));
}

#[test]
fn user_defaults() {
    let args = UserArgs::try_parse_from(["retrieve-user-data", "spez", "--output-dir", "o"]).unwrap();
    assert_eq!(args.author, "spez");
    assert!(args.start_date.is_none() && args.end_date.is_none());
    assert_eq!(args.query_freq, QueryFreq { n: 1, unit: FreqUnit::YearEnd });

    let pull = args.to_pull();
    assert_eq!(pull.submissions_path(), PathBuf::from("o").join("spez_submissions.json.gz"));
    assert_eq!(pull.comments_path(), PathBuf::from("o").join("spez_comments.json.gz"));

    let zst = UserArgs::try_parse_from(["retrieve-user-data", "spez", "--output-dir", "o", "--zstd", "--start-date", "2015-01-01"])
        .unwrap()
        .to_pull();
    assert_eq!(zst.comments_path(), PathBuf::from("o").join("spez_comments.json.zst"));
    assert_eq!(zst.start_date.as_deref(), Some("2015-01-01"));
}
