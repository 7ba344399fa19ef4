#[path = "common/mod.rs"]
mod common;

use common::*;
use retriever::{Backend, CommentNode, Limit, Reddit, RetrieverError, SUBREDDIT_METADATA_FIELDS};
use serde_json::json;
use std::rc::Rc;

fn three_submissions() -> Vec<serde_json::Value> {
    vec![
        submission("s0", "rust", "alice", JAN_1_2020 + 10, 1),
        submission("s1", "rust", "alice", JAN_1_2020 + 20, 1),
        submission("s2", "rust", "alice", JAN_1_2020 + 30, 1),
    ]
}

/// Bad credentials: one identity check, then index-only for the handle's lifetime.
#[test]
fn invalid_credentials_downgrade_after_one_check() {
    let api = FakeApi::invalid();
    let api_calls = Rc::clone(&api.calls);
    let reddit = Reddit::select(quiet_options(), Box::new(FakeIndex::new(three_submissions(), vec![])), Some(Box::new(api)));

    assert_eq!(reddit.backend(), Backend::Index);
    assert!(!reddit.is_authenticated());
    assert_eq!(api_calls.me.get(), 1);

    let recs = reddit
        .retrieve_subreddit_submissions("rust", Some("2020-01-01"), Some("2020-01-02"), Limit::Unlimited, None)
        .unwrap()
        .unwrap();
    assert_eq!(recs.len(), 3);

    let err = reddit.retrieve_subreddit_metadata("rust").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RetrieverError>(),
        Some(RetrieverError::RequiresAuthentication { .. })
    ));
    assert_eq!(api_calls.me.get(), 1, "no further identity checks");
    assert_eq!(api_calls.network(), 1);
}

#[test]
fn no_official_api_means_index_backend() {
    let reddit = Reddit::select(quiet_options(), Box::new(FakeIndex::default()), None);
    assert_eq!(reddit.backend(), Backend::Index);
    assert!(reddit.retrieve_subreddit_metadata("rust").is_err());
}

/// Authenticated: index results are re-fetched from the official API in index
/// order; ids the official API does not know are dropped.
#[test]
fn authenticated_results_are_hydrated() {
    let mut api = FakeApi::valid("me");
    api.objects.insert(
        "t3_s0".into(),
        json!({"id": "s0", "author": {"name": "alice"}, "subreddit": {"display_name": "rust"}, "score": 99, "created_utc": (JAN_1_2020 + 10) as f64}),
    );
    api.objects.insert(
        "t3_s2".into(),
        json!({"id": "s2", "author": {"name": "alice"}, "subreddit": {"display_name": "rust"}, "score": 7, "created_utc": (JAN_1_2020 + 30) as f64}),
    );
    let api_calls = Rc::clone(&api.calls);
    let index = FakeIndex::new(three_submissions(), vec![]);
    let index_calls = Rc::clone(&index.calls);
    let reddit = Reddit::select(quiet_options(), Box::new(index), Some(Box::new(api)));
    assert_eq!(reddit.backend(), Backend::Authenticated);

    let recs = reddit
        .retrieve_subreddit_submissions("rust", Some("2020-01-01"), Some("2020-01-02"), Limit::Unlimited, None)
        .unwrap()
        .unwrap();
    let got: Vec<_> = recs.iter().map(|r| (r["id"].clone(), r["score"].clone(), r["author"].clone())).collect();
    assert_eq!(got, vec![(json!("s0"), json!(99), json!("alice")), (json!("s2"), json!(7), json!("alice"))]);
    assert_eq!(recs[0]["created_utc"], json!(JAN_1_2020 + 10));

    assert_eq!(api_calls.me.get(), 1);
    assert_eq!(api_calls.info.get(), 1);
    assert_eq!(index_calls.aggregate.get(), 1, "counts always come from the index");
}

#[test]
fn info_requests_are_batched_by_hundred() {
    let subs: Vec<_> = (0..250).map(|i| submission(&format!("p{}", i), "rust", "alice", JAN_1_2020 + i, 0)).collect();
    let mut api = FakeApi::valid("me");
    for i in 0..250 {
        api.objects.insert(format!("t3_p{}", i), json!({"id": format!("p{}", i), "created_utc": JAN_1_2020 + i}));
    }
    let api_calls = Rc::clone(&api.calls);
    let reddit = Reddit::select(quiet_options(), Box::new(FakeIndex::new(subs, vec![])), Some(Box::new(api)));

    let recs = reddit
        .retrieve_subreddit_submissions("rust", Some("2020-01-01"), Some("2020-01-02"), Limit::Unlimited, None)
        .unwrap()
        .unwrap();
    assert_eq!(recs.len(), 250);
    assert_eq!(api_calls.info.get(), 3);
}

/// When the index has no comments for a submission, the official comment
/// forest is flattened instead.
#[test]
fn comment_forest_fallback_when_authenticated() {
    let mut api = FakeApi::valid("me");
    api.forests.insert(
        "abc".into(),
        vec![
            CommentNode::comment(
                json!({"id": "k1", "link_id": "t3_abc", "created_utc": JAN_1_2020 + 1}),
                vec![CommentNode::comment(json!({"id": "k2", "link_id": "t3_abc", "created_utc": JAN_1_2020 + 5}), vec![]), CommentNode::more(4)],
            ),
            CommentNode::comment(json!({"id": "k3", "link_id": "t3_abc", "created_utc": JAN_1_2020 + 3}), vec![]),
        ],
    );
    let api_calls = Rc::clone(&api.calls);
    let reddit = Reddit::select(quiet_options(), Box::new(FakeIndex::default()), Some(Box::new(api)));

    let recs = reddit.retrieve_submission_comments(&["abc"]).unwrap().unwrap();
    let ids: Vec<_> = recs.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["k1", "k3", "k2"]);
    assert_eq!(api_calls.forest.get(), 1);
    assert_eq!(api_calls.info.get(), 0);
}

#[test]
fn subreddit_metadata_uses_allow_list() {
    let mut api = FakeApi::valid("me");
    api.abouts.insert(
        "rust".into(),
        json!({"display_name": "rust", "subscribers": 300000, "created_utc": 1_229_000_000.0, "junk": true}),
    );
    let reddit = Reddit::select(quiet_options(), Box::new(FakeIndex::default()), Some(Box::new(api)));

    let meta = reddit.retrieve_subreddit_metadata("/r/rust").unwrap().unwrap();
    assert_eq!(meta.len(), SUBREDDIT_METADATA_FIELDS.len());
    assert_eq!(meta["subscribers"], json!(300000));
    assert_eq!(meta["created_utc"], json!(1_229_000_000));
    assert!(!meta.contains_key("junk"));

    // Unknown subreddit: retries exhausted, no record.
    assert!(reddit.retrieve_subreddit_metadata("nope").unwrap().is_none());
}
