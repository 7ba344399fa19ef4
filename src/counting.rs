//! Small tallies used by the activity/history operations: count names, merge
//! partial tallies, and rank them.

use std::collections::BTreeMap;

pub type Tally = BTreeMap<String, u64>;

pub fn tally<I, S>(total: &mut Tally, names: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for n in names {
        *total.entry(n.into()).or_insert(0) += 1;
    }
}

pub fn merge_counts(total: &mut Tally, part: Tally) {
    for (k, v) in part {
        *total.entry(k).or_insert(0) += v;
    }
}

/// Highest count first; ties by name.
pub fn ranked(t: Tally) -> Vec<(String, u64)> {
    let mut v: Vec<(String, u64)> = t.into_iter().collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v
}

/// Pseudo users and accounts that look like bots.
pub fn is_excluded_author(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    lower.is_empty() || lower == "[deleted]" || lower == "[removed]" || lower.ends_with("bot")
}

/// User-profile subreddits (`u_<name>`).
pub fn is_user_subreddit(name: &str) -> bool {
    name.starts_with("u_")
}
