//! Comment forests from the official API and their depth-first flattening.

use serde_json::Value;

/// A node of a submission's comment tree.
#[derive(Clone, Debug, PartialEq)]
pub enum CommentNode {
    Comment { data: Value, replies: Vec<CommentNode> },
    /// "load more comments" placeholder; carries no comment of its own.
    More { count: u64, children: Vec<String> },
}

impl CommentNode {
    pub fn comment(data: Value, replies: Vec<CommentNode>) -> Self {
        CommentNode::Comment { data, replies }
    }

    pub fn more(count: u64) -> Self {
        CommentNode::More { count, children: Vec::new() }
    }
}

/// Pre-order depth-first flattening with an explicit stack.
/// Placeholders are dropped; siblings keep their original order.
pub fn flatten_forest(roots: Vec<CommentNode>) -> Vec<Value> {
    let mut out = Vec::new();
    let mut stack: Vec<CommentNode> = roots.into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        match node {
            CommentNode::Comment { data, replies } => {
                out.push(data);
                stack.extend(replies.into_iter().rev());
            }
            CommentNode::More { .. } => {}
        }
    }
    out
}

/// Build nodes from a Reddit `Listing` (`{"kind":"Listing","data":{"children":[..]}}`).
/// Each `t1` child's `replies` (a nested listing, or `""` when empty) becomes its subtree.
pub fn parse_listing(listing: &Value) -> Vec<CommentNode> {
    let children = match listing.pointer("/data/children").and_then(Value::as_array) {
        Some(c) => c,
        None => return Vec::new(),
    };
    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        let kind = child.get("kind").and_then(Value::as_str).unwrap_or("");
        let Some(data) = child.get("data") else { continue };
        match kind {
            "t1" => {
                let replies = data.get("replies").map(parse_listing).unwrap_or_default();
                let mut data = data.clone();
                if let Some(obj) = data.as_object_mut() {
                    obj.remove("replies");
                }
                nodes.push(CommentNode::Comment { data, replies });
            }
            "more" => {
                let count = data.get("count").and_then(Value::as_u64).unwrap_or(0);
                let children = data
                    .get("children")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|c| c.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                nodes.push(CommentNode::More { count, children });
            }
            _ => {}
        }
    }
    nodes
}
