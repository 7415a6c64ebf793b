use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

/// First non-empty string found among `paths`.
pub fn v_str_any<'a>(root: &'a Value, paths: &[&[&str]]) -> Option<&'a str> {
    paths
        .iter()
        .find_map(|p| v_str(root, p).filter(|s| !s.is_empty()))
}

pub fn v_array<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Vec<Value>> {
    v_path(root, path).and_then(|v| v.as_array())
}

/// Remove `<@U123>` / `<@U123|name>` user mention tokens and tidy whitespace.
pub fn strip_user_mentions(text: &str) -> String {
    static MENTION_RE: LazyLock<Option<Regex>> =
        LazyLock::new(|| Regex::new(r"<@[A-Z0-9]+(?:\|[^>]*)?>").ok());

    let stripped = match MENTION_RE.as_ref() {
        Some(re) => re.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `text` mentions `user_id`.
pub fn mentions_user(text: &str, user_id: &str) -> bool {
    text.contains(&format!("<@{user_id}>")) || text.contains(&format!("<@{user_id}|"))
}
