use regex::Regex;
use url::Url;

use crate::core::models::ThreadRef;

/// Parse a Slack message permalink into the identity of the thread it belongs to.
///
/// We accept:
/// - plain links like `https://acme.slack.com/archives/C0123/p1700000000123456`
/// - Slack link markup like `<https://...|label>` or `<https://...>`
/// - reply links carrying `?thread_ts=1700000000.000100&cid=C0123`, which resolve to the
///   thread root rather than the reply itself
///
/// Returns `None` for anything that is not a Slack archive link.
#[must_use]
pub fn parse_thread_permalink(raw: &str) -> Option<ThreadRef> {
    let raw = strip_slack_markup(raw.trim());
    let url = Url::parse(raw).ok()?;

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    if host != "slack.com" && !host.ends_with(".slack.com") {
        return None;
    }

    let mut segments = url.path_segments()?;
    segments.find(|s| *s == "archives")?;
    let channel_id = segments.next().filter(|c| is_channel_id(c))?.to_string();
    let message_ts = segments.next().and_then(permalink_fragment_to_ts)?;

    let thread_ts = url
        .query_pairs()
        .find(|(k, _)| k == "thread_ts")
        .map(|(_, v)| v.to_string())
        .filter(|ts| is_message_ts(ts))
        .unwrap_or(message_ts);

    Some(ThreadRef::new(channel_id, thread_ts))
}

/// `p1700000000123456` -> `1700000000.123456`
#[must_use]
pub fn permalink_fragment_to_ts(fragment: &str) -> Option<String> {
    static FRAGMENT_RE: std::sync::LazyLock<Option<Regex>> =
        std::sync::LazyLock::new(|| Regex::new(r"^p(\d{10})(\d{6})$").ok());

    let caps = FRAGMENT_RE.as_ref()?.captures(fragment)?;
    Some(format!("{}.{}", &caps[1], &caps[2]))
}

/// `1700000000.1234` -> `p1700000000123400`
#[must_use]
pub fn ts_to_permalink_fragment(ts: &str) -> Option<String> {
    let (secs, frac) = ts.split_once('.')?;
    if secs.is_empty() || !secs.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 6 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("p{secs}{frac:0<6}"))
}

/// Deterministic thread link used when `chat.getPermalink` is unavailable.
#[must_use]
pub fn fallback_thread_permalink(workspace_url: Option<&str>, thread: &ThreadRef) -> String {
    let base = workspace_url
        .map(|u| u.trim_end_matches('/'))
        .filter(|u| !u.is_empty())
        .unwrap_or("https://slack.com");
    let fragment = ts_to_permalink_fragment(&thread.thread_ts)
        .unwrap_or_else(|| format!("p{}", thread.thread_ts.replace('.', "")));
    format!("{base}/archives/{}/{fragment}", thread.channel_id)
}

/// Canvas links have the form `{workspace}/docs/{team_id}/{canvas_id}`.
#[must_use]
pub fn canvas_url(workspace_url: &str, team_id: &str, canvas_id: &str) -> String {
    format!(
        "{}/docs/{team_id}/{canvas_id}",
        workspace_url.trim_end_matches('/')
    )
}

fn strip_slack_markup(raw: &str) -> &str {
    let inner = raw
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(raw);
    inner.split('|').next().unwrap_or(inner)
}

fn is_channel_id(s: &str) -> bool {
    s.len() >= 2
        && matches!(s.as_bytes()[0], b'C' | b'G' | b'D')
        && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_message_ts(s: &str) -> bool {
    ts_to_permalink_fragment(s).is_some()
}
