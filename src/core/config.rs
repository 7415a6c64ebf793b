use std::env;
use std::time::Duration;

use super::classifier::KeywordSet;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SLASH_COMMAND: &str = "/create-canvas";
pub const DEFAULT_CONFIRMATION_TTL_SECS: u64 = 600;

/// Keywords that skip the confirmation prompt when present in a mention.
pub const DEFAULT_SKIP_KEYWORDS: &[&str] = &[
    "まとめて",
    "canvas作成",
    "キャンバス作成",
    "作成して",
    "整理して",
    "要約して",
    "summary",
    "create",
    "make",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack_bot_token: String,
    pub slack_app_token: String,
    pub openai_api_key: String,
    pub openai_org_id: Option<String>,
    pub openai_model: String,
    pub skip_keywords: KeywordSet,
    pub confirmation_ttl: Duration,
    pub slash_command: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let confirmation_ttl = match env::var("CONFIRMATION_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("CONFIRMATION_TTL_SECS: {}", e))?,
            Err(_) => DEFAULT_CONFIRMATION_TTL_SECS,
        };

        let skip_keywords = env::var("SKIP_KEYWORDS")
            .ok()
            .map(|raw| parse_keyword_list(&raw))
            .unwrap_or_else(KeywordSet::default_set);

        Ok(Self {
            slack_bot_token: env::var("SLACK_BOT_TOKEN")
                .map_err(|e| format!("SLACK_BOT_TOKEN: {}", e))?,
            slack_app_token: env::var("SLACK_APP_TOKEN")
                .map_err(|e| format!("SLACK_APP_TOKEN: {}", e))?,
            openai_api_key: env::var("OPENAI_API_KEY")
                .map_err(|e| format!("OPENAI_API_KEY: {}", e))?,
            openai_org_id: env::var("OPENAI_ORG_ID").ok(),
            openai_model: env::var("OPENAI_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            skip_keywords,
            confirmation_ttl: Duration::from_secs(confirmation_ttl),
            slash_command: env::var("SLASH_COMMAND")
                .ok()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SLASH_COMMAND.to_string()),
        })
    }
}

/// Parse a comma-separated keyword list; blank entries are ignored.
#[must_use]
pub fn parse_keyword_list(raw: &str) -> KeywordSet {
    KeywordSet::new(raw.split(',').map(str::trim).filter(|k| !k.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_list_ignores_blank_entries() {
        let set = parse_keyword_list("summary, ,Create,,");
        assert_eq!(set.len(), 2);
        assert!(set.matches("please CREATE it"));
    }
}
