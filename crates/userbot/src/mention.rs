//! `@User-<id>` mention rewriting for outgoing text.

use crate::bot::Bot;
use crate::error::AppResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::ops::Range;
use tokio_stream::StreamExt;
use tracing::debug;

const MENTION_PREFIX: &str = "@User-";

/// Rewrites mention shortcuts before a message is sent.
#[async_trait]
pub trait MentionResolver: Send + Sync {
    async fn resolve(&self, bot: &Bot, text: &str) -> AppResult<String>;
}

/// Leaves text untouched.
pub struct NoopMentionResolver;

#[async_trait]
impl MentionResolver for NoopMentionResolver {
    async fn resolve(&self, _bot: &Bot, text: &str) -> AppResult<String> {
        Ok(text.to_string())
    }
}

/// Resolves mentions against the company user list.
pub struct DirectoryMentionResolver;

#[async_trait]
impl MentionResolver for DirectoryMentionResolver {
    async fn resolve(&self, bot: &Bot, text: &str) -> AppResult<String> {
        let found = find_mentions(text);
        if found.is_empty() {
            return Ok(text.to_string());
        }

        let mut wanted: Vec<i64> = found.iter().map(|(_, id)| *id).collect();
        wanted.sort_unstable();
        wanted.dedup();

        let mut names = HashMap::new();
        let mut pages = Box::pin(bot.users());
        while let Some(page) = pages.next().await {
            for user in page? {
                if wanted.binary_search(&user.user_id).is_ok() {
                    names.insert(user.user_id, user.user_name);
                }
            }
            if names.len() == wanted.len() {
                break;
            }
        }

        debug!("Resolved {}/{} mentions", names.len(), wanted.len());
        Ok(rewrite(text, &found, &names))
    }
}

/// Byte ranges and ids of every `@User-<digits>` token.
fn find_mentions(text: &str) -> Vec<(Range<usize>, i64)> {
    let mut found = Vec::new();
    let mut from = 0;

    while let Some(pos) = text[from..].find(MENTION_PREFIX) {
        let start = from + pos;
        let digits_start = start + MENTION_PREFIX.len();
        let digits = text[digits_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let end = digits_start + digits;

        if let Ok(id) = text[digits_start..end].parse::<i64>() {
            found.push((start..end, id));
        }
        from = end.max(digits_start);
    }

    found
}

fn rewrite(text: &str, found: &[(Range<usize>, i64)], names: &HashMap<i64, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for (range, id) in found {
        if let Some(name) = names.get(id) {
            out.push_str(&text[cursor..range.start]);
            out.push_str(&format!("[\"@\"|{}|\"{}\"]", id, name));
            cursor = range.end;
        }
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_mentions() {
        let found = find_mentions("hi @User-12 and @User-3, not @User- or @user-4");
        let ids: Vec<i64> = found.iter().map(|(_, id)| *id).collect();

        assert_eq!(ids, vec![12, 3]);
        assert_eq!(found[0].0, 3..11);
    }

    #[test]
    fn test_rewrite_keeps_unresolved() {
        let text = "@User-1 meet @User-12 and @User-99";
        let found = find_mentions(text);
        let names = HashMap::from([(1, "Ann".to_string()), (12, "Bob".to_string())]);

        assert_eq!(
            rewrite(text, &found, &names),
            r#"["@"|1|"Ann"] meet ["@"|12|"Bob"] and @User-99"#
        );
    }

    #[test]
    fn test_rewrite_without_mentions() {
        assert_eq!(rewrite("plain", &[], &HashMap::new()), "plain");
        assert!(find_mentions("plain @User-x").is_empty());
    }
}
