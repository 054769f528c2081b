// Hover text for a blamed line.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::github::Commit;

static ISSUE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("issue reference pattern is valid"));

/// Renders commits as markdown with author, short oid, and linked issue references.
#[derive(Debug, Clone)]
pub struct HoverFormatter {
    web_url: String,
}

impl Default for HoverFormatter {
    fn default() -> Self {
        Self::new("https://github.com")
    }
}

impl HoverFormatter {
    pub fn new(web_url: impl Into<String>) -> Self {
        Self {
            web_url: web_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn render(&self, commit: &Commit, owner: &str, repo: &str) -> String {
        let author = match &commit.author.user {
            Some(user) => format!("[{}]({})", commit.author.name, user.url),
            None => commit.author.name.clone(),
        };
        let text = format!(
            "{} *[({})]({})*: {}",
            author,
            commit.short_oid(),
            commit.url,
            commit.message
        );

        ISSUE_REF
            .replace_all(&text, |caps: &Captures| {
                format!(
                    "[#{num}]({}/{}/{}/issues/{num})",
                    self.web_url,
                    owner,
                    repo,
                    num = &caps[1]
                )
            })
            .into_owned()
    }
}
