//! Response parsing for LLM outputs.
//!
//! Extracts SQL from LLM replies. Replies usually wrap the query in a
//! markdown code block, but small models frequently return bare SQL with no
//! fence at all, so that case is recognized too.

/// Result of parsing an LLM reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// Any explanatory text around the SQL.
    pub text: String,
    /// Extracted SQL query, if found.
    pub sql: Option<String>,
}

impl ParsedReply {
    /// Creates a parsed reply with only text (no SQL).
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: None,
        }
    }

    /// Creates a parsed reply with SQL and optional surrounding text.
    pub fn with_sql(text: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: Some(sql.into()),
        }
    }
}

/// First keywords that mark a reply as bare SQL.
const SQL_KEYWORDS: &[&str] = &[
    "select", "show", "describe", "desc", "explain", "with", "insert", "update", "delete",
];

/// Parses an LLM reply to extract SQL.
///
/// Recognized forms, in order of preference:
/// - a ```sql or ```mysql fenced block
/// - a fenced block with no language tag
/// - a reply whose first keyword is a SQL verb (no fence)
///
/// If multiple matching blocks are found, the first one wins. Anything else
/// is returned as plain text.
pub fn parse_reply(reply: &str) -> ParsedReply {
    if let Some((sql, text)) = extract_fenced(reply, &["sql", "mysql"]) {
        return ParsedReply::with_sql(text, sql);
    }

    if let Some((sql, text)) = extract_fenced(reply, &[]) {
        return ParsedReply::with_sql(text, sql);
    }

    let trimmed = reply.trim();
    if is_bare_sql(trimmed) {
        return ParsedReply::with_sql("", trimmed);
    }

    ParsedReply::text_only(trimmed)
}

/// Returns true if the text reads as a raw SQL statement.
fn is_bare_sql(text: &str) -> bool {
    let Some(first_word) = text.split_whitespace().next() else {
        return false;
    };
    SQL_KEYWORDS.contains(&first_word.to_lowercase().as_str())
}

/// Finds the first fenced code block matching one of `langs` and returns
/// `(block content, remaining text)`.
///
/// An empty `langs` slice matches only blocks without a language tag.
fn extract_fenced(text: &str, langs: &[&str]) -> Option<(String, String)> {
    let mut search = 0;

    while let Some(rel) = text[search..].find("```") {
        let open = search + rel;
        let after_fence = &text[open + 3..];

        // The language tag runs to the end of the fence line.
        let newline = after_fence.find('\n')?;
        let tag = after_fence[..newline].trim().to_lowercase();

        let body_start = open + 3 + newline + 1;
        let close_rel = text[body_start..].find("```")?;
        let close = body_start + close_rel;

        let tag_matches = if langs.is_empty() {
            tag.is_empty()
        } else {
            langs.contains(&tag.as_str())
        };

        if tag_matches {
            let sql = text[body_start..close].trim().to_string();
            let before = text[..open].trim();
            let after = text[close + 3..].trim();
            let remainder = match (before.is_empty(), after.is_empty()) {
                (true, true) => String::new(),
                (false, true) => before.to_string(),
                (true, false) => after.to_string(),
                (false, false) => format!("{before}\n{after}"),
            };
            return Some((sql, remainder));
        }

        // Not the block we want; continue after it.
        search = close + 3;
    }

    None
}
