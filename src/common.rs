use std::sync::LazyLock;

use regex::Regex;

pub type SqliteId = i64;

/// Stable identity of an article, assigned by `articles.id` on insert.
pub type ArticleId = SqliteId;

static BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*(br|p)\s*/?\s*>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]*>").unwrap());

/// Removes the lightweight HTML markup found in article content. Line and paragraph breaks become
/// blank lines, every other tag is dropped.
pub fn strip_markup(content: &str) -> String {
    let with_breaks = BREAK_TAG.replace_all(content, "\n\n");
    ANY_TAG.replace_all(&with_breaks, "").into_owned()
}

/// Escapes `%`, `_` and the escape character itself for use in a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Quotes user input as a single FTS5 phrase, doubling embedded quotes.
pub fn fts_phrase(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<b>dharma</b> m. law"), "dharma m. law");
        assert_eq!(strip_markup("a<BR>b"), "a\n\nb");
        assert_eq!(strip_markup("a<br/>b<p>c"), "a\n\nb\n\nc");
        assert_eq!(strip_markup("<i>yoga</i>, <I>union</I>"), "yoga, union");
        assert_eq!(strip_markup("no markup"), "no markup");
        assert_eq!(strip_markup("1 < 2"), "1 < 2");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("dharma"), "dharma");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }

    #[test]
    fn test_fts_phrase() {
        assert_eq!(fts_phrase("duty"), "\"duty\"");
        assert_eq!(fts_phrase("say \"om\""), "\"say \"\"om\"\"\"");
    }
}
