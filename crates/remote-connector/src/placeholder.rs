//! Placeholder normalization.

use std::borrow::Cow;
use sync_core::Dialect;

/// Native parameter placeholder syntax of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Positional `?`
    QuestionMark,
    /// Numbered `$1, $2, ...`
    Numbered,
}

impl PlaceholderStyle {
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::MySql => PlaceholderStyle::QuestionMark,
            Dialect::PostgreSql => PlaceholderStyle::Numbered,
        }
    }
}

/// Rewrite `?` placeholders into `style`.
///
/// Question marks inside single-quoted literals are left alone; a doubled
/// quote (`''`) inside a literal keeps the literal open.
pub fn rewrite_placeholders(sql: &str, style: PlaceholderStyle) -> Cow<'_, str> {
    if style == PlaceholderStyle::QuestionMark || !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_literal = false;
    let mut index = 0;
    for c in sql.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '?' if !in_literal => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_placeholders() {
        assert_eq!(
            rewrite_placeholders(
                "UPDATE products SET name = ?, stock = ? WHERE id = ?",
                PlaceholderStyle::Numbered
            ),
            "UPDATE products SET name = $1, stock = $2 WHERE id = $3"
        );
    }

    #[test]
    fn test_question_mark_passthrough() {
        let sql = "INSERT INTO t (id) VALUES (?)";
        assert!(matches!(
            rewrite_placeholders(sql, PlaceholderStyle::QuestionMark),
            Cow::Borrowed(s) if s == sql
        ));
    }

    #[test]
    fn test_literals_are_skipped() {
        assert_eq!(
            rewrite_placeholders(
                "SELECT * FROM t WHERE note = 'why?' AND id = ?",
                PlaceholderStyle::Numbered
            ),
            "SELECT * FROM t WHERE note = 'why?' AND id = $1"
        );
        assert_eq!(
            rewrite_placeholders(
                "SELECT 'it''s ?' , ?",
                PlaceholderStyle::Numbered
            ),
            "SELECT 'it''s ?' , $1"
        );
    }

    #[test]
    fn test_style_per_dialect() {
        assert_eq!(
            PlaceholderStyle::for_dialect(Dialect::MySql),
            PlaceholderStyle::QuestionMark
        );
        assert_eq!(
            PlaceholderStyle::for_dialect(Dialect::PostgreSql),
            PlaceholderStyle::Numbered
        );
    }
}
