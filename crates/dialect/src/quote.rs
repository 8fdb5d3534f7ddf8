/// Wraps `ident` in `quote`.
///
/// Whitespace and `;` are dropped from the body, an embedded `quote` is
/// doubled, and an empty `ident` stays empty.
pub fn quote_ident(ident: &str, quote: char) -> String {
    if ident.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(ident.len() + 2);
    out.push(quote);
    for ch in ident.chars() {
        match ch {
            c if c.is_whitespace() => {}
            ';' => {}
            c if c == quote => {
                out.push(quote);
                out.push(quote);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// `schema.table` with both parts quoted, or just the table when no schema
/// is given.
pub fn quote_table_name(schema: Option<&str>, table: &str, quote: char) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => {
            format!("{}.{}", quote_ident(schema, quote), quote_ident(table, quote))
        }
        _ => quote_ident(table, quote),
    }
}

#[cfg(test)]
mod tests {
    use super::{quote_ident, quote_table_name};

    #[test]
    fn whitespace_is_dropped() {
        assert_eq!(quote_ident("my table", '"'), "\"mytable\"");
        assert_eq!(quote_ident(" a\tb\nc ", '"'), "\"abc\"");
    }

    #[test]
    fn quote_char_is_doubled() {
        assert_eq!(quote_ident("a\"b", '"'), "\"a\"\"b\"");
        assert_eq!(quote_ident("a`b", '`'), "`a``b`");
        assert_eq!(quote_ident("a\"b", '`'), "`a\"b`");
    }

    #[test]
    fn terminator_is_dropped() {
        assert_eq!(quote_ident(";drop", '"'), "\"drop\"");
        assert_eq!(quote_ident("x; DROP TABLE y;", '"'), "\"xDROPTABLEy\"");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(quote_ident("", '"'), "");
    }

    #[test]
    fn schema_is_optional() {
        assert_eq!(quote_table_name(None, "migrations", '"'), "\"migrations\"");
        assert_eq!(quote_table_name(Some(""), "migrations", '"'), "\"migrations\"");
        assert_eq!(
            quote_table_name(Some("public"), "migrations", '"'),
            "\"public\".\"migrations\""
        );
    }
}
