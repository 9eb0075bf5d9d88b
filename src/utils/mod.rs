pub mod signal;

/// `%term%` for ILIKE, with the wildcard characters of `term` escaped.
pub fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Splits newline-joined text back into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Inverse of [`split_lines`]; blank entries are dropped.
pub fn join_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a comma separated ordering such as `-rating,price` into
/// `(field, descending)` pairs.
pub fn parse_ordering<T>(
    value: &str,
    parse_field: impl Fn(&str) -> Option<T>,
) -> Result<Vec<(T, bool)>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| {
            let (descending, field) = match term.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, term),
            };
            parse_field(field)
                .map(|f| (f, descending))
                .ok_or_else(|| format!("Invalid ordering field: {field}"))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn split_lines_drops_blanks() {
        assert_eq!(
            split_lines("  first \n\n second\n   \n"),
            vec!["first".to_string(), "second".to_string()]
        );
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn join_lines_skips_blanks() {
        let lines = vec!["a".to_string(), " ".to_string(), " b ".to_string()];
        assert_eq!(join_lines(&lines), "a\nb");
    }

    #[test]
    fn ordering_terms() {
        let parsed = parse_ordering("-a, b,,", |f| (f.len() == 1).then(|| f.to_string())).unwrap();
        assert_eq!(parsed, vec![("a".to_string(), true), ("b".to_string(), false)]);
        assert!(parse_ordering("-long", |f| (f.len() == 1).then_some(())).is_err());
    }
}
