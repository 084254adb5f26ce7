//! Inline `style` attribute parsing.
//!
//! Declarations are kept in source order. Property names are lower-cased,
//! values are trimmed but otherwise left alone.

/// Split a `style` attribute into `(property, value)` pairs.
pub fn parse_declarations(text: &str) -> Vec<(String, String)> {
    let mut declarations: Vec<(String, String)> = Vec::new();
    for chunk in split_outside_quotes(text) {
        let Some((name, value)) = chunk.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        if let Some(existing) = declarations.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = value.to_string();
        } else {
            declarations.push((name, value.to_string()));
        }
    }
    declarations
}

/// Render declarations back into attribute text (`a: b; c: d;`).
pub fn serialize_declarations(declarations: &[(String, String)]) -> String {
    let mut out = String::new();
    for (name, value) in declarations {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push(';');
    }
    out
}

/// Canonical form used for equality checks between two style attributes.
pub fn normalize(text: &str) -> String {
    serialize_declarations(&parse_declarations(text))
}

fn split_outside_quotes(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declarations() {
        let decls = parse_declarations("Font-Weight: bold; color:red;;");
        assert_eq!(
            decls,
            vec![
                ("font-weight".to_string(), "bold".to_string()),
                ("color".to_string(), "red".to_string()),
            ]
        );
    }

    #[test]
    fn test_quoted_semicolon_is_kept() {
        let decls = parse_declarations(r#"font-family: "a;b", serif"#);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].1, r#""a;b", serif"#);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("color:red;  text-align :center"), "color: red; text-align: center;");
        assert_eq!(normalize(""), "");
    }
}
