//! Structural editing of JSON-with-comments documents (settings, key bindings).
//!
//! Edits operate on a token stream over the original text, so comments,
//! trailing commas and formatting outside the touched properties survive
//! byte for byte. Only properties of the top-level object are addressable.

use crate::error::JsoncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    String,
    Literal,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Colon,
    Comma,
}

impl TokenKind {
    fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    fn is_comment(self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'\t' | b'\n' | b'\r' | b'{' | b'}' | b'[' | b']' | b':' | b',' | b'"' | b'/'
    )
}

fn tokenize(text: &str) -> Result<Vec<Token>, JsoncError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let kind = match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' => {
                while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
                    i += 1;
                }
                TokenKind::Whitespace
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                TokenKind::LineComment
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                loop {
                    if i + 1 >= bytes.len() {
                        return Err(JsoncError::new(start, "unterminated block comment"));
                    }
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                TokenKind::BlockComment
            }
            b'"' => {
                i += 1;
                loop {
                    match bytes.get(i) {
                        None | Some(b'\n') => {
                            return Err(JsoncError::new(start, "unterminated string"))
                        }
                        Some(b'\\') => i += 2,
                        Some(b'"') => {
                            i += 1;
                            break;
                        }
                        Some(_) => i += 1,
                    }
                }
                TokenKind::String
            }
            b'{' => {
                i += 1;
                TokenKind::OpenBrace
            }
            b'}' => {
                i += 1;
                TokenKind::CloseBrace
            }
            b'[' => {
                i += 1;
                TokenKind::OpenBracket
            }
            b']' => {
                i += 1;
                TokenKind::CloseBracket
            }
            b':' => {
                i += 1;
                TokenKind::Colon
            }
            b',' => {
                i += 1;
                TokenKind::Comma
            }
            b'/' => return Err(JsoncError::new(start, "unexpected '/'")),
            _ => {
                while i < bytes.len() && !is_delimiter(bytes[i]) {
                    i += 1;
                }
                TokenKind::Literal
            }
        };
        tokens.push(Token {
            kind,
            start,
            end: i,
        });
    }
    Ok(tokens)
}

/// A top-level property located in the source text.
#[derive(Debug, Clone)]
struct Property {
    key: String,
    key_start: usize,
    value_start: usize,
    value_end: usize,
    /// Byte range of the comma following the value, if any.
    comma: Option<(usize, usize)>,
}

struct Document {
    open_end: usize,
    close_start: usize,
    properties: Vec<Property>,
}

struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    /// Next significant (non-trivia) token.
    fn next(&mut self) -> Option<Token> {
        while let Some(tok) = self.tokens.get(self.pos) {
            self.pos += 1;
            if !tok.kind.is_trivia() {
                return Some(*tok);
            }
        }
        None
    }
}

fn parse(text: &str) -> Result<Document, JsoncError> {
    let tokens = tokenize(text)?;
    let mut cur = Cursor {
        tokens: &tokens,
        pos: 0,
    };

    let open = match cur.next() {
        Some(tok) if tok.kind == TokenKind::OpenBrace => tok,
        Some(tok) => return Err(JsoncError::new(tok.start, "expected top-level object")),
        None => return Err(JsoncError::new(0, "empty document")),
    };

    let mut properties = Vec::new();
    let close_start = loop {
        let tok = cur
            .next()
            .ok_or_else(|| JsoncError::new(text.len(), "unterminated object"))?;
        match tok.kind {
            TokenKind::CloseBrace => break tok.start,
            TokenKind::String => {}
            _ => return Err(JsoncError::new(tok.start, "expected property name")),
        }
        let key: String = serde_json::from_str(&text[tok.start..tok.end])
            .map_err(|e| JsoncError::new(tok.start, format!("invalid property name: {e}")))?;

        match cur.next() {
            Some(t) if t.kind == TokenKind::Colon => {}
            Some(t) => return Err(JsoncError::new(t.start, "expected ':'")),
            None => return Err(JsoncError::new(text.len(), "expected ':'")),
        }

        let (value_start, value_end, terminator) = scan_value(text, &mut cur)?;
        let mut prop = Property {
            key,
            key_start: tok.start,
            value_start,
            value_end,
            comma: None,
        };
        if terminator.kind == TokenKind::Comma {
            prop.comma = Some((terminator.start, terminator.end));
            properties.push(prop);
        } else {
            properties.push(prop);
            break terminator.start;
        }
    };

    if let Some(extra) = cur.next() {
        return Err(JsoncError::new(extra.start, "unexpected content after object"));
    }

    Ok(Document {
        open_end: open.end,
        close_start,
        properties,
    })
}

/// Consume one value; returns its span and the `,` or `}` that ended it.
fn scan_value(text: &str, cur: &mut Cursor<'_>) -> Result<(usize, usize, Token), JsoncError> {
    let first = cur
        .next()
        .ok_or_else(|| JsoncError::new(text.len(), "expected value"))?;
    match first.kind {
        TokenKind::String | TokenKind::Literal | TokenKind::OpenBrace | TokenKind::OpenBracket => {}
        _ => return Err(JsoncError::new(first.start, "expected value")),
    }

    let mut depth: usize = 0;
    let mut last_end = first.end;
    let mut tok = first;
    loop {
        match tok.kind {
            TokenKind::OpenBrace | TokenKind::OpenBracket => depth += 1,
            TokenKind::CloseBrace | TokenKind::CloseBracket => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| JsoncError::new(tok.start, "unbalanced brackets"))?;
            }
            _ => {}
        }
        last_end = tok.end;
        tok = cur
            .next()
            .ok_or_else(|| JsoncError::new(text.len(), "unterminated value"))?;
        if depth == 0 && matches!(tok.kind, TokenKind::Comma | TokenKind::CloseBrace) {
            return Ok((first.start, last_end, tok));
        }
    }
}

fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Index just past the newline ending the line that contains `pos`.
fn line_end(text: &str, pos: usize) -> usize {
    text[pos..].find('\n').map(|i| pos + i + 1).unwrap_or(text.len())
}

fn is_blank(s: &str) -> bool {
    s.bytes().all(|b| b == b' ' || b == b'\t' || b == b'\r' || b == b'\n')
}

/// Span to delete for a removed property. Takes whole lines when nothing
/// else shares them; a trailing `//` comment goes with the property.
fn property_range(text: &str, start: usize, end: usize) -> (usize, usize) {
    let ls = line_start(text, start);
    let start = if is_blank(&text[ls..start]) { ls } else { start };
    let eol = line_end(text, end);
    let rest = text[end..eol].trim_start_matches([' ', '\t']);
    let end = if is_blank(rest) || rest.starts_with("//") {
        eol
    } else {
        end
    };
    (start, end)
}

/// Span to delete for a comment token.
fn comment_range(text: &str, start: usize, end: usize) -> (usize, usize) {
    let ls = line_start(text, start);
    let eol = line_end(text, end);
    if is_blank(&text[ls..start]) && is_blank(&text[end..eol]) {
        return (ls, eol);
    }
    let trimmed = text[..start].trim_end_matches([' ', '\t']).len();
    (trimmed, end)
}

fn splice(text: &str, mut ranges: Vec<(usize, usize)>) -> String {
    ranges.sort_unstable();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for (start, end) in ranges {
        if start < pos {
            continue;
        }
        out.push_str(&text[pos..start]);
        pos = end;
    }
    out.push_str(&text[pos..]);
    out
}

// ── Public API ──

/// Accept a possibly empty or commented document; blank input becomes `{}`.
pub fn normalize(text: &str) -> Result<String, JsoncError> {
    if text.trim().is_empty() {
        return Ok("{}\n".to_string());
    }
    parse(text)?;
    Ok(text.to_string())
}

/// Names of all top-level properties, in document order.
pub fn property_keys(text: &str) -> Result<Vec<String>, JsoncError> {
    Ok(parse(text)?.properties.into_iter().map(|p| p.key).collect())
}

/// Raw source text of every top-level property whose key matches.
pub fn extract_properties<F>(text: &str, matches: F) -> Result<Vec<(String, String)>, JsoncError>
where
    F: Fn(&str) -> bool,
{
    let doc = parse(text)?;
    Ok(doc
        .properties
        .into_iter()
        .filter(|p| matches(&p.key))
        .map(|p| {
            let raw = text[p.value_start..p.value_end].to_string();
            (p.key, raw)
        })
        .collect())
}

/// Remove every top-level property whose key matches.
pub fn remove_properties<F>(text: &str, matches: F) -> Result<String, JsoncError>
where
    F: Fn(&str) -> bool,
{
    let doc = parse(text)?;
    let removed: Vec<bool> = doc.properties.iter().map(|p| matches(&p.key)).collect();
    if !removed.iter().any(|r| *r) {
        return Ok(text.to_string());
    }

    // A removed tail without a trailing comma takes the last kept property's
    // comma with it, so no dangling comma is left behind. When the tail
    // shares that property's line it is cut as one span.
    let n = doc.properties.len();
    let tail_from = removed.iter().rposition(|r| !*r).map(|i| i + 1).unwrap_or(0);
    let trailing_comma = doc.properties[n - 1].comma.is_some();
    let collapse_tail = tail_from < n && !trailing_comma;

    let mut ranges = Vec::new();
    let mut cut_tail = false;
    if collapse_tail {
        let tail_end = doc.properties[n - 1].value_end;
        match tail_from.checked_sub(1).map(|i| &doc.properties[i]) {
            None => {
                ranges.push((doc.open_end, tail_end));
                cut_tail = true;
            }
            Some(kept) => {
                let (comma_start, comma_end) =
                    kept.comma.unwrap_or((kept.value_end, kept.value_end));
                let first_key = doc.properties[tail_from].key_start;
                if text[comma_end..first_key].contains('\n') {
                    ranges.push((comma_start, comma_end));
                } else {
                    ranges.push((comma_start, tail_end));
                    cut_tail = true;
                }
            }
        }
    }
    for (i, prop) in doc.properties.iter().enumerate() {
        if !removed[i] || (cut_tail && i >= tail_from) {
            continue;
        }
        let end = prop.comma.map(|(_, e)| e).unwrap_or(prop.value_end);
        ranges.push(property_range(text, prop.key_start, end));
    }

    Ok(splice(text, ranges))
}

/// Replace the values of existing properties and append missing ones.
/// Values are raw JSON source text.
pub fn upsert_properties(text: &str, props: &[(String, String)]) -> Result<String, JsoncError> {
    let mut out = normalize(text)?;
    for (key, raw) in props {
        out = upsert_one(&out, key, raw)?;
    }
    Ok(out)
}

fn upsert_one(text: &str, key: &str, raw: &str) -> Result<String, JsoncError> {
    let doc = parse(text)?;
    if let Some(p) = doc.properties.iter().find(|p| p.key == key) {
        return Ok(format!(
            "{}{}{}",
            &text[..p.value_start],
            raw,
            &text[p.value_end..]
        ));
    }

    let indent = doc
        .properties
        .first()
        .map(|p| &text[line_start(text, p.key_start)..p.key_start])
        .filter(|prefix| is_blank(prefix) && !prefix.is_empty())
        .unwrap_or("    ");
    let key_json = serde_json::to_string(key)
        .map_err(|e| JsoncError::new(0, format!("cannot encode key: {e}")))?;
    let entry = format!("{indent}{key_json}: {raw}");

    let Some(last) = doc.properties.last() else {
        let inner = &text[doc.open_end..doc.close_start];
        let tail = if inner.contains('\n') { "" } else { "\n" };
        let at = doc.open_end;
        return Ok(format!("{}\n{entry}{tail}{}", &text[..at], &text[at..]));
    };

    let comma = if last.comma.is_some() { "" } else { "," };
    let after = last.comma.map(|(_, e)| e).unwrap_or(last.value_end);
    let eol = line_end(text, after);
    let rest = text[after..eol].trim_start_matches([' ', '\t']);
    let ends_line = text[..eol].ends_with('\n') && (is_blank(rest) || rest.starts_with("//"));
    if ends_line {
        // New entry goes on its own line, below any trailing line comment.
        Ok(format!(
            "{}{comma}{}{entry}\n{}",
            &text[..last.value_end],
            &text[last.value_end..eol],
            &text[eol..]
        ))
    } else {
        Ok(format!("{}{comma}\n{entry}{}", &text[..after], &text[after..]))
    }
}

/// Drop all comments, collapsing lines that held nothing else.
pub fn strip_comments(text: &str) -> Result<String, JsoncError> {
    let tokens = tokenize(text)?;
    let ranges = tokens
        .iter()
        .filter(|t| t.kind.is_comment())
        .map(|t| comment_range(text, t.start, t.end))
        .collect();
    Ok(splice(text, ranges))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = r#"{
    // Editor appearance
    "editor.fontSize": 14,
    "window.zoomLevel": 1, // host specific
    "files.exclude": {
        "**/.git": true,
    },
    /* trailing block */
    "terminal.integrated.shell.linux": "/bin/zsh"
}
"#;

    #[test]
    fn keys_in_document_order() {
        let keys = property_keys(SETTINGS).unwrap();
        assert_eq!(
            keys,
            vec![
                "editor.fontSize",
                "window.zoomLevel",
                "files.exclude",
                "terminal.integrated.shell.linux"
            ]
        );
    }

    #[test]
    fn extract_returns_raw_value_text() {
        let props = extract_properties(SETTINGS, |k| k == "files.exclude").unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].1, "{\n        \"**/.git\": true,\n    }");
    }

    #[test]
    fn remove_middle_property_keeps_comments() {
        let out = remove_properties(SETTINGS, |k| k == "window.zoomLevel").unwrap();
        assert!(!out.contains("zoomLevel"));
        assert!(out.contains("// Editor appearance"));
        assert!(out.contains("\"editor.fontSize\": 14,\n    \"files.exclude\""));
        assert_eq!(property_keys(&out).unwrap().len(), 3);
    }

    #[test]
    fn remove_last_property_drops_dangling_comma() {
        let out = remove_properties(r#"{"a": 1, "b": 2}"#, |k| k == "b").unwrap();
        assert_eq!(out, r#"{"a": 1}"#);
        let out = remove_properties(r#"{"a": 1, "b": 2}"#, |k| k == "a" || k == "b").unwrap();
        assert_eq!(out, "{}");
        let out = remove_properties("{\n    \"a\": 1,\n    \"b\": 2\n}\n", |k| k == "b").unwrap();
        assert_eq!(out, "{\n    \"a\": 1\n}\n");
    }

    #[test]
    fn remove_last_property_keeps_comment_on_kept_line() {
        let text = "{\n    \"a\": 1, // keep me\n    \"b\": 2\n}\n";
        let out = remove_properties(text, |k| k == "b").unwrap();
        assert_eq!(out, "{\n    \"a\": 1 // keep me\n}\n");
        assert_eq!(property_keys(&out).unwrap(), vec!["a"]);

        let text = "{\n    \"a\": 1, /* note */\n    \"b\": 2, // gone\n    \"c\": 3\n}";
        let out = remove_properties(text, |k| k != "a").unwrap();
        assert_eq!(out, "{\n    \"a\": 1 /* note */\n}");
    }

    #[test]
    fn remove_without_match_is_identity() {
        let out = remove_properties(SETTINGS, |_| false).unwrap();
        assert_eq!(out, SETTINGS);
    }

    #[test]
    fn upsert_replaces_existing_value_in_place() {
        let out = upsert_properties(SETTINGS, &[("editor.fontSize".into(), "16".into())]).unwrap();
        assert!(out.contains("\"editor.fontSize\": 16,"));
        assert!(out.contains("// Editor appearance"));
    }

    #[test]
    fn upsert_appends_with_detected_indent() {
        let out = upsert_properties(SETTINGS, &[("window.zoomLevel".into(), "2".into())]).unwrap();
        assert!(out.contains("\"window.zoomLevel\": 2,"));
        let out = upsert_properties(
            "{\n\t\"a\": 1\n}\n",
            &[("b".into(), "[1, 2]".into())],
        )
        .unwrap();
        assert_eq!(out, "{\n\t\"a\": 1,\n\t\"b\": [1, 2]\n}\n");
    }

    #[test]
    fn upsert_appends_below_trailing_line_comment() {
        let out = upsert_properties("{\n    \"a\": 1, // c\n}\n", &[("b".into(), "2".into())]).unwrap();
        assert_eq!(out, "{\n    \"a\": 1, // c\n    \"b\": 2\n}\n");
        let out = upsert_properties("{\n    \"a\": 1 // c\n}\n", &[("b".into(), "2".into())]).unwrap();
        assert_eq!(out, "{\n    \"a\": 1, // c\n    \"b\": 2\n}\n");
    }

    #[test]
    fn upsert_into_empty_documents() {
        let out = upsert_properties("", &[("a".into(), "true".into())]).unwrap();
        assert_eq!(out, "{\n    \"a\": true\n}\n");
        let out = upsert_properties("{}", &[("a".into(), "true".into())]).unwrap();
        assert_eq!(out, "{\n    \"a\": true\n}");
    }

    #[test]
    fn strip_comments_removes_line_and_block_comments() {
        let out = strip_comments(SETTINGS).unwrap();
        assert!(!out.contains("//"));
        assert!(!out.contains("/*"));
        assert!(out.contains("\"window.zoomLevel\": 1,\n"));
        assert!(out.contains("\"**/.git\": true"));
        assert_eq!(property_keys(&out).unwrap().len(), 4);
    }

    #[test]
    fn comment_markers_inside_strings_are_not_comments() {
        let text = r#"{"url": "http://example.com/*x*/"}"#;
        assert_eq!(strip_comments(text).unwrap(), text);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(normalize("[1, 2]").is_err());
        assert!(normalize("{\"a\": 1").is_err());
        assert!(normalize("{\"a\" 1}").is_err());
        assert!(normalize("{\"a\": \"open}").is_err());
        assert!(normalize("{} {}").is_err());
        assert_eq!(normalize("  \n").unwrap(), "{}\n");
    }
}
