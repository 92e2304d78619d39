//! Splits template source into literal text and `{{ ... }}` tags

/// A piece of template source
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Text(&'a str),
    /// Tag body without the braces, and the 1-based line it starts on
    Tag { body: &'a str, line: usize },
    /// `{{/* ... */}}`, kept so metadata can be located
    Comment { body: &'a str, line: usize },
}

/// Lexing failure: line and message
pub(crate) type LexError = (usize, String);

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const COMMENT_OPEN: &str = "{{/*";
const COMMENT_CLOSE: &str = "*/}}";

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut tokens = Vec::new();
    let mut rest = src;
    let mut line = 1;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            let text = &rest[..start];
            tokens.push(Token::Text(text));
            line += text.matches('\n').count();
        }
        let tail = &rest[start..];

        if tail.starts_with(COMMENT_OPEN) {
            let end = tail
                .find(COMMENT_CLOSE)
                .ok_or_else(|| (line, "unclosed comment".to_string()))?;
            let body = &tail[COMMENT_OPEN.len()..end];
            tokens.push(Token::Comment { body, line });
            line += body.matches('\n').count();
            rest = &tail[end + COMMENT_CLOSE.len()..];
            continue;
        }

        let end = tail[OPEN.len()..]
            .find(CLOSE)
            .map(|i| i + OPEN.len())
            .ok_or_else(|| (line, "unclosed tag, expected '}}'".to_string()))?;
        let body = &tail[OPEN.len()..end];
        tokens.push(Token::Tag { body, line });
        line += body.matches('\n').count();
        rest = &tail[end + CLOSE.len()..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_tags() {
        let tokens = tokenize("Hi {{.name}}!\n{{upper .x}}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("Hi "),
                Token::Tag { body: ".name", line: 1 },
                Token::Text("!\n"),
                Token::Tag { body: "upper .x", line: 2 },
            ]
        );
    }

    #[test]
    fn test_comment_may_contain_braces() {
        let tokens = tokenize("{{/* a: {{b}} */}}x").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Comment { body: " a: {{b}} ", line: 1 }, Token::Text("x")]
        );
    }

    #[test]
    fn test_unclosed_tag_reports_line() {
        let err = tokenize("a\nb {{ .name").unwrap_err();
        assert_eq!(err.0, 2);
        assert!(err.1.contains("unclosed tag"));
    }

    #[test]
    fn test_no_tags() {
        assert_eq!(tokenize("plain").unwrap(), vec![Token::Text("plain")]);
        assert!(tokenize("").unwrap().is_empty());
    }
}
