//! Tokenizer for example templates.
//!
//! Text outside `{{ ... }}` is passed through as a single token. Inside an
//! action the lexer produces operand, paren and pipe tokens until the closing
//! delimiter. Delimiters inside quoted or raw strings do not close the action,
//! which is what lets a `JSONArray` item template be written inline.

use crate::error::TemplateError;

pub(super) const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal text between actions.
    Text(String),
    LeftDelim,
    RightDelim,
    /// A lone `.`, the render context itself.
    Dot,
    /// A field chain such as `.Params.id`, stored without the dots.
    Field(Vec<String>),
    /// A bare function name.
    Identifier(String),
    /// A quoted or raw string literal, escapes already resolved.
    String(String),
    Number(i64),
    LeftParen,
    RightParen,
    Pipe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset into the template source.
    pub pos: usize,
}

/// Tokenize a template.
pub fn lex(src: &str) -> Result<Vec<Token>, TemplateError> {
    Lexer {
        src,
        pos: 0,
        tokens: Vec::new(),
    }
    .run()
}

/// 1-based (line, column) of a byte offset, for error messages.
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let before = &src[..offset.min(src.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    (line, column)
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, TemplateError> {
        let mut trim_leading = false;

        while self.pos < self.src.len() {
            let rest = self.rest();
            let open = rest.find(LEFT_DELIM);
            let raw_text = open.map_or(rest, |i| &rest[..i]);

            // `{{- ` trims whitespace before the action
            let trim_trailing = open.is_some_and(|i| is_left_trim(&rest[i + LEFT_DELIM.len()..]));

            let mut text = raw_text;
            if trim_leading {
                text = text.trim_start();
            }
            if trim_trailing {
                text = text.trim_end();
            }
            if !text.is_empty() {
                self.push(TokenKind::Text(text.to_string()), self.pos);
            }

            let Some(open) = open else {
                break;
            };

            let delim_pos = self.pos + open;
            self.pos = delim_pos + LEFT_DELIM.len();
            if trim_trailing {
                self.pos += 1;
            }
            self.push(TokenKind::LeftDelim, delim_pos);
            trim_leading = self.lex_action(delim_pos)?;
        }

        Ok(self.tokens)
    }

    /// Lex the inside of one action. Returns whether it ended with `-}}`.
    fn lex_action(&mut self, start: usize) -> Result<bool, TemplateError> {
        self.skip_whitespace();
        if self.rest().starts_with("/*") {
            return self.lex_comment(start);
        }

        loop {
            let had_space = self.skip_whitespace();
            let rest = self.rest();

            if had_space && rest.starts_with("-}}") {
                self.pos += 3;
                self.push(TokenKind::RightDelim, self.pos - 2);
                return Ok(true);
            }
            if rest.starts_with(RIGHT_DELIM) {
                self.push(TokenKind::RightDelim, self.pos);
                self.pos += RIGHT_DELIM.len();
                return Ok(false);
            }

            let Some(ch) = rest.chars().next() else {
                return Err(self.error(start, "unclosed action"));
            };
            let token_start = self.pos;

            match ch {
                '.' => self.lex_field()?,
                '"' => self.lex_quoted()?,
                '`' => self.lex_raw()?,
                '(' => {
                    self.pos += 1;
                    self.push(TokenKind::LeftParen, token_start);
                }
                ')' => {
                    self.pos += 1;
                    self.push(TokenKind::RightParen, token_start);
                }
                '|' => {
                    self.pos += 1;
                    self.push(TokenKind::Pipe, token_start);
                }
                c if c == '-' || c.is_ascii_digit() => self.lex_number()?,
                c if is_ident_char(c) => {
                    let name = self.take_ident();
                    self.push(TokenKind::Identifier(name), token_start);
                }
                c => {
                    return Err(self.error(token_start, &format!("unexpected {c:?} in action")));
                }
            }
        }
    }

    fn lex_comment(&mut self, start: usize) -> Result<bool, TemplateError> {
        let Some(end) = self.rest().find("*/") else {
            return Err(self.error(start, "unclosed comment"));
        };
        self.pos += end + 2;

        // Comments produce no tokens, so drop the opening delimiter too.
        self.tokens.pop();

        let had_space = self.skip_whitespace();
        if had_space && self.rest().starts_with("-}}") {
            self.pos += 3;
            return Ok(true);
        }
        if self.rest().starts_with(RIGHT_DELIM) {
            self.pos += RIGHT_DELIM.len();
            return Ok(false);
        }
        Err(self.error(start, "comment ends before closing delimiter"))
    }

    fn lex_field(&mut self) -> Result<(), TemplateError> {
        let start = self.pos;
        let mut chain = Vec::new();

        while self.rest().starts_with('.') {
            let after_dot = self.rest()[1..].chars().next();
            if !after_dot.is_some_and(is_ident_char) {
                break;
            }
            self.pos += 1;
            chain.push(self.take_ident());
        }

        if chain.is_empty() {
            self.pos += 1;
            match self.rest().chars().next() {
                None => {}
                Some(c) if c.is_whitespace() || c == ')' || c == '}' || c == '|' => {}
                Some(c) => {
                    return Err(self.error(start, &format!("bad character {c:?} after '.'")));
                }
            }
            self.push(TokenKind::Dot, start);
        } else {
            self.push(TokenKind::Field(chain), start);
        }
        Ok(())
    }

    fn lex_quoted(&mut self) -> Result<(), TemplateError> {
        let src = self.src;
        let start = self.pos;
        let mut value = String::new();
        let mut chars = src[start + 1..].char_indices();

        loop {
            let Some((offset, ch)) = chars.next() else {
                return Err(self.error(start, "unterminated quoted string"));
            };
            match ch {
                '"' => {
                    self.pos = start + 1 + offset + 1;
                    break;
                }
                '\n' => return Err(self.error(start, "unterminated quoted string")),
                '\\' => {
                    let escaped = match chars.next() {
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((_, 'r')) => '\r',
                        Some((_, '\\')) => '\\',
                        Some((_, '"')) => '"',
                        Some((_, '\'')) => '\'',
                        Some((_, 'u')) => {
                            let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                            u32::from_str_radix(&hex, 16)
                                .ok()
                                .filter(|_| hex.len() == 4)
                                .and_then(char::from_u32)
                                .ok_or_else(|| self.error(start, "invalid \\u escape"))?
                        }
                        Some((_, other)) => {
                            return Err(
                                self.error(start, &format!("unknown escape sequence \\{other}"))
                            );
                        }
                        None => return Err(self.error(start, "unterminated quoted string")),
                    };
                    value.push(escaped);
                }
                c => value.push(c),
            }
        }

        self.push(TokenKind::String(value), start);
        Ok(())
    }

    fn lex_raw(&mut self) -> Result<(), TemplateError> {
        let src = self.src;
        let start = self.pos;
        let Some(len) = src[start + 1..].find('`') else {
            return Err(self.error(start, "unterminated raw string"));
        };
        let value = src[start + 1..start + 1 + len].to_string();
        self.pos = start + 1 + len + 1;
        self.push(TokenKind::String(value), start);
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), TemplateError> {
        let start = self.pos;
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let digits = rest[sign..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len() - sign);

        if digits == 0 {
            return Err(self.error(start, "bad number syntax"));
        }
        let literal = &rest[..sign + digits];
        if rest[sign + digits..].chars().next().is_some_and(is_ident_char) {
            return Err(self.error(start, &format!("bad number syntax: {literal:?}")));
        }

        let value = literal
            .parse::<i64>()
            .map_err(|e| self.error(start, &format!("bad number {literal:?}: {e}")))?;
        self.pos += literal.len();
        self.push(TokenKind::Number(value), start);
        Ok(())
    }

    fn take_ident(&mut self) -> String {
        let rest = self.rest();
        let len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }

    /// Skip whitespace, returning whether any was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
        rest.len() != trimmed.len()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn push(&mut self, kind: TokenKind, pos: usize) {
        self.tokens.push(Token { kind, pos });
    }

    fn error(&self, offset: usize, message: &str) -> TemplateError {
        let (line, column) = line_col(self.src, offset);
        TemplateError::Parse {
            line,
            column,
            message: message.to_string(),
        }
    }
}

fn is_left_trim(after_delim: &str) -> bool {
    let mut chars = after_delim.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            kinds(r#"{"id": 1}"#),
            vec![TokenKind::Text(r#"{"id": 1}"#.to_string())]
        );
    }

    #[test]
    fn test_method_call_with_args() {
        assert_eq!(
            kinds(r#"[{{.JSONArray .ItemCount "x"}}]"#),
            vec![
                TokenKind::Text("[".to_string()),
                TokenKind::LeftDelim,
                TokenKind::Field(vec!["JSONArray".to_string()]),
                TokenKind::Field(vec!["ItemCount".to_string()]),
                TokenKind::String("x".to_string()),
                TokenKind::RightDelim,
                TokenKind::Text("]".to_string()),
            ]
        );
    }

    #[test]
    fn test_field_chain_and_dot() {
        assert_eq!(
            kinds("{{.Params.id}}{{.}}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Field(vec!["Params".to_string(), "id".to_string()]),
                TokenKind::RightDelim,
                TokenKind::LeftDelim,
                TokenKind::Dot,
                TokenKind::RightDelim,
            ]
        );
    }

    #[test]
    fn test_delimiters_inside_strings() {
        let tokens = kinds(r#"{{.JSONArray 2 "{\"n\":{{.Index}}}"}}"#);
        assert_eq!(tokens[3], TokenKind::String(r#"{"n":{{.Index}}}"#.to_string()));
        assert_eq!(tokens.len(), 5);

        let tokens = kinds("{{.JSONArray 2 `{\"n\":{{.Index}}}`}}");
        assert_eq!(tokens[3], TokenKind::String(r#"{"n":{{.Index}}}"#.to_string()));
    }

    #[test]
    fn test_trim_markers() {
        assert_eq!(
            kinds("a  {{- 1 -}}  b"),
            vec![
                TokenKind::Text("a".to_string()),
                TokenKind::LeftDelim,
                TokenKind::Number(1),
                TokenKind::RightDelim,
                TokenKind::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_number() {
        assert_eq!(
            kinds("{{-3}}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Number(-3),
                TokenKind::RightDelim,
            ]
        );
    }

    #[test]
    fn test_comment_is_dropped() {
        assert_eq!(
            kinds("a{{/* note */}}b"),
            vec![
                TokenKind::Text("a".to_string()),
                TokenKind::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_unclosed_action() {
        let err = lex("line one\n  {{.Index").unwrap_err();
        match err {
            TemplateError::Parse { line, column, .. } => {
                assert_eq!((line, column), (2, 3));
            }
            other => panic!("Expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_string() {
        assert!(lex(r#"{{"abc}}"#).is_err());
    }
}
