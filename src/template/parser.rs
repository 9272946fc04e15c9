//! Parse template tokens into a flat list of text and action nodes.

use super::lexer::{self, Token, TokenKind};
use super::Operation;
use crate::error::TemplateError;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Action(Pipeline),
}

/// Commands joined by `|`; each command's result is passed as the final
/// argument of the next.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

/// A callee followed by its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Dot,
    Field(Vec<String>),
    Function(Operation),
    Str(String),
    Int(i64),
    Pipeline(Pipeline),
}

/// Parse a template source into nodes.
pub fn parse(src: &str) -> Result<Vec<Node>, TemplateError> {
    let tokens = lexer::lex(src)?;
    Parser {
        src,
        tokens,
        pos: 0,
    }
    .parse_template()
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn parse_template(mut self) -> Result<Vec<Node>, TemplateError> {
        let mut nodes = Vec::new();

        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Text(text) => nodes.push(Node::Text(text)),
                TokenKind::LeftDelim => {
                    let pipeline = self.parse_pipeline(token.pos, &TokenKind::RightDelim)?;
                    nodes.push(Node::Action(pipeline));
                }
                other => {
                    return Err(self.error(token.pos, &format!("unexpected {other:?}")));
                }
            }
        }

        Ok(nodes)
    }

    /// Parse commands up to and including the `end` token.
    fn parse_pipeline(&mut self, start: usize, end: &TokenKind) -> Result<Pipeline, TemplateError> {
        let mut commands = Vec::new();
        let mut operands = Vec::new();

        loop {
            let Some(token) = self.next() else {
                return Err(self.error(start, "unexpected end of template in action"));
            };

            match token.kind {
                ref kind if kind == end => {
                    if operands.is_empty() {
                        let message = if commands.is_empty() {
                            "missing value for command"
                        } else {
                            "missing command after '|'"
                        };
                        return Err(self.error(token.pos, message));
                    }
                    commands.push(Command { operands });
                    return Ok(Pipeline { commands });
                }
                TokenKind::Pipe => {
                    if operands.is_empty() {
                        return Err(self.error(token.pos, "missing command before '|'"));
                    }
                    commands.push(Command {
                        operands: std::mem::take(&mut operands),
                    });
                }
                TokenKind::Dot => operands.push(Operand::Dot),
                TokenKind::Field(chain) => operands.push(Operand::Field(chain)),
                TokenKind::Identifier(name) => match Operation::from_name(&name) {
                    Some(op) => operands.push(Operand::Function(op)),
                    None => {
                        return Err(
                            self.error(token.pos, &format!("function {name:?} not defined"))
                        );
                    }
                },
                TokenKind::String(value) => operands.push(Operand::Str(value)),
                TokenKind::Number(value) => operands.push(Operand::Int(value)),
                TokenKind::LeftParen => {
                    let inner = self.parse_pipeline(token.pos, &TokenKind::RightParen)?;
                    operands.push(Operand::Pipeline(inner));
                }
                other => {
                    return Err(self.error(token.pos, &format!("unexpected {other:?} in action")));
                }
            }
        }
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, offset: usize, message: &str) -> TemplateError {
        let (line, column) = lexer::line_col(self.src, offset);
        TemplateError::Parse {
            line,
            column,
            message: message.to_string(),
        }
    }
}
