//! Builds the node tree for a template
//!
//! Function names are resolved and arity-checked here, so a compiled
//! template never fails on an unknown function at render time.

use super::functions::{FunctionRegistry, TemplateFunction};
use super::lexer::{tokenize, Token};

/// Parse failure: line and message
pub(crate) type ParseError = (usize, String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    If,
    Unless,
    Each,
}

impl BlockKind {
    fn keyword(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::Unless => "unless",
            BlockKind::Each => "each",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "if" => Some(BlockKind::If),
            "unless" => Some(BlockKind::Unless),
            "each" => Some(BlockKind::Each),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Term {
    Key(String),
    /// `.` or `this`
    Current,
    /// `@index`
    Index,
    Literal(String),
}

#[derive(Debug, Clone)]
pub(crate) enum Command {
    Value(Term),
    Call {
        func: TemplateFunction,
        args: Vec<Term>,
    },
}

/// Commands separated by `|`; each stage after the first receives the
/// previous result as its last argument
#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    pub stages: Vec<Command>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Output(Pipeline),
    Image { key: String, line: usize },
    Conditional {
        negate: bool,
        cond: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Each {
        source: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

enum Terminator {
    Eof,
    Else(usize),
    Close(BlockKind, usize),
}

pub(crate) fn parse(src: &str, registry: &FunctionRegistry) -> Result<Vec<Node>, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        registry,
    };
    let (nodes, end) = parser.parse_until()?;
    match end {
        Terminator::Eof => Ok(nodes),
        Terminator::Else(line) => Err((line, "{{else}} outside a block".to_string())),
        Terminator::Close(kind, line) => Err((
            line,
            format!("unexpected {{{{/{}}}}} without an opening block", kind.keyword()),
        )),
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    registry: &'a FunctionRegistry,
}

impl<'a> Parser<'a> {
    fn parse_until(&mut self) -> Result<(Vec<Node>, Terminator), ParseError> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.get(self.pos).cloned() {
            self.pos += 1;
            let (body, line) = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text.to_string()));
                    continue;
                }
                Token::Comment { .. } => continue,
                Token::Tag { body, line } => (body.trim(), line),
            };

            if body.is_empty() {
                return Err((line, "empty tag".to_string()));
            }
            if body == "else" {
                return Ok((nodes, Terminator::Else(line)));
            }
            if let Some(name) = body.strip_prefix('/') {
                let kind = BlockKind::from_keyword(name.trim())
                    .ok_or_else(|| (line, format!("unknown closing tag '{{{{{}}}}}'", body)))?;
                return Ok((nodes, Terminator::Close(kind, line)));
            }
            if let Some(rest) = body.strip_prefix('#') {
                nodes.push(self.parse_block(rest, line)?);
                continue;
            }
            if let Some(key) = body.strip_prefix("image:") {
                let key = key.trim();
                if key.is_empty() {
                    return Err((line, "image tag without a key".to_string()));
                }
                nodes.push(Node::Image {
                    key: key.to_string(),
                    line,
                });
                continue;
            }

            nodes.push(Node::Output(self.parse_pipeline(body, line)?));
        }

        Ok((nodes, Terminator::Eof))
    }

    fn parse_block(&mut self, header: &str, line: usize) -> Result<Node, ParseError> {
        let (keyword, expr) = header
            .split_once(char::is_whitespace)
            .unwrap_or((header, ""));
        let kind = BlockKind::from_keyword(keyword)
            .ok_or_else(|| (line, format!("unknown block '#{}'", keyword)))?;
        let expr = expr.trim();
        if expr.is_empty() {
            return Err((line, format!("{{{{#{}}}}} needs an argument", keyword)));
        }
        let pipeline = self.parse_pipeline(expr, line)?;

        let (body, end) = self.parse_until()?;
        let otherwise = match end {
            Terminator::Close(k, _) if k == kind => Vec::new(),
            Terminator::Else(_) => {
                let (otherwise, end) = self.parse_until()?;
                match end {
                    Terminator::Close(k, _) if k == kind => otherwise,
                    Terminator::Else(l) => {
                        return Err((l, format!("duplicate {{{{else}}}} in {{{{#{}}}}}", keyword)))
                    }
                    other => return Err(self.unclosed(kind, line, other)),
                }
            }
            other => return Err(self.unclosed(kind, line, other)),
        };

        Ok(match kind {
            BlockKind::If | BlockKind::Unless => Node::Conditional {
                negate: kind == BlockKind::Unless,
                cond: pipeline,
                then: body,
                otherwise,
            },
            BlockKind::Each => Node::Each {
                source: pipeline,
                body,
                otherwise,
            },
        })
    }

    fn unclosed(&self, kind: BlockKind, opened: usize, end: Terminator) -> ParseError {
        match end {
            Terminator::Close(found, line) => (
                line,
                format!(
                    "expected {{{{/{}}}}} but found {{{{/{}}}}}",
                    kind.keyword(),
                    found.keyword()
                ),
            ),
            _ => (
                opened,
                format!("unclosed {{{{#{}}}}} block", kind.keyword()),
            ),
        }
    }

    fn parse_pipeline(&self, expr: &str, line: usize) -> Result<Pipeline, ParseError> {
        let words = split_words(expr).map_err(|msg| (line, msg))?;
        let mut stages = Vec::new();

        for (i, group) in words.split(|w| matches!(w, Word::Pipe)).enumerate() {
            if group.is_empty() {
                return Err((line, "empty pipeline stage".to_string()));
            }
            let piped = i > 0;
            let command = self.parse_command(group, piped, line)?;
            if piped && matches!(command, Command::Value(_)) {
                return Err((line, "only a function can follow '|'".to_string()));
            }
            stages.push(command);
        }

        Ok(Pipeline { stages, line })
    }

    fn parse_command(&self, words: &[Word], piped: bool, line: usize) -> Result<Command, ParseError> {
        let (head, rest) = words
            .split_first()
            .ok_or_else(|| (line, "empty expression".to_string()))?;

        if let Word::Bare(name) = head {
            if let Some(func) = self.registry.get(name) {
                let args = rest
                    .iter()
                    .map(|w| term(w, line))
                    .collect::<Result<Vec<_>, _>>()?;
                let count = args.len() + usize::from(piped);
                if !func.arity().accepts(count) {
                    return Err((
                        line,
                        format!(
                            "function '{}' expects {} argument(s), got {}",
                            name,
                            func.arity(),
                            count
                        ),
                    ));
                }
                return Ok(Command::Call {
                    func: func.clone(),
                    args,
                });
            }
            if !rest.is_empty() && is_identifier(name) {
                return Err((line, format!("unknown function '{}'", name)));
            }
        }

        match rest {
            [] => Ok(Command::Value(term(head, line)?)),
            _ => Err((line, "unexpected arguments after a value".to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Word {
    Bare(String),
    Quoted(String),
    Pipe,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn term(word: &Word, line: usize) -> Result<Term, ParseError> {
    match word {
        Word::Quoted(s) => Ok(Term::Literal(s.clone())),
        Word::Pipe => Err((line, "unexpected '|'".to_string())),
        Word::Bare(s) => Ok(match s.as_str() {
            "." | "this" => Term::Current,
            "@index" => Term::Index,
            _ => {
                let key = s.strip_prefix('.').unwrap_or(s);
                if key.is_empty() || key.starts_with('.') {
                    return Err((line, format!("invalid key '{}'", s)));
                }
                Term::Key(key.to_string())
            }
        }),
    }
}

fn split_words(expr: &str) -> Result<Vec<Word>, String> {
    let mut words = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '|' {
            chars.next();
            words.push(Word::Pipe);
        } else if c == '"' || c == '\'' {
            chars.next();
            let mut lit = String::new();
            let mut closed = false;
            while let Some(ch) = chars.next() {
                match ch {
                    '\\' => match chars.next() {
                        Some('n') => lit.push('\n'),
                        Some('t') => lit.push('\t'),
                        Some(other) => lit.push(other),
                        None => break,
                    },
                    ch if ch == c => {
                        closed = true;
                        break;
                    }
                    ch => lit.push(ch),
                }
            }
            if !closed {
                return Err("unterminated string literal".to_string());
            }
            words.push(Word::Quoted(lit));
        } else {
            let mut bare = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == '|' || ch == '"' || ch == '\'' {
                    break;
                }
                bare.push(ch);
                chars.next();
            }
            words.push(Word::Bare(bare));
        }
    }

    Ok(words)
}
