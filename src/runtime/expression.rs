//! Expression language for run-time property values
//!
//! Terms are string literals, number literals, or state names, joined by `+`.
//! Two reals add; any other pairing concatenates display forms.

use std::fmt;

use super::error::{ExpressionError, ExpressionResult};
use super::state::{StateStore, StateValue};

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Text(String),
    Number(f64),
    State(String),
}

impl Expression {
    /// Parse expression text
    pub fn parse(source: &str) -> ExpressionResult<Self> {
        let mut parser = Parser {
            src: source,
            pos: 0,
        };
        parser.skip_ws();
        if parser.at_end() {
            return Err(ExpressionError::Empty);
        }

        let mut terms = vec![parser.term()?];
        loop {
            parser.skip_ws();
            if parser.at_end() {
                break;
            }
            parser.expect('+')?;
            parser.skip_ws();
            terms.push(parser.term()?);
        }

        Ok(Self {
            source: source.to_string(),
            terms,
        })
    }

    /// Expression text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// State names referenced by this expression
    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(|t| match t {
            Term::State(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Evaluate against the current state values
    pub fn evaluate(&self, states: &StateStore) -> ExpressionResult<StateValue> {
        let mut terms = self.terms.iter();
        let mut acc = match terms.next() {
            Some(term) => term.value(states)?,
            None => return Err(ExpressionError::Empty),
        };
        for term in terms {
            let rhs = term.value(states)?;
            acc = match (acc, rhs) {
                (StateValue::Real(a), StateValue::Real(b)) => StateValue::Real(a + b),
                (a, b) => StateValue::Text(format!("{}{}", a, b)),
            };
        }
        Ok(acc)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Term {
    fn value(&self, states: &StateStore) -> ExpressionResult<StateValue> {
        match self {
            Term::Text(s) => Ok(StateValue::Text(s.clone())),
            Term::Number(n) => Ok(StateValue::Real(*n)),
            Term::State(name) => states
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UnknownState(name.clone())),
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, detail: impl Into<String>) -> ExpressionError {
        ExpressionError::Parse {
            position: self.pos,
            detail: detail.into(),
        }
    }

    fn expect(&mut self, want: char) -> ExpressionResult<()> {
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", want, c))),
            None => Err(self.error(format!("expected '{}'", want))),
        }
    }

    fn term(&mut self) -> ExpressionResult<Term> {
        match self.peek() {
            Some('"') => self.string(),
            Some(c) if c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => Ok(self.ident()),
            Some(c) => Err(self.error(format!("unexpected '{}'", c))),
            None => Err(self.error("expected a term")),
        }
    }

    fn string(&mut self) -> ExpressionResult<Term> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Term::Text(out)),
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(ExpressionError::Parse {
            position: start,
            detail: "unterminated string".into(),
        })
    }

    fn number(&mut self) -> ExpressionResult<Term> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error("expected digits after '.'"));
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        self.src[start..self.pos]
            .parse()
            .map(Term::Number)
            .map_err(|_| ExpressionError::Parse {
                position: start,
                detail: "invalid number".into(),
            })
    }

    fn ident(&mut self) -> Term {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            self.bump();
        }
        Term::State(self.src[start..self.pos].to_string())
    }
}
