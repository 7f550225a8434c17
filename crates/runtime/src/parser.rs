//! Reaction-description parser
//!
//! Turns the line-oriented reaction text into a [`ReactionCatalog`].
//!
//! ```text
//! # citric acid cycle, first step
//! ACETY-COA + OXALOACETATE + H2O -> CITRATE + COA
//! 2 H2O -> H3O + OH @ 0.25
//! catalyst NAD 0.8
//! ```

use std::ops::Range;
use std::path::Path;

use indexmap::IndexMap;
use logos::Logos;
use tracing::debug;

use crate::catalog::{Reaction, ReactionCatalog};
use crate::error::{Error, Result};
use crate::lexer::Token;
use crate::types::Species;

/// Largest stoichiometric coefficient a species may carry on one side
pub const MAX_COEFFICIENT: u64 = 100;

/// Read and parse a reaction description from disk.
pub fn load_reactions(path: impl AsRef<Path>) -> Result<ReactionCatalog> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    let catalog = parse_reactions(&source)?;
    debug!(
        path = %path.display(),
        reactions = catalog.len(),
        species = catalog.species().len(),
        catalysts = catalog.catalysts().len(),
        "reaction description loaded"
    );
    Ok(catalog)
}

/// Parse a reaction description.
pub fn parse_reactions(source: &str) -> Result<ReactionCatalog> {
    let mut catalog = ReactionCatalog::new();
    let mut statement: Vec<(Token, Range<usize>)> = Vec::new();

    let mut lexer = Token::lexer(source);
    while let Some(token) = lexer.next() {
        let span = lexer.span();
        match token {
            Ok(Token::Newline) => {
                let mut cursor = Cursor::new(source, &statement, span.start);
                cursor.statement(&mut catalog)?;
                statement.clear();
            }
            Ok(token) => statement.push((token, span)),
            Err(()) => {
                return Err(parse_error(
                    source,
                    span.start,
                    format!("unexpected character `{}`", &source[span]),
                ));
            }
        }
    }
    let mut cursor = Cursor::new(source, &statement, source.len());
    cursor.statement(&mut catalog)?;

    Ok(catalog)
}

fn parse_error(source: &str, offset: usize, message: String) -> Error {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = offset - before.rfind('\n').map_or(0, |i| i + 1) + 1;
    Error::Parse {
        line,
        column,
        message,
    }
}

/// Walks the tokens of one statement.
struct Cursor<'a> {
    source: &'a str,
    tokens: &'a [(Token, Range<usize>)],
    pos: usize,
    /// Offset reported when the statement ends early
    end: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str, tokens: &'a [(Token, Range<usize>)], end: usize) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            end,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.end, |(_, span)| span.start)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t);
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> Error {
        parse_error(self.source, self.offset(), message.into())
    }

    fn unexpected(&self, expected: &str) -> Error {
        match self.peek() {
            Some(found) => self.error(format!("expected {}, found {}", expected, found)),
            None => self.error(format!("expected {}, found end of line", expected)),
        }
    }

    fn statement(&mut self, catalog: &mut ReactionCatalog) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(Token::Catalyst) => {
                self.bump();
                let (species, weight) = self.catalyst()?;
                catalog.set_catalyst(species, weight);
                Ok(())
            }
            Some(_) => {
                let reaction = self.reaction()?;
                catalog.push(reaction);
                Ok(())
            }
        }
    }

    fn catalyst(&mut self) -> Result<(Species, f64)> {
        let species = match self.peek() {
            Some(Token::Ident(name)) => Species::from(name.as_str()),
            _ => return Err(self.unexpected("catalyst species")),
        };
        self.bump();

        let weight = match self.peek().and_then(Token::as_number) {
            Some(weight) => weight,
            None => return Err(self.unexpected("catalyst weight")),
        };
        if weight < 0.0 {
            return Err(self.error("catalyst weight must not be negative"));
        }
        self.bump();
        self.finish()?;
        Ok((species, weight))
    }

    fn reaction(&mut self) -> Result<Reaction> {
        let reactants = self.side("reactant")?;
        match self.peek() {
            Some(Token::Arrow) => {
                self.bump();
            }
            _ => return Err(self.unexpected("`->` or `+`")),
        }
        let products = self.side("product")?;

        let mut reaction = Reaction::new(reactants, products);
        if let Some(Token::At) = self.peek() {
            self.bump();
            let rate = match self.peek().and_then(Token::as_number) {
                Some(rate) => rate,
                None => return Err(self.unexpected("reaction rate")),
            };
            if !(rate > 0.0 && rate <= 1.0) {
                return Err(self.error(format!("reaction rate {} is outside (0, 1]", rate)));
            }
            self.bump();
            reaction = reaction.with_rate(rate);
        }
        self.finish()?;
        Ok(reaction)
    }

    /// `term ('+' term)*` where `term = [integer] species`
    fn side(&mut self, role: &str) -> Result<IndexMap<Species, f64>> {
        let mut side: IndexMap<Species, f64> = IndexMap::new();
        loop {
            let coefficient = match self.peek() {
                Some(Token::Integer(0)) => return Err(self.error("coefficient must be positive")),
                Some(Token::Integer(n)) if *n > MAX_COEFFICIENT => {
                    return Err(self.error(format!(
                        "coefficient must be at most {}, got {}",
                        MAX_COEFFICIENT, n
                    )));
                }
                Some(Token::Integer(n)) => {
                    self.bump();
                    *n as f64
                }
                _ => 1.0,
            };
            let species = match self.peek() {
                Some(Token::Ident(name)) => Species::from(name.as_str()),
                _ => return Err(self.unexpected(&format!("{} species", role))),
            };
            let total = side.entry(species).or_insert(0.0);
            *total += coefficient;
            if *total > MAX_COEFFICIENT as f64 {
                return Err(self.error(format!(
                    "coefficient must be at most {}, got {} in total",
                    MAX_COEFFICIENT, total
                )));
            }
            self.bump();

            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                }
                _ => return Ok(side),
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of line")),
        }
    }
}
