// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for reaction descriptions.
//!
//! Reaction descriptions are line oriented, so newlines are tokens and
//! only horizontal whitespace is skipped. `#` starts a comment that runs
//! to the end of the line.

use logos::Logos;

/// Reaction-description token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")] // Skip horizontal whitespace
#[logos(skip r"#[^\n]*")] // Skip # comments
pub enum Token {
    /// End of a statement
    #[token("\n")]
    Newline,

    /// Keyword `catalyst`
    #[token("catalyst")]
    Catalyst,

    /// Separator between reactants and products
    #[token("->")]
    Arrow,

    /// Separator between terms on one side
    #[token("+")]
    Plus,

    /// Introduces the encounter probability of a reaction
    #[token("@")]
    At,

    /// Stoichiometric coefficient
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    Integer(u64),

    /// Rate or catalyst weight
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    /// Species name; inner hyphens are allowed (`CIS-ACONITATE`)
    #[regex(r"[A-Za-z][A-Za-z0-9_']*(-[A-Za-z0-9_']+)*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Token {
    /// Numeric value of an integer or float token.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Token::Integer(v) => Some(*v as f64),
            Token::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Newline => write!(f, "end of line"),
            Token::Catalyst => write!(f, "`catalyst`"),
            Token::Arrow => write!(f, "`->`"),
            Token::Plus => write!(f, "`+`"),
            Token::At => write!(f, "`@`"),
            Token::Integer(v) => write!(f, "integer {}", v),
            Token::Float(v) => write!(f, "number {}", v),
            Token::Ident(name) => write!(f, "species `{}`", name),
        }
    }
}
