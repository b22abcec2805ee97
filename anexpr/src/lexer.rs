//! Tokenisation of expression text.
//!
//! The lexer recognises, in priority order: offset variables, local variables, simulator
//! variables, bus variables, hexadecimal and decimal numbers, the keywords (`ON`, `OFF`, `AND`,
//! `OR`, `NOT`) and the operators, longest first. Whitespace between tokens is skipped.
//!
//! C-style `&&` and `||` are rewritten to ` AND ` / ` OR ` before lexing so that `&` and `|`
//! can stay bitwise operators.
//!
//! The grammar is built once per [`Lexer`]; tokenising reuses it.
use std::fmt;

use chumsky::{
    cache::{Cache, Cached},
    error::RichReason,
    prelude::*,
};

use crate::{
    ast::ComparisonOp,
    connection::{OffsetKind, Variable},
    error::{ExprError, ExprResult},
    value::write_number,
};

pub type Spanned<T> = (T, SimpleSpan);

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // Literals
    On,
    Off,
    Number(f64),

    // Variables
    Var(Variable),
    /// `A:NAME` without the mandatory `, units` part.
    UnitlessSimVar(String),
    /// A word that is neither a keyword nor a variable.
    Word(String),

    // Arithmetic
    Plus,
    Minus,
    Times,
    Divide,
    BitAnd,
    BitOr,

    // Logic
    And,
    Or,
    Not,
    Compare(ComparisonOp),

    // Delimiters
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::On => write!(f, "ON"),
            Token::Off => write!(f, "OFF"),
            Token::Number(n) => write_number(f, *n),
            Token::Var(v) => write!(f, "{v}"),
            Token::UnitlessSimVar(name) => write!(f, "A:{name}"),
            Token::Word(word) => write!(f, "{word}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Times => write!(f, "*"),
            Token::Divide => write!(f, "/"),
            Token::BitAnd => write!(f, "&"),
            Token::BitOr => write!(f, "|"),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Not => write!(f, "NOT"),
            Token::Compare(op) => write!(f, "{op}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

/// Rewrites `&&` and `||` into the keyword operators.
///
/// Spaces are inserted around the keywords so they cannot glue to adjacent names.
pub fn normalize_operators(text: &str) -> String {
    text.replace("&&", " AND ").replace("||", " OR ")
}

fn is_operator_word(word: &str) -> bool {
    matches!(word, "AND" | "OR" | "NOT")
}

fn digits<'src>() -> impl Parser<'src, &'src str, &'src str, extra::Err<Rich<'src, char>>> + Clone
{
    any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .to_slice()
}

fn hex_digits<'src>()
-> impl Parser<'src, &'src str, &'src str, extra::Err<Rich<'src, char>>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_hexdigit())
        .repeated()
        .at_least(1)
        .to_slice()
        .labelled("hexadecimal digits")
}

/// Space separated words, stopping before an operator keyword.
///
/// Used for simulator variable names and units, which may contain spaces.
fn phrase<'src>() -> impl Parser<'src, &'src str, &'src str, extra::Err<Rich<'src, char>>> + Clone
{
    let word = any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || matches!(c, '_' | ':'))
        .repeated()
        .at_least(1)
        .to_slice();

    word.clone()
        .then(
            just(' ')
                .repeated()
                .at_least(1)
                .ignore_then(word.filter(|w: &&str| !is_operator_word(w)))
                .repeated(),
        )
        .to_slice()
}

fn lexer<'src>() -> impl Parser<'src, &'src str, Vec<Spanned<Token>>, extra::Err<Rich<'src, char>>>
{
    // OFFSET:HEXADDR:FLOATn / INTn
    let offset = just("OFFSET:")
        .ignore_then(hex_digits())
        .then_ignore(just(':'))
        .then(choice((
            just("FLOAT").to(OffsetKind::Float),
            just("INT").to(OffsetKind::Int),
        )))
        .then(digits())
        .try_map(|((address, kind), width), span| {
            let address = u32::from_str_radix(address, 16).map_err(|_| {
                Rich::custom(span, format!("Invalid offset address '{address}'."))
            })?;
            let width: u8 = width
                .parse()
                .map_err(|_| Rich::custom(span, format!("Invalid offset width '{width}'.")))?;
            let valid = match kind {
                OffsetKind::Int => matches!(width, 1 | 2 | 4 | 8),
                OffsetKind::Float => matches!(width, 4 | 8),
            };
            if !valid {
                return Err(Rich::custom(
                    span,
                    format!("Unsupported width {width} for {kind} offsets."),
                ));
            }
            Ok(Token::Var(Variable::Offset {
                address,
                kind,
                width,
            }))
        })
        .labelled("offset variable");

    // L:name
    let lvar = just("L:")
        .ignore_then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated()
                .at_least(1)
                .to_slice(),
        )
        .map(|name: &str| Token::Var(Variable::local(name)))
        .labelled("local variable");

    // A:NAME, units
    let simvar = just("A:")
        .ignore_then(phrase())
        .then(
            just(',')
                .padded_by(just(' ').repeated())
                .ignore_then(phrase())
                .or_not(),
        )
        .map(|(name, units): (&str, Option<&str>)| match units {
            Some(units) => Token::Var(Variable::simulator(name.trim(), units.trim())),
            None => Token::UnitlessSimVar(name.trim().to_string()),
        })
        .labelled("simulator variable");

    // [Category:Identifier]
    let bus = just('[')
        .ignore_then(none_of(":]").repeated().at_least(1).to_slice())
        .then_ignore(just(':'))
        .then(none_of("]").repeated().at_least(1).to_slice())
        .then_ignore(just(']'))
        .map(|(category, identifier): (&str, &str)| {
            Token::Var(Variable::bus(category.trim(), identifier.trim()))
        })
        .labelled("bus variable");

    let hex = just("0x")
        .or(just("0X"))
        .ignore_then(hex_digits())
        .try_map(|digits, span| {
            u64::from_str_radix(digits, 16)
                .map(|n| Token::Number(n as f64))
                .map_err(|_| Rich::custom(span, format!("Invalid hexadecimal number '0x{digits}'.")))
        })
        .labelled("hexadecimal number");

    let decimal = digits()
        .then(just('.').then(digits()).or_not())
        .to_slice()
        .try_map(|text: &str, span| {
            text.parse::<f64>()
                .map(Token::Number)
                .map_err(|_| Rich::custom(span, format!("Invalid number '{text}'.")))
        })
        .labelled("number");

    let keyword = any()
        .filter(|c: &char| c.is_ascii_alphabetic())
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|word: &str| match word {
            "ON" => Token::On,
            "OFF" => Token::Off,
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            _ => Token::Word(word.to_string()),
        });

    let comparison = choice((
        just("<=").to(ComparisonOp::LessOrEqual),
        just(">=").to(ComparisonOp::GreaterOrEqual),
        just("==").to(ComparisonOp::Equal),
        just("!=").to(ComparisonOp::NotEqual),
        just("<>").to(ComparisonOp::NotEqual),
        just("<").to(ComparisonOp::Less),
        just(">").to(ComparisonOp::Greater),
    ))
    .map(Token::Compare);

    let punct = choice((
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Times),
        just('/').to(Token::Divide),
        just('&').to(Token::BitAnd),
        just('|').to(Token::BitOr),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
    ));

    let token = choice((
        offset, lvar, simvar, bus, hex, decimal, keyword, comparison, punct,
    ));

    token
        .map_with(|tok, e| (tok, e.span()))
        .padded()
        .repeated()
        .collect()
        .then_ignore(end())
}

/// Human readable message for a parse error.
pub(crate) fn describe<T: fmt::Display>(error: &Rich<'_, T>) -> String {
    if let RichReason::Custom(message) = error.reason() {
        return message.to_string();
    }

    let found = match error.found() {
        Some(token) => format!("'{token}'"),
        None => "end of input".to_string(),
    };
    let mut expected: Vec<String> = error.expected().map(|e| e.to_string()).collect();
    expected.sort();
    expected.dedup();

    match expected.split_last() {
        None => format!("Syntax error: unexpected {found}."),
        Some((last, [])) => format!("Syntax error: unexpected {found}, expected {last}."),
        Some((last, rest)) => format!(
            "Syntax error: unexpected {found}, expected {} or {last}.",
            rest.join(", ")
        ),
    }
}

/// The token grammar, for [`Cache`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenGrammar;

impl Cached for TokenGrammar {
    type Parser<'src> =
        Boxed<'src, 'src, &'src str, Vec<Spanned<Token>>, extra::Err<Rich<'src, char>>>;

    fn make_parser<'src>(self) -> Self::Parser<'src> {
        lexer().boxed()
    }
}

/// Splits expression text into tokens.
#[derive(Default)]
pub struct Lexer {
    grammar: Cache<TokenGrammar>,
}

impl Lexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens of `text` with their byte spans in the normalized text.
    pub fn tokenize(&self, text: &str) -> ExprResult<Vec<Spanned<Token>>> {
        let normalized = normalize_operators(text);
        let (tokens, errors) = self
            .grammar
            .get()
            .parse(normalized.as_str())
            .into_output_errors();
        if let Some(error) = errors.first() {
            return Err(ExprError::Lex {
                message: describe(error),
                span: error.span().into_range(),
            });
        }
        tokens.ok_or_else(|| ExprError::Lex {
            message: "Syntax error: unreadable expression.".to_string(),
            span: 0..normalized.len(),
        })
    }
}

impl fmt::Debug for Lexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lexer").finish_non_exhaustive()
    }
}
