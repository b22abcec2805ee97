//! Parser for the light expression language using chumsky.
//!
//! Two stages:
//! 1) Tokenisation from input string to a [`Token`] stream (see [`crate::lexer`]).
//! 2) Parsing tokens into a small owned syntax tree, then type checking it while building the
//!    reactive nodes.
//!
//! Precedence, loosest first: `OR`, `AND`, `|`, `&`, `NOT`, comparisons, `+ -`, `* /`, unary
//! minus, then literals, variables and parenthesised expressions. Every binary level except
//! comparison is right-associative (`1 - 2 - 3` is `(1 - (2 - 3))`); comparisons do not chain.
//! Parentheses produce no node of their own.
//!
//! Both grammars are built once per process, by the first [`ExpressionParser::new`].
use std::{
    fmt,
    ops::Range,
    sync::{Arc, OnceLock},
};

use chumsky::{
    cache::{Cache, Cached},
    input::ValueInput,
    prelude::*,
};
use log::debug;

use crate::{
    ast::{
        ArithmeticOp, ComparisonOp, Composite, ConstantNode, ErrorNode, LogicalOp, Node,
        UnaryOp, VariableNode,
    },
    connection::{Connections, Variable},
    error::{ExprError, ExprResult},
    lexer::{Lexer, Spanned, Token, describe},
    value::NodeDataType,
};

type Span = SimpleSpan;

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryKind {
    Arithmetic(ArithmeticOp),
    Compare(ComparisonOp),
    Logical(LogicalOp),
}

#[derive(Debug, Clone, PartialEq)]
enum Syntax {
    Bool(bool),
    Number(f64),
    Var(Variable),
    Unary(UnaryOp, Box<Syntax>),
    Binary(BinaryKind, Box<Syntax>, Box<Syntax>),
}

fn chain((lhs, rest): (Syntax, Option<(BinaryKind, Syntax)>)) -> Syntax {
    match rest {
        Some((op, rhs)) => Syntax::Binary(op, Box::new(lhs), Box::new(rhs)),
        None => lhs,
    }
}

// ---------------- chumsky parser over tokens ----------------

fn syntax_parser<'tokens, I>()
-> impl Parser<'tokens, I, Syntax, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let value = select! {
            Token::On => Syntax::Bool(true),
            Token::Off => Syntax::Bool(false),
            Token::Number(n) => Syntax::Number(n),
            Token::Var(v) => Syntax::Var(v),
        }
        .labelled("value");

        let paren_expr = expr.delimited_by(
            just(Token::LParen),
            just(Token::RParen).labelled("closing parenthesis ')'"),
        );

        let primary = value.or(paren_expr).labelled("expression");

        // Prefix minus binds tightest
        let negate = just(Token::Minus)
            .repeated()
            .foldr(primary, |_, rhs| Syntax::Unary(UnaryOp::Negate, Box::new(rhs)));

        let multiplicative = recursive(|level| {
            negate
                .clone()
                .then(
                    choice((
                        just(Token::Times).to(ArithmeticOp::Multiply),
                        just(Token::Divide).to(ArithmeticOp::Divide),
                    ))
                    .map(BinaryKind::Arithmetic)
                    .then(level)
                    .or_not(),
                )
                .map(chain)
        });

        let additive = recursive(|level| {
            multiplicative
                .clone()
                .then(
                    choice((
                        just(Token::Plus).to(ArithmeticOp::Add),
                        just(Token::Minus).to(ArithmeticOp::Subtract),
                    ))
                    .map(BinaryKind::Arithmetic)
                    .then(level)
                    .or_not(),
                )
                .map(chain)
        });

        // Non-associative
        let comparison = additive
            .clone()
            .then(
                select! { Token::Compare(op) => BinaryKind::Compare(op) }
                    .labelled("comparison")
                    .then(additive)
                    .or_not(),
            )
            .map(chain);

        let not = just(Token::Not)
            .repeated()
            .foldr(comparison, |_, rhs| Syntax::Unary(UnaryOp::Not, Box::new(rhs)));

        let bit_and = recursive(|level| {
            not.clone()
                .then(
                    just(Token::BitAnd)
                        .to(BinaryKind::Arithmetic(ArithmeticOp::BitAnd))
                        .then(level)
                        .or_not(),
                )
                .map(chain)
        });

        let bit_or = recursive(|level| {
            bit_and
                .clone()
                .then(
                    just(Token::BitOr)
                        .to(BinaryKind::Arithmetic(ArithmeticOp::BitOr))
                        .then(level)
                        .or_not(),
                )
                .map(chain)
        });

        let and = recursive(|level| {
            bit_or
                .clone()
                .then(
                    just(Token::And)
                        .to(BinaryKind::Logical(LogicalOp::And))
                        .then(level)
                        .or_not(),
                )
                .map(chain)
        });

        recursive(|level| {
            and.clone()
                .then(
                    just(Token::Or)
                        .to(BinaryKind::Logical(LogicalOp::Or))
                        .then(level)
                        .or_not(),
                )
                .map(chain)
        })
    })
}

#[derive(Debug, Default, Clone, Copy)]
struct SyntaxGrammar;

impl Cached for SyntaxGrammar {
    type Parser<'src> =
        Boxed<'src, 'src, &'src [Token], Syntax, extra::Err<Rich<'src, Token, Span>>>;

    fn make_parser<'src>(self) -> Self::Parser<'src> {
        syntax_parser::<&'src [Token]>().then_ignore(end()).boxed()
    }
}

/// The lexer and the token parser, shared by every [`ExpressionParser`].
#[derive(Default)]
struct Grammar {
    lexer: Lexer,
    syntax: Cache<SyntaxGrammar>,
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar").finish_non_exhaustive()
    }
}

static GRAMMAR: OnceLock<Grammar> = OnceLock::new();

fn grammar() -> &'static Grammar {
    GRAMMAR.get_or_init(|| {
        debug!("building expression grammar");
        Grammar::default()
    })
}

/// Byte range in the source covered by a range of token indices.
fn source_span(tokens: &[Spanned<Token>], span: Span, end_of_input: usize) -> Range<usize> {
    let start = tokens
        .get(span.start)
        .map_or(end_of_input, |(_, first)| first.start);
    let end = span
        .end
        .checked_sub(1)
        .and_then(|last| tokens.get(last))
        .map_or(start, |(_, last)| last.end)
        .max(start);
    start..end
}

// ---------------- Public API ----------------

/// Turns expression text into reactive trees.
///
/// Holds the [`Connections`] variable leaves are wired to. Construct it once during start-up
/// and share it; parsing itself keeps no state between calls. The first construction builds
/// the grammar, every parser after that reuses it.
///
/// Example
/// ```
/// use anexpr::prelude::*;
///
/// let parser = ExpressionParser::new(Connections::new());
/// let node = parser.parse("1 + 2 * 3 + 4 == 11");
/// assert_eq!(node.to_string(), "((1 + ((2 * 3) + 4)) == 11)");
/// assert_eq!(node.value_type(), NodeDataType::Boolean);
/// ```
#[derive(Debug, Clone)]
pub struct ExpressionParser {
    connections: Connections,
    grammar: &'static Grammar,
}

impl ExpressionParser {
    pub fn new(connections: Connections) -> Self {
        Self {
            connections,
            grammar: grammar(),
        }
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Parses `text`. Failures come back as an [`ErrorNode`] carrying the message; this never
    /// panics and never fails.
    pub fn parse(&self, text: &str) -> Node {
        match self.try_parse(text) {
            Ok(node) => node,
            Err(error) => {
                debug!("failed to parse '{text}': {error}");
                Arc::new(ErrorNode::new(error.to_string()))
            }
        }
    }

    /// Like [`ExpressionParser::parse`], but reports failures as an [`ExprError`].
    pub fn try_parse(&self, text: &str) -> ExprResult<Node> {
        let spanned = self.grammar.lexer.tokenize(text)?;
        for (token, span) in &spanned {
            match token {
                Token::UnitlessSimVar(name) => {
                    return Err(ExprError::MissingUnits {
                        name: name.clone(),
                        span: span.into_range(),
                    });
                }
                Token::Word(word) => {
                    return Err(ExprError::Lex {
                        message: format!("Unknown word '{word}'."),
                        span: span.into_range(),
                    });
                }
                _ => {}
            }
        }

        let end_of_input = spanned.last().map_or(0, |(_, span)| span.end);
        let tokens: Vec<Token> = spanned.iter().map(|(token, _)| token.clone()).collect();
        let (syntax, errors) = self
            .grammar
            .syntax
            .get()
            .parse(tokens.as_slice())
            .into_output_errors();
        if let Some(error) = errors.first() {
            return Err(ExprError::Syntax {
                message: describe(error),
                span: source_span(&spanned, *error.span(), end_of_input),
            });
        }
        let syntax = syntax.ok_or_else(|| ExprError::Syntax {
            message: "Syntax error: unexpected end of input.".to_string(),
            span: end_of_input..end_of_input,
        })?;

        self.build(syntax)
    }

    fn build(&self, syntax: Syntax) -> ExprResult<Node> {
        Ok(match syntax {
            Syntax::Bool(value) => Arc::new(ConstantNode::boolean(value)),
            Syntax::Number(value) => Arc::new(ConstantNode::number(value)),
            Syntax::Var(variable) => {
                let dialect = variable.dialect();
                let Some(connection) = self.connections.get(dialect) else {
                    return Err(ExprError::UnsupportedDialect {
                        dialect,
                        variable: variable.to_string(),
                    });
                };
                Arc::new(VariableNode::new(variable, connection.clone()))
            }
            Syntax::Unary(op, child) => {
                let child = self.build(*child)?;
                let expected = match op {
                    UnaryOp::Not => NodeDataType::Boolean,
                    UnaryOp::Negate => NodeDataType::Double,
                };
                expect_type(op, expected, &child)?;
                Arc::new(Composite::unary(op, child))
            }
            Syntax::Binary(kind, lhs, rhs) => {
                let lhs = self.build(*lhs)?;
                let rhs = self.build(*rhs)?;
                match kind {
                    BinaryKind::Arithmetic(op) => {
                        expect_type(op, NodeDataType::Double, &lhs)?;
                        expect_type(op, NodeDataType::Double, &rhs)?;
                        Arc::new(Composite::binary(op, lhs, rhs))
                    }
                    // Booleans are compared as 1 and 0
                    BinaryKind::Compare(op) => Arc::new(Composite::binary(op, lhs, rhs)),
                    BinaryKind::Logical(op) => {
                        expect_type(op, NodeDataType::Boolean, &lhs)?;
                        expect_type(op, NodeDataType::Boolean, &rhs)?;
                        Arc::new(Composite::binary(op, lhs, rhs))
                    }
                }
            }
        })
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new(Connections::default())
    }
}

fn expect_type(
    operator: impl ToString,
    expected: NodeDataType,
    operand: &Node,
) -> ExprResult<()> {
    let found = operand.value_type();
    if found == expected {
        return Ok(());
    }
    Err(ExprError::TypeMismatch {
        operator: operator.to_string(),
        expected,
        found,
        operand: operand.to_string(),
    })
}
