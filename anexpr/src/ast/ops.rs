//! Operators of the expression language.
use std::{fmt, sync::Arc};

use strum::{Display, EnumIter, EnumString};

use crate::value::{NodeDataType, Value};

use super::{
    AstNode, ConstantNode, Node, is_bool_constant,
    composite::{Composite, Operator, settled},
};

pub type UnaryNode = Composite<UnaryOp>;
pub type ArithmeticNode = Composite<ArithmeticOp>;
pub type ComparisonNode = Composite<ComparisonOp>;
pub type LogicalNode = Composite<LogicalOp>;

fn number(value: &Value) -> f64 {
    value.to_number().unwrap_or(f64::NAN)
}

fn render_binary(symbol: impl fmt::Display, children: &[Node], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match children {
        [lhs, rhs] => write!(f, "({lhs} {symbol} {rhs})"),
        _ => Err(fmt::Error),
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum UnaryOp {
    /// Logical `NOT`. Numbers coerce to booleans (non-zero is true).
    #[strum(to_string = "NOT")]
    Not,
    /// Arithmetic negation. Booleans coerce to `1`/`0`.
    #[strum(to_string = "-")]
    Negate,
}

impl Operator for UnaryOp {
    fn value_type(&self) -> NodeDataType {
        match self {
            UnaryOp::Not => NodeDataType::Boolean,
            UnaryOp::Negate => NodeDataType::Double,
        }
    }

    fn compute(&self, inputs: &[Option<Value>]) -> Option<Value> {
        let child = match settled(inputs)? {
            Ok(values) => *values.first()?,
            Err(error) => return Some(error),
        };
        Some(match self {
            UnaryOp::Not => Value::Boolean(!child.to_bool().unwrap_or(false)),
            UnaryOp::Negate => Value::Number(-number(child)),
        })
    }

    fn render(&self, children: &[Node], f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [child] = children else {
            return Err(fmt::Error);
        };
        match self {
            UnaryOp::Not => write!(f, "(NOT {child})"),
            UnaryOp::Negate => write!(f, "-{child}"),
        }
    }

    fn optimize(node: Arc<Composite<Self>>) -> Node {
        if node.op() != UnaryOp::Not {
            return node;
        }
        let Some(child) = node.operand(0).cloned() else {
            return node;
        };

        let optimized = child.clone().optimize();
        if let Some(value) = optimized.as_constant().and_then(Value::to_bool) {
            return Arc::new(ConstantNode::boolean(!value));
        }
        if Arc::ptr_eq(&child, &optimized) {
            node
        } else {
            Arc::new(Composite::unary(UnaryOp::Not, optimized))
        }
    }
}

/// Numeric binary operators. `&` and `|` work on the operands truncated to 64-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ArithmeticOp {
    #[strum(to_string = "+")]
    Add,
    #[strum(to_string = "-")]
    Subtract,
    #[strum(to_string = "*")]
    Multiply,
    #[strum(to_string = "/")]
    Divide,
    #[strum(to_string = "&")]
    BitAnd,
    #[strum(to_string = "|")]
    BitOr,
}

impl ArithmeticOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            ArithmeticOp::Add => lhs + rhs,
            ArithmeticOp::Subtract => lhs - rhs,
            ArithmeticOp::Multiply => lhs * rhs,
            ArithmeticOp::Divide => lhs / rhs,
            ArithmeticOp::BitAnd => ((lhs as i64) & (rhs as i64)) as f64,
            ArithmeticOp::BitOr => ((lhs as i64) | (rhs as i64)) as f64,
        }
    }
}

impl Operator for ArithmeticOp {
    fn value_type(&self) -> NodeDataType {
        NodeDataType::Double
    }

    fn compute(&self, inputs: &[Option<Value>]) -> Option<Value> {
        match settled(inputs)? {
            Ok(values) => match values.as_slice() {
                [lhs, rhs] => Some(Value::Number(self.apply(number(lhs), number(rhs)))),
                _ => None,
            },
            Err(error) => Some(error),
        }
    }

    fn render(&self, children: &[Node], f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_binary(self, children, f)
    }
}

/// Numeric comparisons. Both operands are compared as doubles, exactly (no tolerance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum ComparisonOp {
    #[strum(to_string = "<")]
    Less,
    #[strum(to_string = "<=")]
    LessOrEqual,
    #[strum(to_string = "==")]
    Equal,
    #[strum(to_string = "!=", serialize = "<>")]
    NotEqual,
    #[strum(to_string = ">=")]
    GreaterOrEqual,
    #[strum(to_string = ">")]
    Greater,
}

impl ComparisonOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            ComparisonOp::Less => lhs < rhs,
            ComparisonOp::LessOrEqual => lhs <= rhs,
            ComparisonOp::Equal => lhs == rhs,
            ComparisonOp::NotEqual => lhs != rhs,
            ComparisonOp::GreaterOrEqual => lhs >= rhs,
            ComparisonOp::Greater => lhs > rhs,
        }
    }
}

impl Operator for ComparisonOp {
    fn value_type(&self) -> NodeDataType {
        NodeDataType::Boolean
    }

    fn compute(&self, inputs: &[Option<Value>]) -> Option<Value> {
        match settled(inputs)? {
            Ok(values) => match values.as_slice() {
                [lhs, rhs] => Some(Value::Boolean(self.apply(number(lhs), number(rhs)))),
                _ => None,
            },
            Err(error) => Some(error),
        }
    }

    fn render(&self, children: &[Node], f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_binary(self, children, f)
    }
}

/// Short-circuiting `AND` / `OR`.
///
/// The absorbing value (`false` for `AND`, `true` for `OR`) decides the output as soon as one
/// side reports it, even when the other side has not reported or carries an error. Otherwise
/// both sides are needed: the leftmost error wins, then the neutral result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum LogicalOp {
    #[strum(to_string = "AND")]
    And,
    #[strum(to_string = "OR")]
    Or,
}

impl LogicalOp {
    /// The operand value that alone decides the result.
    pub fn absorbing(self) -> bool {
        matches!(self, LogicalOp::Or)
    }
}

impl Operator for LogicalOp {
    fn value_type(&self) -> NodeDataType {
        NodeDataType::Boolean
    }

    fn compute(&self, inputs: &[Option<Value>]) -> Option<Value> {
        let absorbing = self.absorbing();
        if inputs
            .iter()
            .flatten()
            .any(|value| value.to_bool() == Some(absorbing))
        {
            return Some(Value::Boolean(absorbing));
        }
        match settled(inputs)? {
            Ok(_) => Some(Value::Boolean(!absorbing)),
            Err(error) => Some(error),
        }
    }

    fn render(&self, children: &[Node], f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_binary(self, children, f)
    }

    fn optimize(node: Arc<Composite<Self>>) -> Node {
        let op = node.op();
        let (Some(lhs), Some(rhs)) = (node.operand(0).cloned(), node.operand(1).cloned()) else {
            return node;
        };
        let optimized_lhs = lhs.clone().optimize();
        let optimized_rhs = rhs.clone().optimize();

        let absorbing = op.absorbing();
        for side in [&optimized_lhs, &optimized_rhs] {
            if is_bool_constant(side, absorbing) {
                return side.clone();
            }
        }
        if is_bool_constant(&optimized_lhs, !absorbing) {
            return optimized_rhs;
        }
        if is_bool_constant(&optimized_rhs, !absorbing) {
            return optimized_lhs;
        }

        if Arc::ptr_eq(&lhs, &optimized_lhs) && Arc::ptr_eq(&rhs, &optimized_rhs) {
            node
        } else {
            Arc::new(Composite::binary(op, optimized_lhs, optimized_rhs))
        }
    }
}
