use crate::types::{ExprType, QuoteKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Threshold at which a numeric result counts as boolean true.
///
/// Evolved expressions are float-noisy, so truth is a tolerance band rather
/// than an exact 1.0.
pub const TRUE_LEVEL: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    LessThan,
    GreaterThan,
    Equal,
    NotEqual,
    LessOrEqual,
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
}

/// Windowed aggregate over a quote field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowOp {
    Min,
    Max,
    Avg,
}

/// A typed trading-rule expression.
///
/// The tree exclusively owns its children; cloning is a deep copy and no node
/// is ever shared between two trees. Nodes are addressed by breadth-first
/// index from the root (`node_at`/`replace_at`) instead of parent pointers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Number(f64),
    Bool(bool),
    Variable(String),
    Quote(QuoteKind),
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logic {
        op: LogicOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not(Box<Expression>),
    If {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    /// `left * right / 100`.
    Percent {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Quote field read at a day offset (non-positive: 0 = today).
    Lag {
        quote: Box<Expression>,
        days: Box<Expression>,
    },
    /// Min/max/avg of a quote field over `days` days ending `lag` days back.
    Window {
        op: WindowOp,
        quote: Box<Expression>,
        days: Box<Expression>,
        lag: Box<Expression>,
    },
    /// Relative strength index over day closes.
    Rsi {
        days: Box<Expression>,
        lag: Box<Expression>,
    },
}

impl Expression {
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Number(_)
            | Expression::Bool(_)
            | Expression::Variable(_)
            | Expression::Quote(_) => Vec::new(),
            Expression::Not(child) => vec![&**child],
            Expression::Arithmetic { left, right, .. }
            | Expression::Comparison { left, right, .. }
            | Expression::Logic { left, right, .. }
            | Expression::Percent { left, right } => vec![&**left, &**right],
            Expression::Lag { quote, days } => vec![&**quote, &**days],
            Expression::If {
                condition,
                then_branch,
                else_branch,
            } => vec![&**condition, &**then_branch, &**else_branch],
            Expression::Window {
                quote, days, lag, ..
            } => vec![&**quote, &**days, &**lag],
            Expression::Rsi { days, lag } => vec![&**days, &**lag],
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Expression> {
        match self {
            Expression::Number(_)
            | Expression::Bool(_)
            | Expression::Variable(_)
            | Expression::Quote(_) => Vec::new(),
            Expression::Not(child) => vec![&mut **child],
            Expression::Arithmetic { left, right, .. }
            | Expression::Comparison { left, right, .. }
            | Expression::Logic { left, right, .. }
            | Expression::Percent { left, right } => vec![&mut **left, &mut **right],
            Expression::Lag { quote, days } => vec![&mut **quote, &mut **days],
            Expression::If {
                condition,
                then_branch,
                else_branch,
            } => vec![&mut **condition, &mut **then_branch, &mut **else_branch],
            Expression::Window {
                quote, days, lag, ..
            } => vec![&mut **quote, &mut **days, &mut **lag],
            Expression::Rsi { days, lag } => vec![&mut **days, &mut **lag],
        }
    }

    /// Total node count.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// Count of nodes whose resolved type equals `ty` exactly.
    pub fn size_of_type(&self, ty: ExprType) -> usize {
        self.breadth_first()
            .filter(|node| node.resolved_type() == ty)
            .count()
    }

    /// The type this node resolves to, derived structurally.
    ///
    /// Cheap to recompute and total: it does not validate the tree (that is
    /// `check_type`), it only reads off what each node would produce.
    pub fn resolved_type(&self) -> ExprType {
        match self {
            Expression::Number(_) | Expression::Variable(_) => ExprType::Value,
            Expression::Bool(_) => ExprType::Boolean,
            Expression::Quote(_) => ExprType::Quote,
            Expression::Arithmetic { left, .. } | Expression::Percent { left, .. } => {
                left.resolved_type()
            }
            Expression::Comparison { .. } | Expression::Logic { .. } | Expression::Not(_) => {
                ExprType::Boolean
            }
            Expression::If { then_branch, .. } => then_branch.resolved_type(),
            Expression::Lag { quote, .. } | Expression::Window { quote, .. } => {
                quote_field_type(quote)
            }
            Expression::Rsi { .. } => ExprType::Price,
        }
    }

    /// Nodes in breadth-first order starting at the root. Each call starts a
    /// fresh traversal.
    pub fn breadth_first(&self) -> BreadthFirst<'_> {
        let mut queue = VecDeque::new();
        queue.push_back(self);
        BreadthFirst { queue }
    }

    /// The node at breadth-first index `index` (0 = root).
    pub fn node_at(&self, index: usize) -> Option<&Expression> {
        self.breadth_first().nth(index)
    }

    /// Replace the node at breadth-first index `index` with `replacement`.
    /// Index 0 replaces the whole tree. Returns false when the index is out
    /// of range.
    pub fn replace_at(&mut self, index: usize, replacement: Expression) -> bool {
        let mut queue: VecDeque<&mut Expression> = VecDeque::new();
        queue.push_back(self);
        let mut position = 0;
        while let Some(node) = queue.pop_front() {
            if position == index {
                *node = replacement;
                return true;
            }
            position += 1;
            for child in node.children_mut() {
                queue.push_back(child);
            }
        }
        false
    }
}

/// Type of the quote field under a lag/window node. Falls back to Price when
/// the child is not a quote terminal (an ill-typed tree caught by
/// `check_type`).
fn quote_field_type(quote: &Expression) -> ExprType {
    match quote {
        Expression::Quote(kind) => kind.value_type(),
        _ => ExprType::Price,
    }
}

pub struct BreadthFirst<'a> {
    queue: VecDeque<&'a Expression>,
}

impl<'a> Iterator for BreadthFirst<'a> {
    type Item = &'a Expression;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        for child in node.children() {
            self.queue.push_back(child);
        }
        Some(node)
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ComparisonOp::LessThan => "<",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::Equal => "==",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessOrEqual => "<=",
            ComparisonOp::GreaterOrEqual => ">=",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicOp::And => "and",
            LogicOp::Or => "or",
        })
    }
}

impl fmt::Display for WindowOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowOp::Min => "min",
            WindowOp::Max => "max",
            WindowOp::Avg => "avg",
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", n),
            Expression::Bool(b) => write!(f, "{}", b),
            Expression::Variable(name) => f.write_str(name),
            Expression::Quote(kind) => write!(f, "{}", kind),
            Expression::Arithmetic { op, left, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Expression::Comparison { op, left, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Expression::Logic { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expression::Not(child) => write!(f, "not({})", child),
            Expression::If {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "if({}, {}, {})", condition, then_branch, else_branch),
            Expression::Percent { left, right } => write!(f, "percent({}, {})", left, right),
            Expression::Lag { quote, days } => write!(f, "lag({}, {})", quote, days),
            Expression::Window {
                op,
                quote,
                days,
                lag,
            } => write!(f, "{}({}, {}, {})", op, quote, days, lag),
            Expression::Rsi { days, lag } => write!(f, "rsi({}, {})", days, lag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Expression {
        // (day_close lagged today) > 50
        Expression::Comparison {
            op: ComparisonOp::GreaterThan,
            left: Box::new(Expression::Lag {
                quote: Box::new(Expression::Quote(QuoteKind::Close)),
                days: Box::new(Expression::Number(0.0)),
            }),
            right: Box::new(Expression::Number(50.0)),
        }
    }

    #[test]
    fn size_counts_all_nodes() {
        assert_eq!(sample_tree().size(), 5);
    }

    #[test]
    fn size_of_type_counts_resolved_types() {
        let tree = sample_tree();
        assert_eq!(tree.size_of_type(ExprType::Boolean), 1);
        assert_eq!(tree.size_of_type(ExprType::Price), 1); // the lag node
        assert_eq!(tree.size_of_type(ExprType::Quote), 1);
        assert_eq!(tree.size_of_type(ExprType::Value), 2);
    }

    #[test]
    fn breadth_first_visits_level_order() {
        let tree = sample_tree();
        let kinds: Vec<String> = tree
            .breadth_first()
            .map(|n| {
                match n {
                    Expression::Comparison { .. } => "cmp",
                    Expression::Lag { .. } => "lag",
                    Expression::Number(_) => "num",
                    Expression::Quote(_) => "quote",
                    _ => "other",
                }
                .to_string()
            })
            .collect();
        assert_eq!(kinds, ["cmp", "lag", "num", "quote", "num"]);
    }

    #[test]
    fn replace_at_root_swaps_whole_tree() {
        let mut tree = sample_tree();
        assert!(tree.replace_at(0, Expression::Bool(true)));
        assert_eq!(tree, Expression::Bool(true));
    }

    #[test]
    fn replace_at_inner_node() {
        let mut tree = sample_tree();
        // Index 2 is the right-hand 50 in breadth-first order.
        assert!(tree.replace_at(2, Expression::Number(75.0)));
        assert_eq!(tree.node_at(2), Some(&Expression::Number(75.0)));
        assert_eq!(tree.size(), 5);
    }

    #[test]
    fn replace_at_out_of_range_is_rejected() {
        let mut tree = sample_tree();
        assert!(!tree.replace_at(99, Expression::Bool(false)));
        assert_eq!(tree, sample_tree());
    }

    #[test]
    fn clone_is_independent() {
        let tree = sample_tree();
        let mut copy = tree.clone();
        copy.replace_at(2, Expression::Number(-1.0));
        assert_eq!(tree.node_at(2), Some(&Expression::Number(50.0)));
    }

    #[test]
    fn display_is_deterministic() {
        let tree = sample_tree();
        assert_eq!(tree.to_string(), "(lag(day_close, 0) > 50)");
        assert_eq!(tree.to_string(), tree.clone().to_string());
    }
}
