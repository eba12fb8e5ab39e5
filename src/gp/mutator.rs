use crate::expr::node::{ArithmeticOp, ComparisonOp, Expression, LogicOp, WindowOp};
use crate::types::{ExprType, QuoteKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Baseline chance that a rule is mutated at all.
pub const DEFAULT_MUTATION_PERCENT: u32 = 10;
/// Chance of a further mutation after any applied mutation.
pub const EXTRA_MUTATION_PERCENT: u32 = 10;

/// Hard bound on chained mutations; termination is otherwise probabilistic
/// (10% re-trigger per step). A chain of 64 has probability ~1e-64.
const MAX_MUTATION_CHAIN: usize = 64;

const PRICE_KINDS: [QuoteKind; 4] = [
    QuoteKind::Open,
    QuoteKind::High,
    QuoteKind::Low,
    QuoteKind::Close,
];

const VARIABLE_NAMES: [&str; 2] = ["held", "order"];

/// Random construction and structural mutation of expression trees.
///
/// One mutator is bound to one pseudo-random source for a whole GP run;
/// randomness is never ambient. Every tree it produces type-checks, and
/// every mutation preserves the mutated site's resolved type so the
/// surrounding tree stays well-typed.
pub struct Mutator {
    rng: StdRng,
}

impl Mutator {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// A random leaf of the requested type.
    pub fn random_terminal(&mut self, ty: ExprType) -> Expression {
        match ty {
            ExprType::Boolean => Expression::Bool(self.rng.gen_bool(0.5)),
            ExprType::Value | ExprType::Price | ExprType::Volume => {
                Expression::Number(self.rng.gen_range(0.0..100.0))
            }
            ExprType::Quote => Expression::Quote(self.random_quote_kind(ExprType::Value)),
        }
    }

    /// A random subtree whose root is a non-terminal resolving to exactly
    /// the requested type. Deeper `level`s bias children toward terminals so
    /// trees stay within reachable size bounds.
    pub fn random_non_terminal(&mut self, ty: ExprType, level: usize) -> Expression {
        match ty {
            ExprType::Boolean => self.random_boolean_operator(level),
            ExprType::Value | ExprType::Price | ExprType::Volume => {
                self.random_numeric_operator(ty, level)
            }
            // Quote has no non-terminal form.
            ExprType::Quote => self.random_terminal(ExprType::Quote),
        }
    }

    /// Uniform breadth-first index into the tree.
    pub fn find_random_site(&mut self, root: &Expression) -> usize {
        self.rng.gen_range(0..root.size())
    }

    /// Uniform breadth-first index among nodes resolving to `ty`, or None
    /// when the tree has no such node (an ordinary "no match", not a fault).
    pub fn find_random_site_of_type(&mut self, root: &Expression, ty: ExprType) -> Option<usize> {
        self.find_random_site_matching(root, |node| node.resolved_type() == ty)
    }

    /// Like `find_random_site_of_type`, but for quote terminals matched on
    /// their underlying numeric type. A volume quote may only replace a
    /// volume quote, else the enclosing lag/window would change type.
    pub fn find_random_quote_site(
        &mut self,
        root: &Expression,
        underlying: ExprType,
    ) -> Option<usize> {
        self.find_random_site_matching(root, |node| match node {
            Expression::Quote(kind) => kind.value_type() == underlying,
            _ => false,
        })
    }

    fn find_random_site_matching<F>(&mut self, root: &Expression, matches: F) -> Option<usize>
    where
        F: Fn(&Expression) -> bool,
    {
        let count = root.breadth_first().filter(|node| matches(node)).count();
        if count == 0 {
            return None;
        }
        let target = self.rng.gen_range(0..count);
        let mut seen = 0;
        for (index, node) in root.breadth_first().enumerate() {
            if matches(node) {
                if seen == target {
                    return Some(index);
                }
                seen += 1;
            }
        }
        None
    }

    /// Replace the subtree at `site` with `replacement`. Site 0 replaces the
    /// whole tree.
    pub fn insert(&mut self, root: &mut Expression, site: usize, replacement: Expression) {
        root.replace_at(site, replacement);
    }

    /// Collapse the subtree at `site` to a random terminal of the same type.
    /// Redirects to modification for the root or for leaves, where a
    /// collapse would be wasted motion.
    pub fn delete(&mut self, root: &mut Expression, site: usize) {
        let leaf = match root.node_at(site) {
            Some(node) => node.children().is_empty(),
            None => return,
        };
        if site == 0 || leaf {
            self.modify(root, site);
            return;
        }
        let ty = root.node_at(site).map(Expression::resolved_type);
        if let Some(ty) = ty {
            let replacement = self.random_terminal(ty);
            root.replace_at(site, replacement);
        }
    }

    /// With probability `percent`/100, apply one random mutation, then keep
    /// re-rolling at the extra-mutation chance so mutations can chain.
    pub fn mutate(&mut self, root: &mut Expression, percent: u32) {
        let mut gate = percent;
        for _ in 0..MAX_MUTATION_CHAIN {
            if self.rng.gen_range(0..100) >= gate {
                return;
            }
            self.mutate_once(root);
            gate = EXTRA_MUTATION_PERCENT;
        }
    }

    fn mutate_once(&mut self, root: &mut Expression) {
        let site = self.find_random_site(root);
        match self.rng.gen_range(0..100) {
            0..=9 => self.grow(root, site),
            10..=29 => self.delete(root, site),
            30..=69 => self.modify(root, site),
            _ => self.shuffle(root, site),
        }
    }

    /// Insertion mutation: plant a fresh same-type subtree at the site.
    /// Quote leaves swap within their underlying type so the enclosing
    /// lag/window node keeps its resolved type.
    fn grow(&mut self, root: &mut Expression, site: usize) {
        let replacement = match root.node_at(site) {
            Some(Expression::Quote(kind)) => {
                let kind = *kind;
                Expression::Quote(self.swap_quote_kind(kind))
            }
            Some(node) => {
                let ty = node.resolved_type();
                self.random_non_terminal(ty, 2)
            }
            None => return,
        };
        root.replace_at(site, replacement);
    }

    /// Modification mutation: substitute an equivalent construct at the
    /// site, preserving its resolved type.
    fn modify(&mut self, root: &mut Expression, site: usize) {
        let node = match root.node_at(site) {
            Some(node) => node.clone(),
            None => return,
        };
        let replacement = match node {
            Expression::Number(n) => {
                // Nudge or redraw, evenly.
                if self.rng.gen_bool(0.5) {
                    Expression::Number(n + self.rng.gen_range(-10.0..10.0))
                } else {
                    Expression::Number(self.rng.gen_range(0.0..100.0))
                }
            }
            Expression::Bool(b) => Expression::Bool(!b),
            Expression::Variable(name) => {
                let other = VARIABLE_NAMES
                    .iter()
                    .find(|&&candidate| candidate != name)
                    .unwrap_or(&VARIABLE_NAMES[0]);
                Expression::Variable((*other).to_string())
            }
            Expression::Quote(kind) => Expression::Quote(self.swap_quote_kind(kind)),
            Expression::Arithmetic { op, left, right } => Expression::Arithmetic {
                op: self.different_arithmetic_op(op),
                left,
                right,
            },
            Expression::Comparison { op, left, right } => Expression::Comparison {
                op: self.different_comparison_op(op),
                left,
                right,
            },
            Expression::Logic { op, left, right } => Expression::Logic {
                op: match op {
                    LogicOp::And => LogicOp::Or,
                    LogicOp::Or => LogicOp::And,
                },
                left,
                right,
            },
            Expression::Window {
                op,
                quote,
                days,
                lag,
            } => Expression::Window {
                op: self.different_window_op(op),
                quote,
                days,
                lag,
            },
            other => {
                // Not/If/Percent/Lag/Rsi: rebuild a fresh same-type subtree.
                let ty = other.resolved_type();
                self.random_non_terminal(ty, 2)
            }
        };
        root.replace_at(site, replacement);
    }

    /// Shuffle mutation: swap two same-type children of the site node.
    /// Falls back to modification when no swap keeps the tree well-typed.
    fn shuffle(&mut self, root: &mut Expression, site: usize) {
        let node = match root.node_at(site) {
            Some(node) => node.clone(),
            None => return,
        };
        let swapped = match node {
            Expression::Comparison { op, left, right } => Some(Expression::Comparison {
                op,
                left: right,
                right: left,
            }),
            Expression::Logic { op, left, right } => Some(Expression::Logic {
                op,
                left: right,
                right: left,
            }),
            Expression::Arithmetic { op, left, right }
                if left.resolved_type() == right.resolved_type() =>
            {
                Some(Expression::Arithmetic {
                    op,
                    left: right,
                    right: left,
                })
            }
            Expression::If {
                condition,
                then_branch,
                else_branch,
            } => Some(Expression::If {
                condition,
                then_branch: else_branch,
                else_branch: then_branch,
            }),
            Expression::Window {
                op,
                quote,
                days,
                lag,
            } => Some(Expression::Window {
                op,
                quote,
                days: lag,
                lag: days,
            }),
            _ => None,
        };
        match swapped {
            Some(replacement) => {
                root.replace_at(site, replacement);
            }
            None => self.modify(root, site),
        }
    }

    fn random_boolean_operator(&mut self, level: usize) -> Expression {
        match self.rng.gen_range(0..10) {
            0..=5 => {
                let left_ty = self.random_numeric_type();
                let left = self.random_numeric(left_ty, level + 1);
                let right_ty = self.equivalent_numeric_type(left.resolved_type());
                let right = self.random_numeric(right_ty, level + 1);
                Expression::Comparison {
                    op: self.random_comparison_op(),
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            6..=7 => Expression::Logic {
                op: if self.rng.gen_bool(0.5) {
                    LogicOp::And
                } else {
                    LogicOp::Or
                },
                left: Box::new(self.random_boolean(level + 1)),
                right: Box::new(self.random_boolean(level + 1)),
            },
            8 => Expression::Not(Box::new(self.random_boolean(level + 1))),
            _ => Expression::If {
                condition: Box::new(self.random_boolean(level + 1)),
                then_branch: Box::new(self.random_boolean(level + 1)),
                else_branch: Box::new(self.random_boolean(level + 1)),
            },
        }
    }

    /// A numeric subtree resolving to exactly `ty`.
    fn random_numeric(&mut self, ty: ExprType, level: usize) -> Expression {
        if self.rng.gen_bool(terminal_chance(level)) {
            return self.numeric_leaf(ty);
        }
        self.random_numeric_operator(ty, level)
    }

    fn random_numeric_operator(&mut self, ty: ExprType, level: usize) -> Expression {
        match ty {
            ExprType::Value => match self.rng.gen_range(0..10) {
                0..=4 => {
                    let left = Box::new(self.random_numeric(ExprType::Value, level + 1));
                    let right_ty = self.random_numeric_type();
                    let right = Box::new(self.random_numeric(right_ty, level + 1));
                    Expression::Arithmetic {
                        op: self.random_arithmetic_op(),
                        left,
                        right,
                    }
                }
                5..=7 => Expression::Percent {
                    left: Box::new(self.random_numeric(ExprType::Value, level + 1)),
                    right: Box::new(Expression::Number(self.rng.gen_range(0.0..100.0))),
                },
                _ => Expression::Variable(
                    VARIABLE_NAMES[self.rng.gen_range(0..VARIABLE_NAMES.len())].to_string(),
                ),
            },
            ExprType::Price | ExprType::Volume => match self.rng.gen_range(0..10) {
                0..=3 => self.random_lag(ty),
                4..=6 => Expression::Window {
                    op: self.random_window_op(),
                    quote: Box::new(Expression::Quote(self.random_quote_kind(ty))),
                    days: Box::new(Expression::Number(self.rng.gen_range(1..30) as f64)),
                    lag: Box::new(Expression::Number(-(self.rng.gen_range(0..5) as f64))),
                },
                7 if ty == ExprType::Price => Expression::Rsi {
                    days: Box::new(Expression::Number(self.rng.gen_range(2..30) as f64)),
                    lag: Box::new(Expression::Number(-(self.rng.gen_range(0..5) as f64))),
                },
                _ => {
                    let left = Box::new(self.random_numeric(ty, level + 1));
                    let right_ty = if self.rng.gen_bool(0.5) {
                        ty
                    } else {
                        ExprType::Value
                    };
                    let right = Box::new(self.random_numeric(right_ty, level + 1));
                    Expression::Arithmetic {
                        op: self.random_arithmetic_op(),
                        left,
                        right,
                    }
                }
            },
            ExprType::Boolean => self.random_boolean_operator(level),
            ExprType::Quote => self.random_terminal(ExprType::Quote),
        }
    }

    fn random_boolean(&mut self, level: usize) -> Expression {
        if self.rng.gen_bool(terminal_chance(level)) {
            return self.random_terminal(ExprType::Boolean);
        }
        self.random_boolean_operator(level)
    }

    /// The smallest tree of the requested exact type.
    fn numeric_leaf(&mut self, ty: ExprType) -> Expression {
        match ty {
            ExprType::Price | ExprType::Volume => self.random_lag(ty),
            _ => Expression::Number(self.rng.gen_range(0.0..100.0)),
        }
    }

    fn random_lag(&mut self, ty: ExprType) -> Expression {
        Expression::Lag {
            quote: Box::new(Expression::Quote(self.random_quote_kind(ty))),
            days: Box::new(Expression::Number(-(self.rng.gen_range(0..20) as f64))),
        }
    }

    /// A quote kind whose underlying numeric type fits the request; `Value`
    /// requests draw from all five fields.
    fn random_quote_kind(&mut self, ty: ExprType) -> QuoteKind {
        match ty {
            ExprType::Volume => QuoteKind::Volume,
            ExprType::Price => PRICE_KINDS[self.rng.gen_range(0..PRICE_KINDS.len())],
            _ => {
                if self.rng.gen_range(0..5) == 4 {
                    QuoteKind::Volume
                } else {
                    PRICE_KINDS[self.rng.gen_range(0..PRICE_KINDS.len())]
                }
            }
        }
    }

    /// Another quote field with the same underlying type, so the enclosing
    /// lag/window keeps its resolved type.
    fn swap_quote_kind(&mut self, current: QuoteKind) -> QuoteKind {
        if current == QuoteKind::Volume {
            return QuoteKind::Volume;
        }
        loop {
            let candidate = PRICE_KINDS[self.rng.gen_range(0..PRICE_KINDS.len())];
            if candidate != current {
                return candidate;
            }
        }
    }

    fn random_numeric_type(&mut self) -> ExprType {
        match self.rng.gen_range(0..6) {
            0..=1 => ExprType::Value,
            2..=4 => ExprType::Price,
            _ => ExprType::Volume,
        }
    }

    /// A type a freshly built sibling may take next to a node of type `ty`
    /// without breaking equivalence.
    fn equivalent_numeric_type(&mut self, ty: ExprType) -> ExprType {
        if ty == ExprType::Value {
            self.random_numeric_type()
        } else if self.rng.gen_bool(0.5) {
            ty
        } else {
            ExprType::Value
        }
    }

    fn random_arithmetic_op(&mut self) -> ArithmeticOp {
        const OPS: [ArithmeticOp; 4] = [
            ArithmeticOp::Add,
            ArithmeticOp::Subtract,
            ArithmeticOp::Multiply,
            ArithmeticOp::Divide,
        ];
        OPS[self.rng.gen_range(0..OPS.len())]
    }

    fn different_arithmetic_op(&mut self, current: ArithmeticOp) -> ArithmeticOp {
        loop {
            let candidate = self.random_arithmetic_op();
            if candidate != current {
                return candidate;
            }
        }
    }

    fn random_comparison_op(&mut self) -> ComparisonOp {
        const OPS: [ComparisonOp; 6] = [
            ComparisonOp::LessThan,
            ComparisonOp::GreaterThan,
            ComparisonOp::Equal,
            ComparisonOp::NotEqual,
            ComparisonOp::LessOrEqual,
            ComparisonOp::GreaterOrEqual,
        ];
        OPS[self.rng.gen_range(0..OPS.len())]
    }

    fn different_comparison_op(&mut self, current: ComparisonOp) -> ComparisonOp {
        loop {
            let candidate = self.random_comparison_op();
            if candidate != current {
                return candidate;
            }
        }
    }

    fn random_window_op(&mut self) -> WindowOp {
        const OPS: [WindowOp; 3] = [WindowOp::Min, WindowOp::Max, WindowOp::Avg];
        OPS[self.rng.gen_range(0..OPS.len())]
    }

    fn different_window_op(&mut self, current: WindowOp) -> WindowOp {
        loop {
            let candidate = self.random_window_op();
            if candidate != current {
                return candidate;
            }
        }
    }
}

/// Chance a child slot is filled with a leaf rather than another operator.
fn terminal_chance(level: usize) -> f64 {
    (0.25 + 0.15 * level as f64).min(0.85)
}
