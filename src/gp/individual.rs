use crate::data::{OrderCache, QuoteBundle};
use crate::error::EvaluationError;
use crate::expr::Expression;
use crate::gp::mutator::{Mutator, DEFAULT_MUTATION_PERCENT};
use crate::trading::{paper_trade, Portfolio, StockSizing};
use crate::types::ExprType;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::Rng;
use std::cmp::Ordering;

/// The five strategies for producing a child from two parents, drawn from
/// cumulative percentage buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreedType {
    /// Copy the father, then force a mutation so the child is never an
    /// exact duplicate (a duplicate would waste an evaluation).
    Clone,
    /// Father's buy rule with mother's sell rule.
    Swap,
    /// Graft a subtree from the mother's buy rule into the buy rule.
    Recombine,
    /// Swap sell rules and recombine the buy rule.
    SwapAndRecombine,
    /// Recombine both rules.
    DoubleRecombine,
}

impl BreedType {
    fn draw(rng: &mut StdRng) -> Self {
        match rng.gen_range(0..100) {
            0..=9 => BreedType::Clone,
            10..=14 => BreedType::Swap,
            15..=49 => BreedType::Recombine,
            50..=89 => BreedType::SwapAndRecombine,
            _ => BreedType::DoubleRecombine,
        }
    }

    fn takes_mother_sell_rule(self) -> bool {
        matches!(self, BreedType::Swap | BreedType::SwapAndRecombine)
    }

    fn recombines_buy_rule(self) -> bool {
        matches!(
            self,
            BreedType::Recombine | BreedType::SwapAndRecombine | BreedType::DoubleRecombine
        )
    }
}

/// A candidate solution: a buy rule and a sell rule, both Boolean trees,
/// plus the paper-trading outcome once evaluated.
///
/// Unevaluated until `paper_trade` runs, evaluated exactly once; the value
/// and portfolio snapshot are frozen from then on. The two trees are owned
/// exclusively — breeding and seeding always clone, so mutating one
/// individual can never touch another.
#[derive(Debug, Clone)]
pub struct Individual {
    buy_rule: Expression,
    sell_rule: Expression,
    value: Option<f64>,
    portfolio: Option<Portfolio>,
}

impl Individual {
    /// Seed an individual from explicit rules. Both must already resolve to
    /// Boolean; handing over a malformed rule is a programming error.
    pub fn new(buy_rule: Expression, sell_rule: Expression) -> Self {
        assert_eq!(
            buy_rule.check_type(),
            Ok(ExprType::Boolean),
            "buy rule must be boolean"
        );
        assert_eq!(
            sell_rule.check_type(),
            Ok(ExprType::Boolean),
            "sell rule must be boolean"
        );
        Self {
            buy_rule,
            sell_rule,
            value: None,
            portfolio: None,
        }
    }

    /// A generation-1 individual with freshly grown rules.
    pub fn random(mutator: &mut Mutator) -> Self {
        let buy_rule = mutator.random_non_terminal(ExprType::Boolean, 0).simplify();
        let sell_rule = mutator.random_non_terminal(ExprType::Boolean, 0).simplify();
        debug_assert!(buy_rule.check_type().is_ok());
        debug_assert!(sell_rule.check_type().is_ok());
        Self {
            buy_rule,
            sell_rule,
            value: None,
            portfolio: None,
        }
    }

    /// Breed a child from two parents. The parents may be the same
    /// individual; self-breeding is allowed and produces clone-like
    /// children through the normal path.
    pub fn breed(
        rng: &mut StdRng,
        mutator: &mut Mutator,
        mother: &Individual,
        father: &Individual,
    ) -> Self {
        let breed_type = BreedType::draw(rng);

        let mut buy_rule = father.buy_rule.clone();
        let mut sell_rule = if breed_type.takes_mother_sell_rule() {
            mother.sell_rule.clone()
        } else {
            father.sell_rule.clone()
        };

        if breed_type.recombines_buy_rule() {
            recombine(&mut buy_rule, &mother.buy_rule, mutator);
        }
        if breed_type == BreedType::DoubleRecombine {
            recombine(&mut sell_rule, &mother.sell_rule, mutator);
        }

        if breed_type == BreedType::Clone {
            // A pure clone is never let through.
            match rng.gen_range(0..3) {
                0 => mutator.mutate(&mut buy_rule, 100),
                1 => mutator.mutate(&mut sell_rule, 100),
                _ => {
                    mutator.mutate(&mut buy_rule, 100);
                    mutator.mutate(&mut sell_rule, 100);
                }
            }
        } else {
            mutator.mutate(&mut buy_rule, DEFAULT_MUTATION_PERCENT);
            mutator.mutate(&mut sell_rule, DEFAULT_MUTATION_PERCENT);
        }

        let buy_rule = buy_rule.simplify();
        let sell_rule = sell_rule.simplify();
        debug_assert!(
            buy_rule.check_type().is_ok() && sell_rule.check_type().is_ok(),
            "breeding produced an ill-typed rule"
        );

        Self {
            buy_rule,
            sell_rule,
            value: None,
            portfolio: None,
        }
    }

    pub fn buy_rule(&self) -> &Expression {
        &self.buy_rule
    }

    pub fn sell_rule(&self) -> &Expression {
        &self.sell_rule
    }

    /// Size/content constraints: both rules within `[min_size, max_size]`
    /// nodes, and the buy rule must reference actual market data — a rule
    /// built purely from constants and the held/order variables is degenerate
    /// no matter how lucky its returns. The sell rule carries no such
    /// requirement.
    pub fn is_valid(&self, min_size: usize, max_size: usize) -> bool {
        let buy_size = self.buy_rule.size();
        let sell_size = self.sell_rule.size();
        if buy_size < min_size || buy_size > max_size {
            return false;
        }
        if sell_size < min_size || sell_size > max_size {
            return false;
        }
        self.buy_rule.size_of_type(ExprType::Price) > 0
            || self.buy_rule.size_of_type(ExprType::Volume) > 0
    }

    /// Simulate the rule pair and freeze the resulting portfolio value.
    #[allow(clippy::too_many_arguments)]
    pub fn paper_trade(
        &mut self,
        quotes: &QuoteBundle,
        orders: &OrderCache,
        start_date: NaiveDate,
        end_date: NaiveDate,
        initial_capital: f64,
        sizing: StockSizing,
        trade_cost: f64,
    ) -> Result<f64, EvaluationError> {
        debug_assert!(self.value.is_none(), "individual evaluated twice");
        let start_day = quotes
            .day_of(start_date)
            .ok_or(EvaluationError::PastDate(0))?;
        let end_day = quotes
            .day_of(end_date)
            .ok_or(EvaluationError::FutureDate(0))?;
        let portfolio = paper_trade(
            &self.buy_rule,
            &self.sell_rule,
            quotes,
            orders,
            start_day,
            end_day,
            initial_capital,
            sizing,
            trade_cost,
        )?;
        let value = portfolio.value_on(quotes, end_day)?;
        self.value = Some(value);
        self.portfolio = Some(portfolio);
        Ok(value)
    }

    pub fn is_evaluated(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn portfolio(&self) -> Option<&Portfolio> {
        self.portfolio.as_ref()
    }

    /// Order by fitness value. Both individuals must be evaluated; comparing
    /// an unevaluated individual is a precondition violation and fails
    /// loudly rather than producing an arbitrary order.
    pub fn compare(&self, other: &Individual) -> Ordering {
        let mine = self.value.expect("compared an unevaluated individual");
        let theirs = other.value.expect("compared an unevaluated individual");
        mine.partial_cmp(&theirs).unwrap_or(Ordering::Equal)
    }
}

/// Graft a random same-type subtree from `source` into `destination`.
/// When the source has no site of the destination site's type, the
/// destination is left unchanged — a no-op, not a failure. Quote terminals
/// match on their underlying numeric type so a graft can never flip a
/// lag/window between price and volume.
fn recombine(destination: &mut Expression, source: &Expression, mutator: &mut Mutator) {
    let dest_site = mutator.find_random_site(destination);
    let source_site = match destination.node_at(dest_site) {
        Some(Expression::Quote(kind)) => mutator.find_random_quote_site(source, kind.value_type()),
        Some(node) => {
            let site_type = node.resolved_type();
            mutator.find_random_site_of_type(source, site_type)
        }
        None => return,
    };
    if let Some(source_site) = source_site {
        if let Some(subtree) = source.node_at(source_site) {
            let graft = subtree.clone();
            mutator.insert(destination, dest_site, graft);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::node::ComparisonOp;
    use crate::types::QuoteKind;
    use rand::SeedableRng;

    fn num(n: f64) -> Box<Expression> {
        Box::new(Expression::Number(n))
    }

    fn market_rule() -> Expression {
        // lag(day_close, 0) > 50 — size 5, references price data.
        Expression::Comparison {
            op: ComparisonOp::GreaterThan,
            left: Box::new(Expression::Lag {
                quote: Box::new(Expression::Quote(QuoteKind::Close)),
                days: num(0.0),
            }),
            right: num(50.0),
        }
    }

    fn constant_rule() -> Expression {
        // held < 5 — size 3, no market data.
        Expression::Comparison {
            op: ComparisonOp::LessThan,
            left: Box::new(Expression::Variable("held".to_string())),
            right: num(5.0),
        }
    }

    #[test]
    fn direct_construction_accepts_boolean_rules() {
        let individual = Individual::new(market_rule(), constant_rule());
        assert!(!individual.is_evaluated());
        assert_eq!(individual.buy_rule().size(), 5);
    }

    #[test]
    #[should_panic(expected = "buy rule must be boolean")]
    fn direct_construction_rejects_non_boolean() {
        Individual::new(Expression::Number(1.0), constant_rule());
    }

    #[test]
    fn constant_buy_rule_is_never_valid() {
        let individual = Individual::new(constant_rule(), market_rule());
        assert!(!individual.is_valid(3, 15));
    }

    #[test]
    fn market_referencing_buy_rule_is_valid() {
        let individual = Individual::new(market_rule(), constant_rule());
        assert!(individual.is_valid(3, 15));
    }

    #[test]
    fn size_bounds_are_enforced() {
        let individual = Individual::new(market_rule(), constant_rule());
        assert!(!individual.is_valid(6, 15)); // buy rule is 5 nodes
        assert!(!individual.is_valid(3, 4));
    }

    #[test]
    fn breeding_always_yields_boolean_rules() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut mutator = Mutator::from_seed(22);
        let mother = Individual::random(&mut mutator);
        let father = Individual::random(&mut mutator);
        for _ in 0..200 {
            let child = Individual::breed(&mut rng, &mut mutator, &mother, &father);
            assert_eq!(child.buy_rule().check_type(), Ok(ExprType::Boolean));
            assert_eq!(child.sell_rule().check_type(), Ok(ExprType::Boolean));
        }
    }

    #[test]
    fn breeding_does_not_disturb_parents() {
        let mut rng = StdRng::seed_from_u64(31);
        let mut mutator = Mutator::from_seed(32);
        let mother = Individual::random(&mut mutator);
        let father = Individual::random(&mut mutator);
        let mother_before = mother.buy_rule().clone();
        let father_before = father.buy_rule().clone();
        for _ in 0..50 {
            let _ = Individual::breed(&mut rng, &mut mutator, &mother, &father);
        }
        assert_eq!(*mother.buy_rule(), mother_before);
        assert_eq!(*father.buy_rule(), father_before);
    }

    #[test]
    fn self_breeding_is_allowed() {
        let mut rng = StdRng::seed_from_u64(41);
        let mut mutator = Mutator::from_seed(42);
        let parent = Individual::random(&mut mutator);
        let child = Individual::breed(&mut rng, &mut mutator, &parent, &parent);
        assert_eq!(child.buy_rule().check_type(), Ok(ExprType::Boolean));
    }

    #[test]
    #[should_panic(expected = "unevaluated")]
    fn comparing_unevaluated_individuals_panics() {
        let a = Individual::new(market_rule(), constant_rule());
        let b = Individual::new(market_rule(), constant_rule());
        let _ = a.compare(&b);
    }
}
