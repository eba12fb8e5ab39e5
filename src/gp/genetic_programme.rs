use crate::data::{OrderCache, QuoteBundle};
use crate::gp::individual::Individual;
use crate::gp::mutator::Mutator;
use crate::trading::StockSizing;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::sync::Arc;

/// Everything one GP run needs besides the quote data itself.
#[derive(Debug, Clone)]
pub struct GpParameters {
    pub breeding_population_size: usize,
    pub min_rule_size: usize,
    pub max_rule_size: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub sizing: StockSizing,
    pub trade_cost: f64,
    pub seed: Option<u64>,
}

/// The generational loop.
///
/// Two populations exist at once: `breeding_population` is the frozen parent
/// pool for the current generation, `next_breeding_population` accumulates
/// candidates for the next one. Both are kept sorted ascending by fitness
/// (index 0 = weakest) with ties resolved by insertion order. Each instance
/// owns its random source, mutator and populations outright, so independent
/// runs can share a quote bundle read-only.
pub struct GeneticProgramme {
    generation: usize,
    breeding_population: Vec<Individual>,
    next_breeding_population: Vec<Individual>,
    mutator: Mutator,
    rng: StdRng,
    quotes: Arc<QuoteBundle>,
    orders: OrderCache,
    params: GpParameters,
}

impl GeneticProgramme {
    pub fn new(quotes: Arc<QuoteBundle>, orders: OrderCache, params: GpParameters) -> Self {
        let (rng, mutator) = match params.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                Mutator::from_seed(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_entropy(), Mutator::from_entropy()),
        };
        Self {
            generation: 1,
            breeding_population: Vec::new(),
            next_breeding_population: Vec::new(),
            mutator,
            rng,
            quotes,
            orders,
            params,
        }
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// One GP step: construct a candidate (random in generation 1, bred
    /// thereafter), validate, evaluate, and offer it to the accumulating
    /// population.
    ///
    /// Returns true iff a valid, evaluated candidate was produced — progress
    /// means "a usable candidate", whether or not it displaced anyone.
    /// Nothing a single candidate does can abort the loop: invalid and
    /// failing candidates die off silently.
    pub fn propose_individual(&mut self) -> bool {
        let mut candidate = if self.generation == 1 || self.breeding_population.is_empty() {
            Individual::random(&mut self.mutator)
        } else {
            let count = self.breeding_population.len();
            let mother = self.rng.gen_range(0..count);
            let father = self.rng.gen_range(0..count);
            Individual::breed(
                &mut self.rng,
                &mut self.mutator,
                &self.breeding_population[mother],
                &self.breeding_population[father],
            )
        };

        if !candidate.is_valid(self.params.min_rule_size, self.params.max_rule_size) {
            return false;
        }

        match candidate.paper_trade(
            &self.quotes,
            &self.orders,
            self.params.start_date,
            self.params.end_date,
            self.params.initial_capital,
            self.params.sizing,
            self.params.trade_cost,
        ) {
            Ok(_) => {
                self.insert_candidate(candidate);
                true
            }
            Err(err) => {
                log::debug!("candidate died during evaluation: {}", err);
                false
            }
        }
    }

    /// Promote the accumulated candidates to the parent pool and bump the
    /// generation. The accumulator is left as is, still collecting — the
    /// weakest member of the parent pool can therefore never get weaker
    /// from one generation to the next.
    pub fn advance_generation(&mut self) -> usize {
        self.breeding_population = self.next_breeding_population.clone();
        self.generation += 1;
        self.generation
    }

    /// The `index`-th parent in fitness order; 0 is the weakest. Uniform
    /// indices over `[0, breeding_population_len)` drive parent selection.
    pub fn breeding_individual(&self, index: usize) -> &Individual {
        &self.breeding_population[index]
    }

    pub fn breeding_population_len(&self) -> usize {
        self.breeding_population.len()
    }

    pub fn breeding_population(&self) -> &[Individual] {
        &self.breeding_population
    }

    pub fn next_population_len(&self) -> usize {
        self.next_breeding_population.len()
    }

    /// Fittest candidate accumulated so far.
    pub fn best_candidate(&self) -> Option<&Individual> {
        self.next_breeding_population.last()
    }

    /// Weakest member of the accumulating population.
    pub fn weakest_candidate(&self) -> Option<&Individual> {
        self.next_breeding_population.first()
    }

    fn insert_candidate(&mut self, candidate: Individual) {
        let capacity = self.params.breeding_population_size;
        let population = &mut self.next_breeding_population;
        if population.len() >= capacity {
            // At capacity the newcomer must strictly beat the weakest, who
            // is evicted in the same step.
            if candidate.compare(&population[0]) != Ordering::Greater {
                return;
            }
            population.remove(0);
        }
        let position =
            population.partition_point(|existing| existing.compare(&candidate) != Ordering::Greater);
        population.insert(position, candidate);
    }
}
