use crate::gp::genetic_programme::GeneticProgramme;
use crate::gp::individual::Individual;
use std::sync::atomic::{AtomicBool, Ordering};

/// Observer hooks for a running evolution.
pub trait ProgressCallback {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, generation: usize, best_value: Option<f64>, population: usize);
    fn on_proposal(&mut self, proposal: usize, total: usize, progressed: bool);
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        println!("Generation {} starting...", generation);
    }

    fn on_generation_complete(&mut self, generation: usize, best_value: Option<f64>, population: usize) {
        match best_value {
            Some(value) => println!(
                "Generation {} complete. Best portfolio value: {:.2}, population: {}",
                generation, value, population
            ),
            None => println!(
                "Generation {} complete. No surviving candidates yet.",
                generation
            ),
        }
    }

    fn on_proposal(&mut self, proposal: usize, total: usize, _progressed: bool) {
        if proposal % 100 == 0 || proposal == total {
            println!("  Proposed {}/{} candidates", proposal, total);
        }
    }
}

/// Drive a GP instance for `generations` generations of
/// `proposals_per_generation` proposals each.
///
/// The cancellation flag is checked between proposals; setting it stops the
/// run at the next boundary with whatever has been accumulated. Returns the
/// final parent pool, fittest first.
pub fn run<C: ProgressCallback>(
    gp: &mut GeneticProgramme,
    generations: usize,
    proposals_per_generation: usize,
    cancel: &AtomicBool,
    callback: &mut C,
) -> Vec<Individual> {
    'generations: for _ in 0..generations {
        let generation = gp.generation();
        callback.on_generation_start(generation);

        let mut progressed = 0usize;
        for proposal in 1..=proposals_per_generation {
            if cancel.load(Ordering::Relaxed) {
                log::info!("evolution cancelled in generation {}", generation);
                break 'generations;
            }
            if gp.propose_individual() {
                progressed += 1;
            }
            callback.on_proposal(proposal, proposals_per_generation, progressed > 0);
        }

        gp.advance_generation();
        callback.on_generation_complete(
            generation,
            gp.best_candidate().and_then(Individual::value),
            gp.breeding_population_len(),
        );
    }

    let mut elites: Vec<Individual> = gp.breeding_population().to_vec();
    elites.reverse();
    elites
}
