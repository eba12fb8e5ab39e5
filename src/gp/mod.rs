pub mod genetic_programme;
pub mod individual;
pub mod mutator;
pub mod runner;

pub use genetic_programme::{GeneticProgramme, GpParameters};
pub use individual::{BreedType, Individual};
pub use mutator::{Mutator, DEFAULT_MUTATION_PERCENT, EXTRA_MUTATION_PERCENT};
pub use runner::{run, ConsoleProgressCallback, ProgressCallback};
