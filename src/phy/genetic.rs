use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A member of a population. Lower fitness is better.
pub trait Citizen: Clone {
	/// Shared read-only data every citizen is built from.
	type Seed: ?Sized;

	fn spawn(seed: &Self::Seed, rng: &mut StdRng) -> Self;

	fn calc_fitness(&mut self);

	fn fitness(&self) -> f64;

	fn mate(mom: &Self, dad: &Self, rng: &mut StdRng) -> Self;

	fn mutate(&mut self, rng: &mut StdRng);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneticParams {
	pub population_size: usize,
	pub max_generations: usize,
	/// Fraction of the sorted population copied unchanged into the next generation.
	pub elite_rate: f64,
	/// Probability that a freshly mated child is mutated.
	pub mutate_rate: f64,
	/// A run stops as soon as the best citizen is at or below this.
	pub target_fitness: f64,
}

impl Default for GeneticParams {
	fn default() -> Self {
		Self {
			population_size: 2048,
			max_generations: 16438,
			elite_rate: 0.10,
			mutate_rate: 0.10,
			target_fitness: 1.0,
		}
	}
}

impl GeneticParams {
	/// Smaller, mutation-heavy settings tuned for floorplan search.
	pub fn floorplan() -> Self {
		Self {
			population_size: 32,
			max_generations: 64,
			elite_rate: 0.10,
			mutate_rate: 0.60,
			target_fitness: 1.0,
		}
	}

	pub fn validate(&self) -> Result<()> {
		if self.population_size < 2 {
			return Err(Error::GeneticParams(format!(
				"population_size must be at least 2, got {}",
				self.population_size
			)));
		}
		if self.max_generations == 0 {
			return Err(Error::GeneticParams(
				"max_generations must be at least 1".to_owned(),
			));
		}
		for (name, rate) in [
			("elite_rate", self.elite_rate),
			("mutate_rate", self.mutate_rate),
		] {
			if !(0.0..=1.0).contains(&rate) {
				return Err(Error::GeneticParams(format!(
					"{name} must be within [0, 1], got {rate}"
				)));
			}
		}
		Ok(())
	}

	/// At least one elite survives so the best fitness never regresses.
	pub fn elite_count(&self) -> usize {
		((self.population_size as f64 * self.elite_rate) as usize).clamp(1, self.population_size)
	}
}

#[derive(Debug, Clone)]
pub struct Evolution<C> {
	pub best: C,
	pub generations: usize,
	/// Best fitness of each evaluated generation, in order.
	pub best_per_generation: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct GeneticAlgorithm {
	params: GeneticParams,
}

impl GeneticAlgorithm {
	pub fn new(params: GeneticParams) -> Result<Self> {
		params.validate()?;
		Ok(Self { params })
	}

	pub fn run<C: Citizen>(&self, seed: &C::Seed, rng: &mut StdRng) -> Evolution<C> {
		let params = &self.params;
		let mut population = (0..params.population_size)
			.map(|_| C::spawn(seed, rng))
			.collect::<Vec<_>>();
		let mut best_per_generation = Vec::with_capacity(params.max_generations);

		for generation in 0..params.max_generations {
			population.iter_mut().for_each(C::calc_fitness);
			population.sort_by(|a, b| a.fitness().total_cmp(&b.fitness()));
			let best = population[0].fitness();
			best_per_generation.push(best);
			log::debug!("Generation {generation}: best fitness {best}");

			if best <= params.target_fitness || generation + 1 == params.max_generations {
				break;
			}
			population = self.next_generation(&population, rng);
		}

		let generations = best_per_generation.len();
		let best = population.swap_remove(0);
		Evolution {
			best,
			generations,
			best_per_generation,
		}
	}

	/// Elites carry over, the rest are children of two random parents from the better half.
	fn next_generation<C: Citizen>(&self, sorted: &[C], rng: &mut StdRng) -> Vec<C> {
		let params = &self.params;
		let elite = params.elite_count();
		let parents = (params.population_size / 2).max(1);
		let mut next = Vec::with_capacity(params.population_size);
		next.extend(sorted[..elite].iter().cloned());
		for _ in elite..params.population_size {
			let mom = &sorted[rng.random_range(0..parents)];
			let dad = &sorted[rng.random_range(0..parents)];
			let mut child = C::mate(mom, dad, rng);
			if rng.random_bool(params.mutate_rate) {
				child.mutate(rng);
			}
			next.push(child);
		}
		next
	}
}

#[cfg(test)]
mod test {
	use rand::SeedableRng;

	use super::*;

	const TARGET: &[u8] = b"Hello world!";

	/// Evolves a string towards `TARGET`; fitness is the summed byte distance.
	#[derive(Clone, Debug)]
	struct Phrase {
		text: Vec<u8>,
		fitness: f64,
	}

	impl Citizen for Phrase {
		type Seed = [u8];

		fn spawn(seed: &[u8], rng: &mut StdRng) -> Self {
			Self {
				text: seed.iter().map(|_| rng.random_range(32..122)).collect(),
				fitness: f64::MAX,
			}
		}

		fn calc_fitness(&mut self) {
			self.fitness = self
				.text
				.iter()
				.zip(TARGET)
				.map(|(a, b)| (*a as i32 - *b as i32).abs() as f64)
				.sum();
		}

		fn fitness(&self) -> f64 {
			self.fitness
		}

		fn mate(mom: &Self, dad: &Self, rng: &mut StdRng) -> Self {
			let split = rng.random_range(0..mom.text.len());
			let mut text = mom.text[..split].to_vec();
			text.extend_from_slice(&dad.text[split..]);
			Self {
				text,
				fitness: f64::MAX,
			}
		}

		fn mutate(&mut self, rng: &mut StdRng) {
			let pos = rng.random_range(0..self.text.len());
			self.text[pos] = rng.random_range(32..122);
		}
	}

	fn params(population_size: usize, max_generations: usize) -> GeneticParams {
		GeneticParams {
			population_size,
			max_generations,
			elite_rate: 0.10,
			mutate_rate: 0.25,
			target_fitness: 0.0,
		}
	}

	#[test]
	fn best_fitness_never_regresses() {
		let mut rng = StdRng::seed_from_u64(42);
		let ga = GeneticAlgorithm::new(params(128, 200)).unwrap();
		let run = ga.run::<Phrase>(TARGET, &mut rng);
		assert_eq!(run.generations, run.best_per_generation.len());
		for w in run.best_per_generation.windows(2) {
			assert!(w[1] <= w[0], "{} regressed to {}", w[0], w[1]);
		}
		assert!(run.best.fitness() < run.best_per_generation[0]);
		assert_eq!(run.best.fitness(), *run.best_per_generation.last().unwrap());
	}

	#[test]
	fn stops_at_target() {
		let mut rng = StdRng::seed_from_u64(1);
		let ga = GeneticAlgorithm::new(GeneticParams {
			target_fitness: f64::MAX,
			..params(8, 50)
		})
		.unwrap();
		let run = ga.run::<Phrase>(TARGET, &mut rng);
		assert_eq!(run.generations, 1);
	}

	#[test]
	fn runs_all_generations_when_target_unreachable() {
		let mut rng = StdRng::seed_from_u64(3);
		let ga = GeneticAlgorithm::new(GeneticParams {
			target_fitness: -1.0,
			..params(16, 7)
		})
		.unwrap();
		let run = ga.run::<Phrase>(TARGET, &mut rng);
		assert_eq!(run.generations, 7);
	}

	#[test]
	fn invalid_params() {
		assert!(GeneticAlgorithm::new(params(1, 10)).is_err());
		assert!(GeneticAlgorithm::new(params(10, 0)).is_err());
		assert!(GeneticAlgorithm::new(GeneticParams {
			mutate_rate: 1.5,
			..params(10, 10)
		})
		.is_err());
	}

	#[test]
	fn elite_count_floor_and_minimum() {
		assert_eq!(params(32, 1).elite_count(), 3);
		assert_eq!(
			GeneticParams {
				elite_rate: 0.0,
				..params(32, 1)
			}
			.elite_count(),
			1
		);
		assert_eq!(GeneticParams::default().elite_count(), 204);
	}
}
