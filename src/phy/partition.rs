use std::collections::BTreeSet;

use itertools::Itertools;

use crate::ndarr::Arr2;
use crate::netlist::Module;
use crate::{Error, Result};

/// Bisects a symmetric weighted graph into two equal halves with the Kernighan-Lin heuristic.
///
/// Starts from `A = 0..n/2`, `B = n/2..n`. Each pass locks the best remaining gain pair `n/2 - 1`
/// times, then commits the prefix of the lock sequence with the largest positive gain sum.
/// Vertices committed in a swap are not picked again in later passes. Stops when no prefix gains.
pub fn kernighan_lin(connectivity: &Arr2<u32>) -> Result<(Vec<usize>, Vec<usize>)> {
	let (rows, cols) = connectivity.dims();
	if rows != cols || rows < 2 || rows % 2 != 0 {
		return Err(Error::InvalidPartitionSize(rows));
	}
	let mut solver = KernighanLinSolver::new(connectivity);
	solver.solve();
	Ok(solver.into_sets())
}

/// Total weight of edges with one end in each half.
pub fn cut_weight(connectivity: &Arr2<u32>, in_a: &[bool]) -> u64 {
	let n = in_a.len();
	let mut ret = 0;
	for i in 0..n {
		for j in i + 1..n {
			if in_a[i] != in_a[j] {
				ret += connectivity[(i, j)] as u64;
			}
		}
	}
	ret
}

/// (a, b, gain) for one locked pair.
type SwapPair = (usize, usize, i64);

struct KernighanLinSolver<'a> {
	matrix: &'a Arr2<u32>,
	in_a: Vec<bool>,
	/// A'
	ap: BTreeSet<usize>,
	/// B'
	bp: BTreeSet<usize>,
	/// Committed in an earlier pass, excluded from selection.
	swapped: Vec<bool>,
	d_values: Vec<i64>,
	gains: Arr2<i64>,
	passes: usize,
}

impl<'a> KernighanLinSolver<'a> {
	fn new(matrix: &'a Arr2<u32>) -> Self {
		let n = matrix.dims().0;
		let mut ret = Self {
			matrix,
			in_a: (0..n).map(|g| g < n / 2).collect_vec(),
			ap: BTreeSet::new(),
			bp: BTreeSet::new(),
			swapped: vec![false; n],
			d_values: vec![0; n],
			gains: Arr2::new([n, n]),
			passes: 0,
		};
		ret.recompute_d_values();
		ret
	}

	fn n(&self) -> usize {
		self.in_a.len()
	}

	fn weight(&self, i: usize, j: usize) -> i64 {
		if i == j {
			0
		} else {
			self.matrix[(i, j)] as i64
		}
	}

	/// D = external - internal, from the committed partition.
	fn recompute_d_values(&mut self) {
		for g in 0..self.n() {
			let mut internal = 0;
			let mut external = 0;
			for h in 0..self.n() {
				let w = self.weight(g, h);
				if self.in_a[g] == self.in_a[h] {
					internal += w;
				} else {
					external += w;
				}
			}
			self.d_values[g] = external - internal;
		}
	}

	fn recalculate_gains(&mut self) {
		self.gains.fill(0);
		for &a in &self.ap {
			for &b in &self.bp {
				self.gains[(a, b)] = self.d_values[a] + self.d_values[b] - 2 * self.weight(a, b);
			}
		}
	}

	/// Row-major scan, first maximum wins.
	fn best_swap_pair(&self) -> Option<SwapPair> {
		let mut best: Option<SwapPair> = None;
		for &a in self.ap.iter().filter(|&&a| !self.swapped[a]) {
			for &b in self.bp.iter().filter(|&&b| !self.swapped[b]) {
				let gain = self.gains[(a, b)];
				if best.map_or(true, |(_, _, g)| gain > g) {
					best = Some((a, b, gain));
				}
			}
		}
		best
	}

	/// Updates D for the unlocked vertices as if `a` and `b` had traded sides.
	fn lock(&mut self, a: usize, b: usize) {
		self.ap.remove(&a);
		self.bp.remove(&b);
		let ap = self.ap.iter().copied().collect_vec();
		let bp = self.bp.iter().copied().collect_vec();
		for x in ap {
			self.d_values[x] += 2 * self.weight(x, a) - 2 * self.weight(x, b);
		}
		for y in bp {
			self.d_values[y] += 2 * self.weight(y, b) - 2 * self.weight(y, a);
		}
		self.recalculate_gains();
	}

	/// (k, g_max) where g_max is the largest prefix sum of gains, first k on ties.
	fn best_partial_sum(pairs: &[SwapPair]) -> Option<(usize, i64)> {
		pairs
			.iter()
			.scan(0, |sum, &(_, _, gain)| {
				*sum += gain;
				Some(*sum)
			})
			.enumerate()
			.fold(None, |best: Option<(usize, i64)>, (k, sum)| match best {
				Some((_, g)) if g >= sum => best,
				_ => Some((k, sum)),
			})
	}

	fn solve(&mut self) {
		let n = self.n();
		loop {
			self.passes += 1;
			self.ap = (0..n).filter(|&g| self.in_a[g]).collect();
			self.bp = (0..n).filter(|&g| !self.in_a[g]).collect();
			self.recompute_d_values();
			self.recalculate_gains();

			let mut swap_pairs: Vec<SwapPair> = Vec::with_capacity(n / 2);
			for _ in 1..n / 2 {
				let Some(pair) = self.best_swap_pair() else {
					break;
				};
				self.lock(pair.0, pair.1);
				swap_pairs.push(pair);
			}

			let Some((k_max, g_max)) = Self::best_partial_sum(&swap_pairs) else {
				break;
			};
			if g_max <= 0 {
				break;
			}
			for &(a, b, _) in &swap_pairs[..=k_max] {
				self.swapped[a] = true;
				self.swapped[b] = true;
				self.in_a[a] = false;
				self.in_a[b] = true;
			}
			log::trace!("KL pass {} committed {} swaps, gain {g_max}", self.passes, k_max + 1);
		}
	}

	fn into_sets(self) -> (Vec<usize>, Vec<usize>) {
		let (a, b): (Vec<usize>, Vec<usize>) = (0..self.n()).partition(|&g| self.in_a[g]);
		log::trace!("KL converged after {} passes", self.passes);
		(a, b)
	}
}

/// Splits a module's cells into two halves and rebuilds each half as a module with its own I/O.
/// An odd cell count is padded with an isolated dummy vertex that is dropped afterwards.
pub fn partition(module: &Module) -> Result<(Module, Module)> {
	let n = module.num_cells();
	if n < 2 {
		return Err(Error::ModuleTooSmall(module.name.clone()));
	}
	let padded = n + n % 2;
	let cell_conn = module.cell_connectivity();
	let connectivity = Arr2::square_from_fn(padded, |i, j| {
		if i < n && j < n {
			cell_conn[(i, j)]
		} else {
			0
		}
	});
	let (a, b) = kernighan_lin(&connectivity)?;
	let a = a.into_iter().filter(|&g| g < n).collect_vec();
	let b = b.into_iter().filter(|&g| g < n).collect_vec();

	report_partition_quality(module, &connectivity, &a, n);

	let first = module.split_off(format!("{}_0", module.name), &a, &b);
	let second = module.split_off(format!("{}_1", module.name), &b, &a);
	Ok((first, second))
}

fn report_partition_quality(module: &Module, connectivity: &Arr2<u32>, a: &[usize], n: usize) {
	let padded = connectivity.dims().0;
	let initial = (0..padded).map(|g| g < padded / 2).collect_vec();
	let mut result = vec![false; padded];
	for &g in a {
		result[g] = true;
	}
	let total: u64 = connectivity.rows().flatten().map(|&w| w as u64).sum::<u64>() / 2;
	log::info!(
		"Partitioned \"{}\": {n} cells -> {}/{}, cut {} -> {} of {total}",
		module.name,
		a.len(),
		n - a.len(),
		cut_weight(connectivity, &initial),
		cut_weight(connectivity, &result),
	);
}
