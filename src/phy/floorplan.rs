use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use super::genetic::{Citizen, GeneticAlgorithm, GeneticParams};
use super::polish::{
	adjacency_graph, evaluate, Adjacency, AdjacencyGraph, Cut, InvalidExpression,
	PolishExpression, Token,
};
use crate::netlist::Module;
use crate::svg::SVG;
use crate::{Error, Result};

/// Fitness of a candidate whose expression does not describe a slicing floorplan.
pub const INVALID_FITNESS: f64 = f64::MAX;

/// Weighted wire-length estimate over every adjacent pair in `graph`.
fn graph_wire_length(module: &Module, graph: &AdjacencyGraph) -> f64 {
	let cells = module.cells();
	let n = graph.dims().0;
	let mut ret = 0.0;
	for (i, j) in (0..n).cartesian_product(0..n) {
		let distance = match graph[(i, j)] {
			Adjacency::None => continue,
			Adjacency::H => (cells[i].length + cells[j].length) / 2.0,
			Adjacency::V => (cells[i].width + cells[j].width) / 2.0,
		};
		ret += distance * module.cell_connection(i, j) as f64;
	}
	ret
}

/// Wire length of `polish` laid out over `module`, or `None` when the expression is malformed.
pub fn wire_length(module: &Module, polish: &PolishExpression) -> Option<f64> {
	adjacency_graph(polish, module.num_cells())
		.ok()
		.map(|graph| graph_wire_length(module, &graph))
}

/// One candidate floorplan of a shared, read-only module.
#[derive(Debug, Clone)]
pub struct FloorplanCitizen {
	module: Arc<Module>,
	polish: PolishExpression,
	/// `op_counts[i]` is the number of operators in `polish[..=i]`.
	op_counts: Vec<usize>,
	adjacency: std::result::Result<AdjacencyGraph, InvalidExpression>,
	fitness: f64,
}

impl FloorplanCitizen {
	/// Every cell stacked vertically in index order.
	pub fn new(module: Arc<Module>) -> Self {
		let polish = PolishExpression::vertical_chain(module.num_cells());
		Self::with_polish(module, polish)
	}

	pub fn with_polish(module: Arc<Module>, polish: PolishExpression) -> Self {
		let op_counts = polish.operator_counts();
		let adjacency = adjacency_graph(&polish, module.num_cells());
		Self {
			module,
			polish,
			op_counts,
			adjacency,
			fitness: INVALID_FITNESS,
		}
	}

	pub fn polish(&self) -> &PolishExpression {
		&self.polish
	}

	pub fn into_polish(self) -> PolishExpression {
		self.polish
	}

	pub fn operator_counts(&self) -> &[usize] {
		&self.op_counts
	}

	pub fn adjacency(&self) -> std::result::Result<&AdjacencyGraph, &InvalidExpression> {
		self.adjacency.as_ref()
	}

	pub fn is_valid(&self) -> bool {
		self.adjacency.is_ok()
	}

	fn rebuild_adjacency(&mut self) {
		self.adjacency = adjacency_graph(&self.polish, self.module.num_cells());
	}

	/// Exchanges two random operands. Operator positions are untouched so `op_counts` stays as is,
	/// and a valid graph is relabelled in place instead of rebuilt.
	pub fn swap_operands(&mut self, rng: &mut StdRng) {
		let operands = self
			.polish
			.tokens()
			.iter()
			.positions(|t| !t.is_operator())
			.collect_vec();
		if operands.len() < 2 {
			return;
		}
		let a = rng.random_range(0..operands.len());
		let mut b = rng.random_range(0..operands.len() - 1);
		if b >= a {
			b += 1;
		}
		let (pa, pb) = (operands[a], operands[b]);
		let tokens = self.polish.tokens_mut();
		let (Token::Operand(ga), Token::Operand(gb)) = (tokens[pa], tokens[pb]) else {
			return;
		};
		tokens.swap(pa, pb);
		match &mut self.adjacency {
			Ok(graph) => graph.swap_vertices(ga, gb),
			Err(_) => self.rebuild_adjacency(),
		}
	}

	/// Flips every operator of one randomly chosen maximal operator run.
	pub fn complement_chain(&mut self, rng: &mut StdRng) {
		let tokens = self.polish.tokens();
		let starts = (0..tokens.len())
			.filter(|&i| tokens[i].is_operator() && (i == 0 || !tokens[i - 1].is_operator()))
			.collect_vec();
		if starts.is_empty() {
			return;
		}
		let start = starts[rng.random_range(0..starts.len())];
		for t in self.polish.tokens_mut()[start..].iter_mut() {
			match t {
				Token::Operator(cut) => *cut = cut.complement(),
				Token::Operand(_) => break,
			}
		}
		self.rebuild_adjacency();
	}

	/// Swaps an operand with a neighbouring operator. A position `i` qualifies when its neighbours
	/// differ or fewer than `i / 2` operators precede it. This can still admit an invalid
	/// expression, which the graph rebuild then flags.
	pub fn swap_operand_operator(&mut self, rng: &mut StdRng) {
		let tokens = self.polish.tokens();
		let len = tokens.len();
		let mut candidates = vec![];
		for i in 1..len.saturating_sub(1) {
			if tokens[i].is_operator() {
				continue;
			}
			if tokens[i - 1] == tokens[i + 1] && 2 * self.op_counts[i] >= i {
				continue;
			}
			for j in [i - 1, i + 1] {
				if tokens[j].is_operator() {
					candidates.push((i, j));
				}
			}
		}
		if candidates.is_empty() {
			return;
		}
		let (i, j) = candidates[rng.random_range(0..candidates.len())];
		self.polish.tokens_mut().swap(i, j);

		let (lo, hi) = (i.min(j), i.max(j));
		let tokens = self.polish.tokens();
		let before = if lo == 0 { 0 } else { self.op_counts[lo - 1] };
		self.op_counts[lo] = before + tokens[lo].is_operator() as usize;
		self.op_counts[hi] = self.op_counts[lo] + tokens[hi].is_operator() as usize;
		self.rebuild_adjacency();
	}
}

impl Citizen for FloorplanCitizen {
	type Seed = Arc<Module>;

	fn spawn(seed: &Arc<Module>, _rng: &mut StdRng) -> Self {
		Self::new(Arc::clone(seed))
	}

	fn calc_fitness(&mut self) {
		self.fitness = match &self.adjacency {
			Ok(graph) => graph_wire_length(&self.module, graph),
			Err(_) => INVALID_FITNESS,
		};
	}

	fn fitness(&self) -> f64 {
		self.fitness
	}

	fn mate(mom: &Self, dad: &Self, rng: &mut StdRng) -> Self {
		if rng.random_bool(0.5) {
			mom.clone()
		} else {
			dad.clone()
		}
	}

	fn mutate(&mut self, rng: &mut StdRng) {
		match rng.random_range(0..3) {
			0 => self.swap_operands(rng),
			1 => self.complement_chain(rng),
			_ => self.swap_operand_operator(rng),
		}
	}
}

/// Searches for a low wire-length slicing floorplan of `module`.
pub fn floorplan(
	module: &Module,
	params: &GeneticParams,
	rng: &mut StdRng,
) -> Result<PolishExpression> {
	let ga = GeneticAlgorithm::new(*params)?;
	if module.num_cells() < 2 {
		return Ok(PolishExpression::vertical_chain(module.num_cells()));
	}
	let seed = Arc::new(module.clone());
	let run = ga.run::<FloorplanCitizen>(&seed, rng);
	log::info!(
		"Floorplanned \"{}\" ({} cells): wire length {} after {} generations",
		module.name,
		module.num_cells(),
		run.best.fitness(),
		run.generations
	);
	Ok(run.best.into_polish())
}

/// Floorplans every module with at most `limit` running at once. Module `i` draws from its own RNG
/// seeded with `seed + i`, so results do not depend on scheduling and come back in input order.
pub fn floorplan_all(
	modules: &[Module],
	params: &GeneticParams,
	limit: usize,
	seed: u64,
) -> Result<Vec<PolishExpression>> {
	if limit == 0 {
		return Err(Error::ConcurrencyLimit);
	}
	let pool = rayon::ThreadPoolBuilder::new().num_threads(limit).build()?;
	pool.install(|| {
		modules
			.par_iter()
			.enumerate()
			.map(|(i, module)| {
				let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
				floorplan(module, params, &mut rng)
			})
			.collect()
	})
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGate {
	/// Cell index within the module.
	pub gate: usize,
	pub x: f64,
	pub y: f64,
	pub w: f64,
	pub h: f64,
}

/// Rectangles of a slicing floorplan, origin at the lower left.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlicingLayout {
	pub width: f64,
	pub height: f64,
	pub rects: Vec<PlacedGate>,
}

/// Lays the expression out bottom-up. `H` puts the right operand to the right of the left one,
/// `V` stacks it on top. A cell spans its length along x and its width along y.
pub fn slicing_layout(
	expr: &PolishExpression,
	module: &Module,
) -> std::result::Result<SlicingLayout, InvalidExpression> {
	let cells = module.cells();
	let layout = evaluate(
		expr,
		module.num_cells(),
		|g| SlicingLayout {
			width: cells[g].length,
			height: cells[g].width,
			rects: vec![PlacedGate {
				gate: g,
				x: 0.0,
				y: 0.0,
				w: cells[g].length,
				h: cells[g].width,
			}],
		},
		|cut, mut lhs, rhs| {
			let (dx, dy) = match cut {
				Cut::H => (lhs.width, 0.0),
				Cut::V => (0.0, lhs.height),
			};
			lhs.rects.extend(rhs.rects.into_iter().map(|r| PlacedGate {
				x: r.x + dx,
				y: r.y + dy,
				..r
			}));
			match cut {
				Cut::H => {
					lhs.width += rhs.width;
					lhs.height = lhs.height.max(rhs.height);
				},
				Cut::V => {
					lhs.width = lhs.width.max(rhs.width);
					lhs.height += rhs.height;
				},
			}
			lhs
		},
	)?;
	Ok(layout.unwrap_or_default())
}

const SVG_SCALE: f64 = 20.0;

/// Renders the floorplan of `module` with a line between every connected adjacent pair.
pub fn save_floorplan_svg<P: AsRef<Path>>(
	module: &Module,
	expr: &PolishExpression,
	path: P,
) -> Result<()> {
	let invalid = |source| Error::Floorplan {
		module: module.name.clone(),
		source,
	};
	let layout = slicing_layout(expr, module).map_err(invalid)?;
	let graph = adjacency_graph(expr, module.num_cells()).map_err(invalid)?;
	let px = |v: f64| (v * SVG_SCALE).round() as i32;

	let mut svg = SVG::new();
	let mut ids = vec![0; module.num_cells()];
	for r in &layout.rects {
		let cell = &module.cells()[r.gate];
		ids[r.gate] = svg.add_rect(
			px(r.x),
			px(layout.height - r.y - r.h),
			px(r.w),
			px(r.h),
			gate_colour(&cell.name),
			Some(r.gate.to_string()),
			Some(format!(
				"{} {}: {} -> {}",
				cell.name,
				r.gate,
				cell.inputs.join(","),
				cell.outputs.join(",")
			)),
		);
	}
	let n = module.num_cells();
	for (i, j) in (0..n).cartesian_product(0..n) {
		if module.cell_connection(i, j) == 0 {
			continue;
		}
		match graph[(i, j)] {
			Adjacency::None => {},
			Adjacency::H => {
				svg.add_wire(ids[i], ids[j], "red");
			},
			Adjacency::V => {
				svg.add_wire(ids[i], ids[j], "green");
			},
		}
	}
	svg.save(path.as_ref())?;
	log::debug!("Wrote floorplan of \"{}\" to {}", module.name, path.as_ref().display());
	Ok(())
}

/// Stable pastel colour per cell type.
fn gate_colour(name: &str) -> (u8, u8, u8) {
	let h = name
		.bytes()
		.fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
	(
		160 + (h & 0x5f) as u8,
		160 + ((h >> 8) & 0x5f) as u8,
		160 + ((h >> 16) & 0x5f) as u8,
	)
}
