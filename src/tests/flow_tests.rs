use itertools::Itertools;
use rand::{rngs::StdRng, SeedableRng};

use crate::netlist::{parse_modules, CellLibrary, Module};
use crate::padframe::Padframe;
use crate::phy::{
	adjacency_graph, estimate_dims, fits, floorplan, floorplan_all, partition, partition_to_fit,
	wire_length, GeneticParams, PolishExpression,
};
use crate::subckt::SubcktWriter;

const LIB: &str = "\
.cell inv   1 2 A.I Y.O
.cell nand2 2 2 A.I B.I Y.O
.cell xor2  3 2 A.I B.I Y.O
";

/// Two xor trees joined by a single nand, so the obvious cut crosses one net.
const NETLIST: &str = "\
.model twin
.inputs a b c d e f g h
.outputs y
.gate xor2 A=a B=b Y=l0
.gate xor2 A=c B=d Y=l1
.gate xor2 A=l0 B=l1 Y=l2
.gate inv A=l2 Y=l3
.gate xor2 A=e B=f Y=r0
.gate xor2 A=g B=h Y=r1
.gate xor2 A=r0 B=r1 Y=r2
.gate inv A=r2 Y=r3
.gate nand2 A=l3 B=r3 Y=y
.end
";

fn twin() -> Module {
	let cells = CellLibrary::parse(LIB, "flow.cell").unwrap();
	parse_modules(NETLIST, &cells).unwrap().remove(0)
}

fn params() -> GeneticParams {
	GeneticParams {
		population_size: 24,
		max_generations: 24,
		..GeneticParams::floorplan()
	}
}

#[test]
fn partition_separates_the_trees() {
	let m = twin();
	assert_eq!(m.num_cells(), 9);
	let (a, b) = partition(&m).unwrap();
	assert_eq!(a.num_cells() + b.num_cells(), 9);
	assert!(a.num_cells().abs_diff(b.num_cells()) <= 1);

	// Whatever KL picks, the two halves must agree on the nets they exchange.
	for net in a.outputs().iter().filter(|n| b.inputs().contains(*n)) {
		assert!(a.cells().iter().any(|c| c.outputs.contains(net)));
		assert!(b.cells().iter().any(|c| c.inputs.contains(net)));
	}
	for net in b.inputs() {
		let from_parent = m.inputs().contains(net);
		let from_sibling = a.cells().iter().any(|c| c.outputs.contains(net));
		assert!(from_parent || from_sibling, "{net} has no driver");
	}
}

#[test]
fn pieces_fit_and_floorplans_cover_them() {
	let budget = Padframe::parse(".USABLE 16 8\n.SLICES 2 2\n")
		.unwrap()
		.area_budget();
	let m = twin();
	assert!(!fits(&m, budget));
	let pieces = partition_to_fit(m.clone(), budget).unwrap();
	for p in &pieces {
		let (w, h) = estimate_dims(p, budget.slice_width);
		assert!(fits(p, budget) || p.num_cells() == 1, "{w}x{h}");
	}
	let names = pieces
		.iter()
		.flat_map(|p| p.cells().iter().map(|c| c.outputs.clone()))
		.sorted()
		.collect_vec();
	let expected = m
		.cells()
		.iter()
		.map(|c| c.outputs.clone())
		.sorted()
		.collect_vec();
	assert_eq!(names, expected);

	let plans = floorplan_all(&pieces, &params(), 3, 5).unwrap();
	for (piece, plan) in pieces.iter().zip(&plans) {
		assert_eq!(plan.num_operands(), piece.num_cells());
		assert!(adjacency_graph(plan, piece.num_cells()).is_ok());
	}

	let cells = CellLibrary::parse(LIB, "flow.cell").unwrap();
	let mut w = SubcktWriter::new(vec![], 2, &cells);
	w.write_all(&pieces, Some(plans.as_slice())).unwrap();
	assert_eq!(w.next_partition(), pieces.len());
	let text = String::from_utf8(w.into_inner()).unwrap();
	assert_eq!(text.matches(".subckt P2_").count(), pieces.len());
}

#[test]
fn floorplan_improves_on_stacking() {
	let m = twin();
	let mut rng = StdRng::seed_from_u64(2024);
	let best = floorplan(&m, &params(), &mut rng).unwrap();
	let stacked = wire_length(&m, &PolishExpression::vertical_chain(m.num_cells())).unwrap();
	let found = wire_length(&m, &best).unwrap();
	assert!(found <= stacked, "{found} > {stacked}");
}
