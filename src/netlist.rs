mod cell_library;
mod reader;

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::ndarr::Arr2;
use crate::util::{hash_map, hash_set, HashM, HashS};

pub use cell_library::{CellLibrary, StdCell};
pub use reader::{parse_modules, read_module_file};

/// Position of the pseudo-gate whose outputs are the module's primary inputs.
pub const INPUTS_GATE: usize = 0;
/// Position of the pseudo-gate whose inputs are the module's primary outputs.
pub const OUTPUTS_GATE: usize = 1;
/// Position of the first real cell instance.
pub const FIRST_CELL: usize = 2;

/// A cell instance: library cell name, its footprint, and the nets bound to its pins.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
	pub name: String,
	pub width: f64,
	pub length: f64,
	pub inputs: Vec<String>,
	pub outputs: Vec<String>,
}

impl Gate {
	pub fn new<S: Into<String>>(
		name: S,
		(width, length): (f64, f64),
		inputs: Vec<String>,
		outputs: Vec<String>,
	) -> Self {
		Self {
			name: name.into(),
			width,
			length,
			inputs,
			outputs,
		}
	}

	fn primary_inputs(nets: Vec<String>) -> Self {
		Self::new("inputs", (0.0, 0.0), vec![], nets)
	}

	fn primary_outputs(nets: Vec<String>) -> Self {
		Self::new("outputs", (0.0, 0.0), nets, vec![])
	}
}

/// An ordered gate list with the two pseudo I/O gates first, plus its symmetric connectivity
/// matrix. Entry `(i, j)` counts the pin-to-pin net connections between gates `i` and `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
	pub name: String,
	gates: Vec<Gate>,
	connections: Arr2<u32>,
}

impl Module {
	pub fn new<S: Into<String>>(
		name: S,
		inputs: Vec<String>,
		outputs: Vec<String>,
		cells: Vec<Gate>,
	) -> Self {
		let mut gates = Vec::with_capacity(cells.len() + FIRST_CELL);
		gates.push(Gate::primary_inputs(inputs));
		gates.push(Gate::primary_outputs(outputs));
		gates.extend(cells);
		let connections = connectivity_of(&gates);
		Self {
			name: name.into(),
			gates,
			connections,
		}
	}

	/// Real cell instances only. Floorplan operands and partitioner vertices index into this.
	pub fn cells(&self) -> &[Gate] {
		&self.gates[FIRST_CELL..]
	}

	pub fn num_cells(&self) -> usize {
		self.gates.len() - FIRST_CELL
	}

	pub fn inputs(&self) -> &[String] {
		&self.gates[INPUTS_GATE].outputs
	}

	pub fn outputs(&self) -> &[String] {
		&self.gates[OUTPUTS_GATE].inputs
	}

	pub fn connections(&self) -> &Arr2<u32> {
		&self.connections
	}

	/// Connectivity between two real cells, by cell index.
	pub fn cell_connection(&self, a: usize, b: usize) -> u32 {
		self.connections[(a + FIRST_CELL, b + FIRST_CELL)]
	}

	/// Connectivity restricted to the real cells, diagonal forced to zero.
	pub fn cell_connectivity(&self) -> Arr2<u32> {
		Arr2::square_from_fn(self.num_cells(), |i, j| {
			if i == j {
				0
			} else {
				self.cell_connection(i, j)
			}
		})
	}

	/// Builds the module holding the cells in `keep`, re-deriving its primary I/O. Nets driven by a
	/// kept cell become outputs when the parent exported them, when a `sibling` cell consumes them,
	/// or when nothing kept consumes them. Nets consumed by a kept cell without a kept driver become
	/// inputs.
	pub fn split_off<S: Into<String>>(&self, name: S, keep: &[usize], sibling: &[usize]) -> Module {
		let cells = self.cells();
		let produced: HashS<&str> = keep
			.iter()
			.flat_map(|&c| cells[c].outputs.iter().map(String::as_str))
			.collect();
		let consumed: HashS<&str> = keep
			.iter()
			.flat_map(|&c| cells[c].inputs.iter().map(String::as_str))
			.collect();
		let consumed_by_sibling: HashS<&str> = sibling
			.iter()
			.flat_map(|&c| cells[c].inputs.iter().map(String::as_str))
			.collect();
		let parent_outputs: HashS<&str> = self.outputs().iter().map(String::as_str).collect();

		let inputs: BTreeSet<&str> = consumed
			.iter()
			.copied()
			.filter(|net| !produced.contains(net))
			.collect();
		let outputs: BTreeSet<&str> = produced
			.iter()
			.copied()
			.filter(|net| {
				parent_outputs.contains(net)
					|| consumed_by_sibling.contains(net)
					|| !consumed.contains(net)
			})
			.collect();

		Module::new(
			name,
			inputs.into_iter().map(str::to_owned).collect_vec(),
			outputs.into_iter().map(str::to_owned).collect_vec(),
			keep.iter().map(|&c| cells[c].clone()).collect_vec(),
		)
	}
}

/// For every net, each (driver pin, sink pin) pair on different gates adds one to both `(d, s)`
/// and `(s, d)`.
fn connectivity_of(gates: &[Gate]) -> Arr2<u32> {
	let n = gates.len();
	let mut ret = Arr2::new([n, n]);
	let mut sinks: HashM<&str, Vec<usize>> = hash_map();
	for (idx, gate) in gates.iter().enumerate() {
		for net in &gate.inputs {
			sinks.entry(net.as_str()).or_default().push(idx);
		}
	}
	for (driver, gate) in gates.iter().enumerate() {
		for net in &gate.outputs {
			let Some(sinks) = sinks.get(net.as_str()) else {
				continue;
			};
			for &sink in sinks {
				if sink == driver {
					continue;
				}
				ret[(driver, sink)] += 1;
				ret[(sink, driver)] += 1;
			}
		}
	}
	ret
}

/// Nets that are an input of one module and an output of the other.
pub fn external_wire_cost(a: &Module, b: &Module) -> usize {
	let a_out: HashS<&str> = a.outputs().iter().map(String::as_str).collect();
	let b_out: HashS<&str> = b.outputs().iter().map(String::as_str).collect();
	let mut wires = hash_set::<&str>();
	wires.extend(
		a.inputs()
			.iter()
			.map(String::as_str)
			.filter(|n| b_out.contains(n)),
	);
	wires.extend(
		b.inputs()
			.iter()
			.map(String::as_str)
			.filter(|n| a_out.contains(n)),
	);
	wires.len()
}

#[cfg(test)]
pub(crate) mod test {
	use super::*;

	fn nets(names: &[&str]) -> Vec<String> {
		names.iter().map(|s| s.to_string()).collect_vec()
	}

	pub(crate) fn gate(name: &str, ins: &[&str], outs: &[&str]) -> Gate {
		Gate::new(name, (2.0, 3.0), nets(ins), nets(outs))
	}

	/// a,b -> g0 -> n1 -> g1 -> n2 -> g2 -> y, with g3 also reading n1 and driving z.
	pub(crate) fn chain_module() -> Module {
		Module::new(
			"chain",
			nets(&["a", "b"]),
			nets(&["y", "z"]),
			vec![
				gate("nand", &["a", "b"], &["n1"]),
				gate("inv", &["n1"], &["n2"]),
				gate("inv", &["n2"], &["y"]),
				gate("inv", &["n1"], &["z"]),
			],
		)
	}

	#[test]
	fn connectivity_is_symmetric_with_zero_diagonal() {
		let m = chain_module();
		let c = m.connections();
		assert_eq!(c.dims(), (6, 6));
		for i in 0..6 {
			assert_eq!(c[(i, i)], 0);
			for j in 0..6 {
				assert_eq!(c[(i, j)], c[(j, i)]);
			}
		}
		// inputs pseudo-gate feeds the nand twice (a and b)
		assert_eq!(c[(INPUTS_GATE, FIRST_CELL)], 2);
		assert_eq!(m.cell_connection(0, 1), 1);
		assert_eq!(m.cell_connection(0, 3), 1);
		assert_eq!(m.cell_connection(1, 3), 0);
		assert_eq!(c[(OUTPUTS_GATE, FIRST_CELL + 2)], 1);
	}

	#[test]
	fn split_rederives_io() {
		let m = chain_module();
		let left = m.split_off("l", &[0, 3], &[1, 2]);
		let right = m.split_off("r", &[1, 2], &[0, 3]);
		assert_eq!(left.inputs(), &nets(&["a", "b"])[..]);
		assert_eq!(left.outputs(), &nets(&["n1", "z"])[..]);
		assert_eq!(right.inputs(), &nets(&["n1"])[..]);
		assert_eq!(right.outputs(), &nets(&["y"])[..]);
		assert_eq!(left.num_cells(), 2);
		assert_eq!(left.cell_connection(0, 1), 1);
		assert_eq!(external_wire_cost(&left, &right), 1);
	}

	#[test]
	fn self_loop_is_not_counted() {
		let m = Module::new("loop", vec![], vec![], vec![gate("latch", &["q"], &["q"])]);
		assert_eq!(m.cell_connection(0, 0), 0);
	}
}
