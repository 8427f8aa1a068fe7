//! `.subckt` emission for partitions.
//!
//! A partition `PP` of slice `S` becomes:
//! ```text
//! #subckt describing partition PP in slice SS
//! .subckt PS_PP a.I b.I y.O
//!   .IN a, b
//!   .OUT y
//!   .WIRE n1
//!   x0	nand2  .A(a)       .B(b)       .Y(n1)
//!   x1	inv    .A(n1)      .Y(y)
//! .end_subckt
//! ```

use std::io::Write;

use itertools::Itertools;

use crate::netlist::{external_wire_cost, CellLibrary, Gate, Module};
use crate::phy::PolishExpression;
use crate::util::{hash_set, HashS};
use crate::Result;

/// Nets in first-use order, each listed once.
struct NetLine<'a> {
	seen: HashS<&'a str>,
	nets: Vec<&'a str>,
}

impl<'a> NetLine<'a> {
	fn new() -> Self {
		Self {
			seen: hash_set(),
			nets: vec![],
		}
	}

	fn push(&mut self, net: &'a str) {
		if self.seen.insert(net) {
			self.nets.push(net);
		}
	}

	fn render(&self, keyword: &str) -> Option<String> {
		if self.nets.is_empty() {
			None
		} else {
			Some(format!("  {keyword} {}", self.nets.iter().join(", ")))
		}
	}
}

/// `.IN`, `.OUT` and `.WIRE` declarations. Pins tied to a primary input/output are declared as
/// such, everything else is an internal wire.
fn declaration_lines(module: &Module) -> Vec<String> {
	let inputs: HashS<&str> = module.inputs().iter().map(String::as_str).collect();
	let outputs: HashS<&str> = module.outputs().iter().map(String::as_str).collect();
	let mut in_line = NetLine::new();
	let mut out_line = NetLine::new();
	let mut wire_line = NetLine::new();
	for gate in module.cells() {
		for net in &gate.inputs {
			if inputs.contains(net.as_str()) {
				in_line.push(net);
			} else {
				wire_line.push(net);
			}
		}
		for net in &gate.outputs {
			if outputs.contains(net.as_str()) {
				out_line.push(net);
			} else {
				wire_line.push(net);
			}
		}
	}
	[
		in_line.render(".IN"),
		out_line.render(".OUT"),
		wire_line.render(".WIRE"),
	]
	.into_iter()
	.flatten()
	.collect_vec()
}

/// `x<k>\tCELL .PIN(NET) ...`, binding the i-th net to the cell's i-th pin of that direction.
fn gate_line(gate: &Gate, index: usize, cells: &CellLibrary) -> Result<String> {
	let cell = cells.get(&gate.name)?;
	let mut ret = format!("  x{index}\t{:<6}", gate.name);
	let bindings = cell
		.inputs
		.iter()
		.zip(&gate.inputs)
		.chain(cell.outputs.iter().zip(&gate.outputs));
	for (pin, net) in bindings {
		ret.push_str(&format!("{:<12}", format!(".{pin}({net})")));
	}
	Ok(ret.trim_end().to_owned())
}

pub fn subckt_name(slice: usize, partition: usize) -> String {
	format!("P{slice}_{partition:02}")
}

pub fn subckt_text(
	module: &Module,
	cells: &CellLibrary,
	slice: usize,
	partition: usize,
) -> Result<String> {
	let mut lines = vec![format!(
		"#subckt describing partition {partition} in slice {slice:02}"
	)];
	let ports = module
		.inputs()
		.iter()
		.map(|n| format!("{n}.I"))
		.chain(module.outputs().iter().map(|n| format!("{n}.O")));
	lines.push(
		std::iter::once(format!(".subckt {}", subckt_name(slice, partition)))
			.chain(ports)
			.join(" "),
	);
	lines.extend(declaration_lines(module));
	for (index, gate) in module.cells().iter().enumerate() {
		lines.push(gate_line(gate, index, cells)?);
	}
	lines.push(".end_subckt".to_owned());
	Ok(lines.into_iter().map(|l| l + "\n").collect())
}

/// Writes the partitions of one slice, numbering them consecutively from `P<slice>_00`.
pub struct SubcktWriter<'a, W: Write> {
	writer: W,
	cells: &'a CellLibrary,
	slice: usize,
	partition: usize,
}

impl<'a, W: Write> SubcktWriter<'a, W> {
	pub fn new(writer: W, slice: usize, cells: &'a CellLibrary) -> Self {
		Self {
			writer,
			cells,
			slice,
			partition: 0,
		}
	}

	/// Number the next written partition gets.
	pub fn next_partition(&self) -> usize {
		self.partition
	}

	fn write_floorplan(
		&mut self,
		partition: usize,
		floorplan: Option<&PolishExpression>,
	) -> Result<()> {
		if let Some(expr) = floorplan {
			writeln!(
				self.writer,
				"#floorplan {}: {expr}",
				subckt_name(self.slice, partition)
			)?;
		}
		Ok(())
	}

	/// Two sibling partitions under a header giving the nets wired between them.
	pub fn write_pair(
		&mut self,
		(a, b): (&Module, &Module),
		floorplans: Option<(&PolishExpression, &PolishExpression)>,
	) -> Result<()> {
		let (pa, pb) = (self.partition, self.partition + 1);
		writeln!(
			self.writer,
			"#External wiring for {},{}: {}",
			subckt_name(self.slice, pa),
			subckt_name(self.slice, pb),
			external_wire_cost(a, b)
		)?;
		writeln!(self.writer, "#Gate counts: {},{}", a.num_cells(), b.num_cells())?;
		writeln!(self.writer)?;
		self.write_floorplan(pa, floorplans.map(|f| f.0))?;
		write!(self.writer, "{}", subckt_text(a, self.cells, self.slice, pa)?)?;
		writeln!(self.writer)?;
		self.write_floorplan(pb, floorplans.map(|f| f.1))?;
		write!(self.writer, "{}", subckt_text(b, self.cells, self.slice, pb)?)?;
		writeln!(self.writer)?;
		self.partition += 2;
		Ok(())
	}

	/// A partition without a sibling.
	pub fn write_single(
		&mut self,
		module: &Module,
		floorplan: Option<&PolishExpression>,
	) -> Result<()> {
		let p = self.partition;
		writeln!(self.writer, "#Gate count: {}", module.num_cells())?;
		writeln!(self.writer)?;
		self.write_floorplan(p, floorplan)?;
		write!(self.writer, "{}", subckt_text(module, self.cells, self.slice, p)?)?;
		writeln!(self.writer)?;
		self.partition += 1;
		Ok(())
	}

	/// Writes `modules` pairwise, a trailing odd one on its own. `floorplans`, when given, is
	/// parallel to `modules`.
	pub fn write_all(
		&mut self,
		modules: &[Module],
		floorplans: Option<&[PolishExpression]>,
	) -> Result<()> {
		for (i, chunk) in modules.chunks(2).enumerate() {
			let plans = floorplans.and_then(|f| f.get(2 * i..2 * i + chunk.len()));
			match (chunk, plans) {
				([a, b], Some([fa, fb])) => self.write_pair((a, b), Some((fa, fb)))?,
				([a, b], _) => self.write_pair((a, b), None)?,
				([a], Some([fa])) => self.write_single(a, Some(fa))?,
				([a], _) => self.write_single(a, None)?,
				_ => {},
			}
		}
		Ok(())
	}

	pub fn flush(&mut self) -> Result<()> {
		self.writer.flush()?;
		Ok(())
	}

	pub fn into_inner(self) -> W {
		self.writer
	}
}
