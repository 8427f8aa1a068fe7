use std::path::Path;

use super::{CellLibrary, Gate, Module};
use crate::util::{logical_lines, split_fields};
use crate::{Error, Result};

/// Loads every `.model` in a `.netblif` file.
pub fn read_module_file<P: AsRef<Path>>(path: P, cells: &CellLibrary) -> Result<Vec<Module>> {
	let path = path.as_ref();
	let text = std::fs::read_to_string(path)?;
	let modules = parse_modules(&text, cells)?;
	log::info!("Read {} modules from {}", modules.len(), path.display());
	Ok(modules)
}

#[derive(Default)]
struct PendingModule {
	name: String,
	inputs: Vec<String>,
	outputs: Vec<String>,
	cells: Vec<Gate>,
}

impl PendingModule {
	fn finish(self) -> Module {
		Module::new(self.name, self.inputs, self.outputs, self.cells)
	}
}

pub fn parse_modules(text: &str, cells: &CellLibrary) -> Result<Vec<Module>> {
	let mut ret = vec![];
	let mut pending: Option<PendingModule> = None;
	for (line_no, line) in logical_lines(text) {
		let fields = split_fields(&line);
		let Some(&keyword) = fields.first() else {
			continue;
		};
		match keyword {
			".model" => {
				if let Some(unterminated) = pending.take() {
					log::warn!(
						"Model \"{}\" not closed by .end before line {line_no}",
						unterminated.name
					);
					ret.push(unterminated.finish());
				}
				pending = Some(PendingModule {
					name: fields.get(1).map(|s| s.to_string()).unwrap_or_default(),
					..Default::default()
				});
			},
			".inputs" => {
				let module = pending.get_or_insert_with(Default::default);
				module
					.inputs
					.extend(fields[1..].iter().map(|s| s.to_string()));
			},
			".outputs" => {
				let module = pending.get_or_insert_with(Default::default);
				module
					.outputs
					.extend(fields[1..].iter().map(|s| s.to_string()));
			},
			".gate" => {
				let gate = parse_gate(line_no, &fields, cells)?;
				pending.get_or_insert_with(Default::default).cells.push(gate);
			},
			".end" => {
				if let Some(module) = pending.take() {
					ret.push(module.finish());
				}
			},
			other => {
				log::debug!("Ignoring unsupported netlist directive {other} on line {line_no}");
			},
		}
	}
	if let Some(unterminated) = pending {
		log::warn!("Model \"{}\" not closed by .end", unterminated.name);
		ret.push(unterminated.finish());
	}
	Ok(ret)
}

/// `.gate CELL PIN=NET PIN=[NET] ...`
fn parse_gate(line_no: usize, fields: &[&str], cells: &CellLibrary) -> Result<Gate> {
	let Some(&cell_name) = fields.get(1) else {
		return Err(Error::Netlist {
			line: line_no,
			message: ".gate without a cell name".to_owned(),
		});
	};
	let cell = cells.get(cell_name)?;
	let mut inputs = vec![];
	let mut outputs = vec![];
	for &binding in &fields[2..] {
		let Some((pin, net)) = binding.split_once('=') else {
			return Err(Error::Netlist {
				line: line_no,
				message: format!("pin binding \"{binding}\" is not of the form PIN=NET"),
			});
		};
		let net = match (net.find('['), net.find(']')) {
			(Some(open), Some(close)) if open < close => &net[open + 1..close],
			_ => net,
		};
		if cell.is_output_pin(pin) {
			outputs.push(net.to_owned());
		} else {
			inputs.push(net.to_owned());
		}
	}
	Ok(Gate::new(
		cell_name,
		(cell.width, cell.length),
		inputs,
		outputs,
	))
}
