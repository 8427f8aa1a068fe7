use std::path::Path;

use crate::util::{hash_map, split_fields, HashM};
use crate::{Error, Result};

/// A standard cell definition: footprint and pin names in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct StdCell {
	pub name: String,
	pub width: f64,
	pub length: f64,
	pub inputs: Vec<String>,
	pub outputs: Vec<String>,
}

impl StdCell {
	pub fn is_output_pin(&self, pin: &str) -> bool {
		self.outputs.iter().any(|p| p == pin)
	}
}

/// Standard cell library indexed by cell name.
///
/// File format, one cell per line, other lines ignored:
/// ```text
/// .cell nand2 2.0 3.5 A.I B.I Y.O
/// ```
#[derive(Debug, Clone, Default)]
pub struct CellLibrary {
	source: String,
	cells: HashM<String, StdCell>,
}

impl CellLibrary {
	pub fn new<S: Into<String>>(source: S) -> Self {
		Self {
			source: source.into(),
			cells: hash_map(),
		}
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path)?;
		Self::parse(&text, path.display().to_string())
	}

	pub fn parse<S: Into<String>>(text: &str, source: S) -> Result<Self> {
		let mut ret = Self::new(source);
		for (idx, line) in text.lines().enumerate() {
			if !line.starts_with(".cell") {
				continue;
			}
			ret.insert(parse_cell(idx + 1, line)?);
		}
		log::debug!("Loaded {} standard cells from {}", ret.len(), ret.source);
		Ok(ret)
	}

	pub fn insert(&mut self, cell: StdCell) {
		self.cells.insert(cell.name.clone(), cell);
	}

	pub fn get(&self, name: &str) -> Result<&StdCell> {
		self.cells.get(name).ok_or_else(|| Error::UnknownCell {
			cell: name.to_owned(),
			library: self.source.clone(),
		})
	}

	pub fn len(&self) -> usize {
		self.cells.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cells.is_empty()
	}
}

fn parse_cell(line_no: usize, line: &str) -> Result<StdCell> {
	let fields = split_fields(line);
	let bad = |message: String| Error::CellFormat {
		line: line_no,
		message,
	};
	if fields.len() < 4 {
		return Err(bad(format!("expected `.cell NAME WIDTH LENGTH PINS...`, got \"{line}\"")));
	}
	let name = fields[1].to_owned();
	let width = fields[2]
		.parse::<f64>()
		.map_err(|_| bad(format!("cell \"{name}\" has bad width \"{}\"", fields[2])))?;
	let length = fields[3]
		.parse::<f64>()
		.map_err(|_| bad(format!("cell \"{name}\" has bad length \"{}\"", fields[3])))?;

	let mut inputs = vec![];
	let mut outputs = vec![];
	for &pin in &fields[4..] {
		let (pin_name, direction) = pin.split_once('.').unwrap_or((pin, ""));
		if pin_name.is_empty() {
			return Err(bad(format!("cell \"{name}\" has an empty pin name")));
		}
		match direction {
			"I" => inputs.push(pin_name.to_owned()),
			"O" => outputs.push(pin_name.to_owned()),
			_ => {
				return Err(bad(format!(
					"cell \"{name}\" pin \"{pin}\" has invalid I/O specifier"
				)))
			},
		}
	}
	Ok(StdCell {
		name,
		width,
		length,
		inputs,
		outputs,
	})
}
