use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::split_fields;
use crate::{Error, Result};

/// Usable core area and how it is diced into slices.
///
/// ```text
/// .USABLE 400 300
/// .SLICES 4 2
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padframe {
	pub usable_width: f64,
	pub usable_height: f64,
	pub slices_horiz: u32,
	pub slices_vert: u32,
}

/// The footprint one partition has to fit in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaBudget {
	pub slice_width: f64,
	pub slice_height: f64,
}

impl AreaBudget {
	pub fn new(slice_width: f64, slice_height: f64) -> Self {
		Self {
			slice_width,
			slice_height,
		}
	}

	pub fn area(&self) -> f64 {
		self.slice_width * self.slice_height
	}
}

impl Padframe {
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|e| {
			Error::Padframe(format!("padframe file \"{}\" not readable: {e}", path.display()))
		})?;
		Self::parse(&text).map_err(|e| match e {
			Error::Padframe(msg) => Error::Padframe(format!("{}: {msg}", path.display())),
			other => other,
		})
	}

	pub fn parse(text: &str) -> Result<Self> {
		let mut usable: Option<(f64, f64)> = None;
		let mut slices: Option<(u32, u32)> = None;
		for line in text.lines() {
			let fields = split_fields(line);
			match fields.first() {
				Some(&".USABLE") => usable = Some(parse_pair(&fields, ".USABLE")?),
				Some(&".SLICES") => slices = Some(parse_pair(&fields, ".SLICES")?),
				_ => {},
			}
			if usable.is_some() && slices.is_some() {
				break;
			}
		}
		let (Some((usable_width, usable_height)), Some((slices_horiz, slices_vert))) =
			(usable, slices)
		else {
			return Err(Error::Padframe("missing .USABLE or .SLICES".to_owned()));
		};
		if slices_horiz == 0 || slices_vert == 0 {
			return Err(Error::Padframe("slice counts must be non-zero".to_owned()));
		}
		Ok(Self {
			usable_width,
			usable_height,
			slices_horiz,
			slices_vert,
		})
	}

	pub fn area_budget(&self) -> AreaBudget {
		AreaBudget::new(
			self.usable_width / self.slices_horiz as f64,
			self.usable_height / self.slices_vert as f64,
		)
	}
}

fn parse_pair<T: std::str::FromStr>(fields: &[&str], keyword: &str) -> Result<(T, T)> {
	let parse = |idx: usize| -> Result<T> {
		fields
			.get(idx)
			.and_then(|s| s.parse::<T>().ok())
			.ok_or_else(|| Error::Padframe(format!("{keyword} expects two numbers")))
	};
	Ok((parse(1)?, parse(2)?))
}
