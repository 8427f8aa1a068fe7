use std::path::Path;

use serde::{Deserialize, Serialize};

use super::genetic::GeneticParams;
use crate::padframe::AreaBudget;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPartition {
	/// Overrides the padframe-derived slice width.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub slice_width: Option<f64>,
	/// Overrides the padframe-derived slice height.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub slice_height: Option<f64>,
}

impl ConfigPartition {
	pub fn apply(&self, budget: AreaBudget) -> AreaBudget {
		AreaBudget::new(
			self.slice_width.unwrap_or(budget.slice_width),
			self.slice_height.unwrap_or(budget.slice_height),
		)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFloorplan {
	/// Upper bound on modules floorplanned at the same time.
	pub batch_size: usize,
	/// Module `i` of a batch is searched with seed `seed + i`.
	pub seed: u64,
}

impl Default for ConfigFloorplan {
	fn default() -> Self {
		Self {
			batch_size: 10,
			seed: 0x1234ABCD,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub partition: ConfigPartition,
	#[serde(default = "GeneticParams::floorplan")]
	pub genetic: GeneticParams,
	#[serde(default)]
	pub floorplan: ConfigFloorplan,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			partition: ConfigPartition::default(),
			genetic: GeneticParams::floorplan(),
			floorplan: ConfigFloorplan::default(),
		}
	}
}

impl Config {
	pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
		let text = std::fs::read_to_string(path)?;
		let cfg: Config = toml::from_str(&text)?;
		cfg.genetic.validate()?;
		Ok(cfg)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn template_round_trips_through_toml() {
		let text = toml::to_string(&Config::default()).unwrap();
		assert!(text.contains("[genetic]"));
		assert!(!text.contains("slice_width"));
		let back: Config = toml::from_str(&text).unwrap();
		assert_eq!(back.genetic, GeneticParams::floorplan());
		assert_eq!(back.floorplan.batch_size, 10);
	}

	#[test]
	fn partition_override() {
		let cfg: Config = toml::from_str(
			"[partition]\nslice_width = 50.0\n\
			 [genetic]\npopulation_size = 8\nmax_generations = 4\nelite_rate = 0.25\n\
			 mutate_rate = 0.5\ntarget_fitness = 1.0\n\
			 [floorplan]\nbatch_size = 2\nseed = 7\n",
		)
		.unwrap();
		let budget = cfg.partition.apply(AreaBudget::new(100.0, 80.0));
		assert_eq!(budget, AreaBudget::new(50.0, 80.0));
		assert_eq!(cfg.genetic.population_size, 8);
	}

	#[test]
	fn missing_sections_take_defaults() {
		let cfg: Config = toml::from_str("[partition]\nslice_height = 12.0\n").unwrap();
		assert_eq!(cfg.partition.slice_height, Some(12.0));
		assert_eq!(cfg.genetic, GeneticParams::floorplan());
		assert_eq!(cfg.floorplan.batch_size, 10);
		assert_eq!(cfg.floorplan.seed, 0x1234ABCD);

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("partplan.toml");
		std::fs::write(&path, "[floorplan]\nbatch_size = 3\nseed = 5\n").unwrap();
		let cfg = Config::load(&path).unwrap();
		assert_eq!(cfg.floorplan.batch_size, 3);
		assert_eq!(cfg.genetic, GeneticParams::floorplan());
	}

	#[test]
	fn load_reports_bad_files() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("partplan.toml");
		assert!(matches!(Config::load(&path), Err(crate::Error::IOError(_))));
		std::fs::write(&path, "[genetic]\npopulation_size = \"many\"\n").unwrap();
		assert!(matches!(
			Config::load(&path),
			Err(crate::Error::ConfigParseError(_))
		));
		let mut bad = Config::default();
		bad.genetic.population_size = 1;
		std::fs::write(&path, toml::to_string(&bad).unwrap()).unwrap();
		assert!(matches!(
			Config::load(&path),
			Err(crate::Error::GeneticParams(_))
		));
	}
}
