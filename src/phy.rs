mod config;
mod floorplan;
mod genetic;
mod partition;
mod polish;
mod scheduler;

use std::path::PathBuf;

pub use config::{Config, ConfigFloorplan, ConfigPartition};
pub use floorplan::{
	floorplan, floorplan_all, save_floorplan_svg, slicing_layout, wire_length, FloorplanCitizen,
	PlacedGate, SlicingLayout, INVALID_FITNESS,
};
pub use genetic::{Citizen, Evolution, GeneticAlgorithm, GeneticParams};
pub use partition::{cut_weight, kernighan_lin, partition};
pub use polish::{
	adjacency_graph, Adjacency, AdjacencyGraph, Cut, InvalidExpression, ParsePolishError,
	PolishExpression, Token,
};
pub use scheduler::{estimate_dims, fits, partition_to_fit};

const CFG_PATH: &str = "cfg/partplan.toml";
const CFG_TEMPLATE_PATH: &str = "cfg/partplan_template.toml";

/// Process-wide configuration from `cfg/partplan.toml`, or the defaults when that file is absent or
/// unusable.
pub static CFG: std::sync::LazyLock<Config> =
	std::sync::LazyLock::new(|| match Config::load(CFG_PATH) {
		Ok(cfg) => cfg,
		Err(crate::Error::IOError(_)) => Config::default(),
		Err(e) => {
			log::warn!("Ignoring {CFG_PATH}: {e}");
			Config::default()
		},
	});

pub(crate) fn dump_cfg() -> crate::Result<PathBuf> {
	let cfg = toml::to_string(&Config::default())?;
	std::fs::create_dir_all("cfg")?;
	std::fs::write(CFG_TEMPLATE_PATH, cfg)?;
	Ok(PathBuf::from(CFG_TEMPLATE_PATH))
}
