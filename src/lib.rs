use std::{
	fs::File,
	io::BufWriter,
	path::{Path, PathBuf},
};

use clap::Parser;
use thiserror::Error;

use netlist::{read_module_file, CellLibrary};
use padframe::Padframe;
use phy::{
	floorplan_all, partition_to_fit, save_floorplan_svg, Config, InvalidExpression, CFG,
};
use subckt::{subckt_name, SubcktWriter};

pub mod ndarr;
pub mod netlist;
pub mod padframe;
pub mod phy;
pub mod subckt;
mod svg;

mod util;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum Error {
	#[error("I/O error: {0}")]
	IOError(#[from] std::io::Error),
	#[error("Malformed config: {0}")]
	ConfigParseError(#[from] toml::de::Error),
	#[error("Could not serialize config: {0}")]
	ConfigSerializeError(#[from] toml::ser::Error),
	#[error("Cell \"{cell}\" is not defined in {library}")]
	UnknownCell { cell: String, library: String },
	#[error("Cell library line {line}: {message}")]
	CellFormat { line: usize, message: String },
	#[error("Netlist line {line}: {message}")]
	Netlist { line: usize, message: String },
	#[error("Padframe: {0}")]
	Padframe(String),
	#[error("Genetic parameters: {0}")]
	GeneticParams(String),
	#[error("Partitioner needs an even vertex count of at least 2, got {0}")]
	InvalidPartitionSize(usize),
	#[error("Module \"{0}\" has fewer than two cells to partition")]
	ModuleTooSmall(String),
	#[error("Floorplan concurrency limit must be at least 1")]
	ConcurrencyLimit,
	#[error("Cannot lay out floorplan of \"{module}\": {source}")]
	Floorplan {
		module: String,
		source: InvalidExpression,
	},
	#[error("Could not build thread pool: {0}")]
	ThreadPool(#[from] rayon::ThreadPoolBuildError),
	#[error("Missing required argument {0}")]
	MissingArgument(&'static str),
	#[error("Cannot derive an output file name from {0:?}")]
	ResultantFileNameIsBad(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Partition a gate-level netlist into padframe slices and floorplan every partition (partplan)
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
	/// Standard cell library, .cell.
	#[arg(short, long, required_unless_present = "dump_cfg")]
	pub cells: Option<PathBuf>,

	/// Gate-level netlist, .netblif.
	#[arg(short, long, required_unless_present = "dump_cfg")]
	pub netlist: Option<PathBuf>,

	/// Padframe description giving the usable area and slice counts.
	#[arg(short, long, required_unless_present = "dump_cfg")]
	pub padframe: Option<PathBuf>,

	/// Where to write the partitions. Defaults to the netlist name with a .subckt extension.
	#[arg(short, long)]
	pub output: Option<PathBuf>,

	/// Write one floorplan SVG per partition into this directory.
	#[arg(long)]
	pub svg_dir: Option<PathBuf>,

	/// Config file to use instead of cfg/partplan.toml.
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Maximum number of partitions floorplanned at once.
	#[arg(short, long)]
	pub jobs: Option<usize>,

	/// Base seed for the floorplan search.
	#[arg(short, long)]
	pub seed: Option<u64>,

	/// Dump a template cfg/partplan_template.toml. Rename to cfg/partplan.toml to use for real.
	#[arg(short, long)]
	pub dump_cfg: bool,
}

/// What a [`run`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
	pub output: PathBuf,
	/// Partition count per top-level module, in netlist order.
	pub partitions: Vec<usize>,
	pub svgs: Vec<PathBuf>,
}

/// Full flow: every top-level module becomes one slice, bisected until each partition fits the
/// padframe slice, floorplanned, and written as `.subckt` pairs.
pub fn run(args: Args) -> Result<Summary> {
	let cells_path = args.cells.ok_or(Error::MissingArgument("--cells"))?;
	let netlist_path = args.netlist.ok_or(Error::MissingArgument("--netlist"))?;
	let padframe_path = args
		.padframe
		.ok_or(Error::MissingArgument("--padframe"))?;
	let cfg = match &args.config {
		Some(path) => Config::load(path)?,
		None => (*CFG).clone(),
	};

	let cells = CellLibrary::load(&cells_path)?;
	let modules = read_module_file(&netlist_path, &cells)?;
	let budget = cfg
		.partition
		.apply(Padframe::load(&padframe_path)?.area_budget());
	log::info!(
		"Slice budget {}x{} for {} modules",
		budget.slice_width,
		budget.slice_height,
		modules.len()
	);

	let output = match args.output {
		Some(path) => path,
		None => get_derivative_file_name(&netlist_path, ".subckt")?,
	};
	let limit = args.jobs.unwrap_or(cfg.floorplan.batch_size);
	let seed = args.seed.unwrap_or(cfg.floorplan.seed);
	if let Some(dir) = &args.svg_dir {
		std::fs::create_dir_all(dir)?;
	}

	let mut file = BufWriter::new(File::create(&output)?);
	let mut partitions = vec![];
	let mut svgs = vec![];
	for (slice, module) in modules.into_iter().enumerate() {
		let name = module.name.clone();
		let pieces = partition_to_fit(module, budget)?;
		let plans = floorplan_all(&pieces, &cfg.genetic, limit, seed)?;
		log::info!("\"{name}\" became {} partitions in slice {slice}", pieces.len());

		let mut writer = SubcktWriter::new(&mut file, slice, &cells);
		writer.write_all(&pieces, Some(plans.as_slice()))?;
		writer.flush()?;

		if let Some(dir) = &args.svg_dir {
			for (p, (piece, plan)) in pieces.iter().zip(&plans).enumerate() {
				let path = dir.join(format!("{}.svg", subckt_name(slice, p)));
				save_floorplan_svg(piece, plan, &path)?;
				svgs.push(path);
			}
		}
		partitions.push(pieces.len());
	}
	log::info!("Wrote {}", output.display());
	Ok(Summary {
		output,
		partitions,
		svgs,
	})
}

/// `dir/name.ext` becomes `dir/name<derivative>`.
pub fn get_derivative_file_name<P, S>(filename: P, derivative: S) -> Result<PathBuf>
where
	P: AsRef<Path>,
	S: AsRef<str>,
{
	let filename: &Path = filename.as_ref();
	let mut newfilename = if let Some(s) = filename.file_stem() {
		s.to_owned()
	} else {
		return Err(Error::ResultantFileNameIsBad(filename.into()));
	};
	newfilename.push(derivative.as_ref());
	Ok(match filename.parent() {
		Some(parent) => parent.join(newfilename),
		None => newfilename.into(),
	})
}

pub fn dump_cfg() -> Result<PathBuf> {
	phy::dump_cfg()
}
