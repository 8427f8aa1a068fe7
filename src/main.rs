use std::process::ExitCode;

use clap::Parser;
use partplan::{dump_cfg, run, Args};

fn main() -> ExitCode {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();
	if args.dump_cfg {
		return match dump_cfg() {
			Ok(path) => {
				println!("Wrote {}", path.display());
				ExitCode::SUCCESS
			},
			Err(e) => {
				log::error!("{e}");
				ExitCode::FAILURE
			},
		};
	}
	match run(args) {
		Ok(summary) => {
			println!(
				"{} partitions written to {}",
				summary.partitions.iter().sum::<usize>(),
				summary.output.display()
			);
			ExitCode::SUCCESS
		},
		Err(e) => {
			log::error!("{e}");
			ExitCode::FAILURE
		},
	}
}
