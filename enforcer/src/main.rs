// region:    --- Modules
mod cli;
// endregion: --- Modules

use clap::Parser;
use enforcer::{LoadTimeState, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::args::Cli;

fn main() -> Result<()> {
	let args = Cli::parse();
	tracing_subscriber::fmt()
		.with_target(false)
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let state = LoadTimeState::probe(&args.into())?;
	info!("load-time config: {:?}", state.config);
	info!("kernel layout: {:?}", state.layout);

	println!("cgroup: {} ({})", state.cgroup.version_name(), state.cgroup.resolution_prefix.display());
	println!("debug_mode: {}", state.config.debug_mode);
	println!("kernfs_node.id layout: {:?}", state.layout.kernfs_layout());

	Ok(())
}
