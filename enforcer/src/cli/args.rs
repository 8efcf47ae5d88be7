use std::path::PathBuf;

use clap::Parser;
use enforcer::{
	cgroups::{DEFAULT_CGROUP_ROOT, DEFAULT_PROC_CGROUPS},
	LoadTimeOptions,
};

#[derive(Parser, Debug)]
#[command(name = "enforcer", about = "Probe the load-time state of the enforcer eBPF object")]
pub struct Cli {
	#[arg(long, default_value = "/sys/kernel/btf/vmlinux")]
	pub btf: PathBuf,

	#[arg(long, help = "Enable the kernel diagnostics channel")]
	pub debug: bool,

	#[arg(long, default_value = DEFAULT_CGROUP_ROOT)]
	pub cgroup_root: PathBuf,

	#[arg(long, default_value = DEFAULT_PROC_CGROUPS)]
	pub proc_cgroups: PathBuf,
}

impl From<Cli> for LoadTimeOptions {
	fn from(cli: Cli) -> Self {
		LoadTimeOptions {
			btf: cli.btf,
			debug: cli.debug,
			cgroup_root: cli.cgroup_root,
			proc_cgroups: cli.proc_cgroups,
		}
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	#[test]
	fn defaults_point_at_host_paths() -> Result<()> {
		// -- Exec
		let opts: LoadTimeOptions = Cli::try_parse_from(["enforcer"])?.into();

		// -- Check
		assert_eq!(opts.btf, PathBuf::from("/sys/kernel/btf/vmlinux"));
		assert!(!opts.debug);
		assert_eq!(opts.cgroup_root, PathBuf::from("/proc/1/root/sys/fs/cgroup"));
		assert_eq!(opts.proc_cgroups, PathBuf::from("/proc/cgroups"));

		Ok(())
	}

	#[test]
	fn debug_flag_enables_channel() -> Result<()> {
		// -- Exec
		let opts: LoadTimeOptions = Cli::try_parse_from(["enforcer", "--debug", "--btf", "/tmp/vmlinux"])?.into();

		// -- Check
		assert!(opts.debug);
		assert_eq!(opts.btf, PathBuf::from("/tmp/vmlinux"));

		Ok(())
	}
}

// endregion: --- Tests
