use std::path::PathBuf;

use aya::EbpfLoader;
use enforcer_common::{KernelLayout, LoadTimeConfig, KERNEL_LAYOUT_SYMBOL, LOAD_TIME_CONFIG_SYMBOL};
use tracing::info;

use crate::{
	cgroups::{self, CgroupInfo},
	layout::{load_btf, probe_kernel_layout},
	Result,
};

#[derive(Clone, Debug)]
pub struct LoadTimeOptions {
	pub btf: PathBuf,
	pub debug: bool,
	pub cgroup_root: PathBuf,
	pub proc_cgroups: PathBuf,
}

/// Everything the eBPF object needs before load. Immutable once installed.
#[derive(Clone, Debug)]
pub struct LoadTimeState {
	pub config: LoadTimeConfig,
	pub layout: KernelLayout,
	pub cgroup: CgroupInfo,
}

impl LoadTimeState {
	pub fn probe(opts: &LoadTimeOptions) -> Result<Self> {
		let btf = load_btf(&opts.btf)?;
		let layout = probe_kernel_layout(&btf)?;
		let cgroup = cgroups::detect(&opts.cgroup_root, &opts.proc_cgroups)?;

		Ok(Self::from_parts(opts.debug, cgroup, layout))
	}

	pub fn from_parts(debug: bool, cgroup: CgroupInfo, layout: KernelLayout) -> Self {
		let config = LoadTimeConfig {
			cgrp_fs_magic: cgroup.fs_magic,
			cgrpv1_subsys_idx: cgroup.v1_subsys_idx,
			debug_mode: debug as u8,
			..LoadTimeConfig::disabled()
		};
		LoadTimeState { config, layout, cgroup }
	}

	/// Writes both globals into the object. The symbols must exist, a stale
	/// object without them would silently run with logging off and no layout.
	pub fn install<'a>(&'a self, loader: &mut EbpfLoader<'a>) {
		info!(
			"installing load-time state (debug_mode={}, {})",
			self.config.debug_mode,
			self.cgroup.version_name()
		);
		loader
			.set_global(LOAD_TIME_CONFIG_SYMBOL, &self.config, true)
			.set_global(KERNEL_LAYOUT_SYMBOL, &self.layout, true);
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use enforcer_common::{KernfsIdLayout, CGROUP2_SUPER_MAGIC, CGROUP_SUPER_MAGIC};
	use zerocopy::IntoBytes;

	fn fx_layout() -> KernelLayout {
		KernelLayout {
			kernfs_id_layout: KernfsIdLayout::Modern.tag(),
			kernfs_id: 96,
			..KernelLayout::unresolved()
		}
	}

	#[test]
	fn cgroup_v1_state_carries_subsys_index() -> Result<()> {
		// -- Setup & Fixtures
		let fx_cgroup = CgroupInfo {
			fs_magic: CGROUP_SUPER_MAGIC,
			v1_subsys_idx: 4,
			resolution_prefix: PathBuf::from("/sys/fs/cgroup/memory"),
		};

		// -- Exec
		let state = LoadTimeState::from_parts(true, fx_cgroup, fx_layout());

		// -- Check
		assert!(state.config.debug_enabled());
		assert!(state.config.is_cgroup_v1());
		assert_eq!(state.config.cgrpv1_subsys_idx, 4);
		assert_eq!(state.layout.kernfs_layout(), Some(KernfsIdLayout::Modern));

		Ok(())
	}

	#[test]
	fn debug_off_by_default_on_v2() -> Result<()> {
		// -- Setup & Fixtures
		let fx_cgroup = CgroupInfo {
			fs_magic: CGROUP2_SUPER_MAGIC,
			v1_subsys_idx: 0,
			resolution_prefix: PathBuf::from("/sys/fs/cgroup"),
		};

		// -- Exec
		let state = LoadTimeState::from_parts(false, fx_cgroup, fx_layout());

		// -- Check
		assert!(!state.config.debug_enabled());
		assert!(!state.config.is_cgroup_v1());
		assert_eq!(state.config.as_bytes().len(), 16);
		assert_eq!(state.config._pad0, [0u8; 3]);

		Ok(())
	}

	#[test]
	fn install_sets_both_object_globals() -> Result<()> {
		// -- Setup & Fixtures
		let fx_cgroup = CgroupInfo {
			fs_magic: CGROUP2_SUPER_MAGIC,
			v1_subsys_idx: 0,
			resolution_prefix: PathBuf::from("/sys/fs/cgroup"),
		};
		let state = LoadTimeState::from_parts(true, fx_cgroup, fx_layout());
		let mut loader = EbpfLoader::new();

		// -- Exec
		state.install(&mut loader);

		// -- Check
		// Names of the `#[no_mangle]` statics in enforcer-ebpf/src/maps.rs.
		assert_eq!(LOAD_TIME_CONFIG_SYMBOL, "LOAD_TIME_CONFIG");
		assert_eq!(KERNEL_LAYOUT_SYMBOL, "KERNEL_LAYOUT");
		let loader_dbg = format!("{loader:?}");
		assert!(loader_dbg.contains("\"LOAD_TIME_CONFIG\""), "{loader_dbg}");
		assert!(loader_dbg.contains("\"KERNEL_LAYOUT\""), "{loader_dbg}");

		Ok(())
	}
}

// endregion: --- Tests
