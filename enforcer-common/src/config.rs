use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const CGROUP_SUPER_MAGIC: u64 = 0x0027_e0eb;
pub const CGROUP2_SUPER_MAGIC: u64 = 0x6367_7270;
pub const TMPFS_MAGIC: u64 = 0x0102_1994;

/// Max cgroup subsystems count found in x86 vmlinux (`CGROUP_SUBSYS_COUNT`).
pub const CGROUP_SUBSYS_COUNT: u32 = 14;

pub const LOAD_TIME_CONFIG_SYMBOL: &str = "LOAD_TIME_CONFIG";

/// Written once by the loader before the object is loaded, read-only afterwards.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct LoadTimeConfig {
	pub cgrp_fs_magic: u64,
	pub cgrpv1_subsys_idx: u32,
	pub debug_mode: u8,
	pub _pad0: [u8; 3],
}

impl LoadTimeConfig {
	pub const fn disabled() -> Self {
		LoadTimeConfig {
			cgrp_fs_magic: CGROUP2_SUPER_MAGIC,
			cgrpv1_subsys_idx: 0,
			debug_mode: 0,
			_pad0: [0u8; 3],
		}
	}

	#[inline(always)]
	pub const fn debug_enabled(&self) -> bool {
		self.debug_mode != 0
	}

	#[inline(always)]
	pub const fn is_cgroup_v1(&self) -> bool {
		self.cgrp_fs_magic == CGROUP_SUPER_MAGIC
	}
}

impl Default for LoadTimeConfig {
	fn default() -> Self {
		Self::disabled()
	}
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for LoadTimeConfig {}
