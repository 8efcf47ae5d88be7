use std::{
	ffi::CString,
	fs,
	os::unix::{ffi::OsStrExt, fs::MetadataExt},
	path::{Path, PathBuf},
};

use enforcer_common::{CGROUP2_SUPER_MAGIC, CGROUP_SUBSYS_COUNT, CGROUP_SUPER_MAGIC, TMPFS_MAGIC};
use tracing::{debug, info};

use crate::{Error, Result};

pub const DEFAULT_CGROUP_ROOT: &str = "/proc/1/root/sys/fs/cgroup";
pub const DEFAULT_PROC_CGROUPS: &str = "/proc/cgroups";

/// Controllers under which every container usually gets its own cgroup, best first.
const INTERESTING_CONTROLLERS: [&str; 3] = ["memory", "pids", "cpu"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CgroupInfo {
	/// `CGROUP2_SUPER_MAGIC` or `CGROUP_SUPER_MAGIC`.
	pub fs_magic: u64,
	/// Index into `css_set.subsys`, only meaningful on v1.
	pub v1_subsys_idx: u32,
	/// Where cgroup ids get resolved back to paths: the root on v2, the
	/// controller mount on v1.
	pub resolution_prefix: PathBuf,
}

impl CgroupInfo {
	pub fn version_name(&self) -> &'static str {
		match self.fs_magic {
			CGROUP_SUPER_MAGIC => "cgroupv1",
			_ => "cgroupv2",
		}
	}
}

/// Picks the controller to follow on cgroup v1 from `/proc/cgroups` content.
///
/// The header line is skipped and at most `CGROUP_SUBSYS_COUNT` controllers are
/// considered, the eBPF side cannot index past that.
pub fn find_interesting_controller_v1(content: &str) -> Result<(String, u32)> {
	let mut names = Vec::new();
	for line in content.lines().skip(1).take(CGROUP_SUBSYS_COUNT as usize) {
		let name = line
			.split_whitespace()
			.next()
			.ok_or_else(|| Error::MalformedCgroupsLine(line.to_string()))?;
		names.push(name.to_string());
	}

	for wanted in INTERESTING_CONTROLLERS {
		if let Some(idx) = names.iter().position(|n| n == wanted) {
			return Ok((wanted.to_string(), idx as u32));
		}
	}

	Err(Error::NoInterestingController(names))
}

fn statfs_type(path: &Path) -> Result<u64> {
	let c_path = CString::new(path.as_os_str().as_bytes()).map_err(Error::custom_from_err)?;
	let mut st: libc::statfs = unsafe { std::mem::zeroed() };
	let ret = unsafe { libc::statfs(c_path.as_ptr(), &mut st) };
	if ret != 0 {
		return Err(std::io::Error::last_os_error().into());
	}
	Ok(st.f_type as u64)
}

/// Filesystem magic of `path`, which must be a mount point.
pub fn mount_point_fs_type(path: &Path) -> Result<u64> {
	let st = fs::symlink_metadata(path)?;
	let parent = path.parent().unwrap_or(Path::new("/"));
	let pst = fs::symlink_metadata(parent)?;

	// A mount point lives on a different device than its parent.
	if st.dev() == pst.dev() {
		return Err(Error::NotAMountPoint(path.to_path_buf()));
	}

	statfs_type(path)
}

/// Detects the cgroup hierarchy mounted at `root`.
///
/// cgroup v2 mounts `cgroup2` there directly. v1 and hybrid setups mount a
/// tmpfs with one mount per controller below it.
pub fn detect(root: &Path, proc_cgroups: &Path) -> Result<CgroupInfo> {
	let fs_magic = mount_point_fs_type(root)?;
	debug!("cgroup root {} has fs magic {fs_magic:#x}", root.display());

	let info = match fs_magic {
		CGROUP2_SUPER_MAGIC => CgroupInfo {
			fs_magic: CGROUP2_SUPER_MAGIC,
			v1_subsys_idx: 0,
			resolution_prefix: root.to_path_buf(),
		},
		TMPFS_MAGIC => {
			let content = fs::read_to_string(proc_cgroups)?;
			let (controller, idx) = find_interesting_controller_v1(&content)?;
			let controller_path = root.join(&controller);
			mount_point_fs_type(&controller_path)?;
			CgroupInfo {
				fs_magic: CGROUP_SUPER_MAGIC,
				v1_subsys_idx: idx,
				resolution_prefix: controller_path,
			}
		}
		other => return Err(Error::UnsupportedCgroupFs(other)),
	};

	info!(
		"{} detected, resolution prefix {}",
		info.version_name(),
		info.resolution_prefix.display()
	);
	Ok(info)
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	const FX_HEADER: &str = "#subsys_name\thierarchy\tnum_cgroups\tenabled\n";

	#[test]
	fn memory_is_preferred_wherever_it_is() -> Result<()> {
		// -- Setup & Fixtures
		let fx_first = format!("{FX_HEADER}memory 6 42 1\ncpuset 2 5 1\npids 9 17 1\n");
		let fx_last = format!("{FX_HEADER}cpuset 2 5 1\npids 9 17 1\nmemory 6 42 1\n");

		// -- Exec & Check
		assert_eq!(find_interesting_controller_v1(&fx_first)?, ("memory".to_string(), 0));
		assert_eq!(find_interesting_controller_v1(&fx_last)?, ("memory".to_string(), 2));

		Ok(())
	}

	#[test]
	fn pids_is_used_without_memory() -> Result<()> {
		// -- Setup & Fixtures
		let fx_content = format!("{FX_HEADER}cpuset 2 5 1\nfoo 1 1 1\nbar 2 2 1\nfoo1 1 1 1\nbar1 2 2 1\npids 3 3 1\n");

		// -- Exec
		let (name, idx) = find_interesting_controller_v1(&fx_content)?;

		// -- Check
		assert_eq!(name, "pids");
		assert_eq!(idx, 5);

		Ok(())
	}

	#[test]
	fn no_interesting_controller_is_an_error() -> Result<()> {
		// -- Setup & Fixtures
		let fx_content = format!("{FX_HEADER}foo 1 1 1\nbar 2 2 1\n");

		// -- Exec
		let res = find_interesting_controller_v1(&fx_content);

		// -- Check
		match res {
			Err(Error::NoInterestingController(names)) => assert_eq!(names, vec!["foo", "bar"]),
			other => return Err(format!("unexpected result: {other:?}").into()),
		}

		Ok(())
	}

	#[test]
	fn controllers_past_subsys_count_are_ignored() -> Result<()> {
		// -- Setup & Fixtures
		let mut fx_content = FX_HEADER.to_string();
		for i in 0..CGROUP_SUBSYS_COUNT {
			fx_content.push_str(&format!("ctrl{i} 1 1 1\n"));
		}
		fx_content.push_str("memory 6 42 1\n");

		// -- Exec & Check
		assert!(matches!(
			find_interesting_controller_v1(&fx_content),
			Err(Error::NoInterestingController(names)) if names.len() == CGROUP_SUBSYS_COUNT as usize
		));

		Ok(())
	}

	#[test]
	fn empty_line_is_malformed() -> Result<()> {
		// -- Setup & Fixtures
		let fx_content = format!("{FX_HEADER}cpuset 2 5 1\n\nmemory 6 42 1\n");

		// -- Exec & Check
		assert!(matches!(
			find_interesting_controller_v1(&fx_content),
			Err(Error::MalformedCgroupsLine(_))
		));

		Ok(())
	}

	#[test]
	fn plain_directory_is_not_a_mount_point() -> Result<()> {
		// -- Setup & Fixtures
		let fx_dir = std::env::temp_dir().join(format!("enforcer-cgroups-{}", std::process::id()));
		fs::create_dir_all(&fx_dir)?;

		// -- Exec
		let res = mount_point_fs_type(&fx_dir);
		fs::remove_dir(&fx_dir)?;

		// -- Check
		assert!(matches!(res, Err(Error::NotAMountPoint(p)) if p == fx_dir));

		Ok(())
	}
}

// endregion: --- Tests
