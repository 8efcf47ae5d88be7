use core::mem::size_of;

use crate::{
	channel::{EventChannel, LogSink},
	compat::{offset, read_ptr, CompatError, KernelLayout, KernelRead, KernfsIdResolver},
	config::{LoadTimeConfig, CGROUP_SUBSYS_COUNT},
	event::{LogCode, LogSubject, UNKNOWN_ID},
};

/// Walks `task_struct -> css_set -> cgroup -> kernfs_node` with load-time offsets.
///
/// On cgroup v2 the default hierarchy (`css_set.dfl_cgrp`) is used. On v1 the walk
/// goes through `css_set.subsys[idx]->cgroup`, `idx` being the controller picked at
/// load time.
#[derive(Clone, Copy, Debug)]
pub struct CgroupWalker {
	layout: KernelLayout,
	v1_subsys_idx: Option<u32>,
	resolver: KernfsIdResolver,
}

impl CgroupWalker {
	pub const fn new(config: &LoadTimeConfig, layout: &KernelLayout) -> Self {
		let v1_subsys_idx = if config.is_cgroup_v1() {
			Some(config.cgrpv1_subsys_idx)
		} else {
			None
		};
		CgroupWalker {
			layout: *layout,
			v1_subsys_idx,
			resolver: KernfsIdResolver::new(layout),
		}
	}

	/// # Safety
	///
	/// `task` must be NULL or point to a `struct task_struct`.
	#[inline(always)]
	pub unsafe fn task_cgroup<R: KernelRead>(&self, mem: &R, task: *const u8) -> Result<*const u8, CompatError> {
		let cgroups = read_ptr(mem, task, offset(self.layout.task_cgroups)?)?;

		match self.v1_subsys_idx {
			None => read_ptr(mem, cgroups, offset(self.layout.css_set_dfl_cgrp)?),
			Some(idx) => {
				if idx >= CGROUP_SUBSYS_COUNT {
					return Err(CompatError::MissingOffset);
				}
				let slot = offset(self.layout.css_set_subsys)? + idx as usize * size_of::<*const u8>();
				let css = read_ptr(mem, cgroups, slot)?;
				read_ptr(mem, css, offset(self.layout.css_cgroup)?)
			}
		}
	}

	/// # Safety
	///
	/// `task` must be NULL or point to a `struct task_struct`.
	#[inline(always)]
	pub unsafe fn cgroup_id<R: KernelRead>(&self, mem: &R, task: *const u8) -> Result<u64, CompatError> {
		let cgrp = self.task_cgroup(mem, task)?;
		let kn = read_ptr(mem, cgrp, offset(self.layout.cgroup_kn)?)?;
		self.resolver.resolve(mem, kn)
	}

	/// Cgroup id of `task->real_parent`.
	///
	/// # Safety
	///
	/// `task` must be NULL or point to a `struct task_struct`.
	#[inline(always)]
	pub unsafe fn parent_cgroup_id<R: KernelRead>(&self, mem: &R, task: *const u8) -> Result<u64, CompatError> {
		let parent = read_ptr(mem, task, offset(self.layout.task_real_parent)?)?;
		self.cgroup_id(mem, parent)
	}

	/// Fills `subject.cgid` for `task` and returns the parent's cgroup id.
	///
	/// Neither lookup aborts the caller. A failed one leaves `UNKNOWN_ID` and emits
	/// `FailToResolveCgroupId` or `FailToResolveParentCgroupId` on `logs`.
	///
	/// # Safety
	///
	/// `task` must be NULL or point to a `struct task_struct`.
	#[inline(always)]
	pub unsafe fn resolve_subject<R: KernelRead, S: LogSink>(
		&self,
		mem: &R,
		task: *const u8,
		logs: &EventChannel<'_, S>,
		subject: &mut LogSubject,
	) -> u64 {
		subject.cgid = match self.cgroup_id(mem, task) {
			Ok(cgid) => cgid,
			Err(_) => {
				let current = LogSubject {
					cgid: UNKNOWN_ID,
					..*subject
				};
				crate::log_event!(logs, LogCode::FailToResolveCgroupId, || current);
				UNKNOWN_ID
			}
		};

		match self.parent_cgroup_id(mem, task) {
			Ok(cgid) => cgid,
			Err(_) => {
				let current = *subject;
				crate::log_event!(logs, LogCode::FailToResolveParentCgroupId, || current);
				UNKNOWN_ID
			}
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
