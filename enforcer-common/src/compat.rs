//! Kernel ABI compatibility.
//!
//! Field offsets and the `kernfs_node.id` shape are resolved once, in user space,
//! from the running kernel's BTF. They reach the eBPF side through the
//! `KERNEL_LAYOUT` global and never change afterwards, so every accessor here only
//! dispatches on an already-known tag.

use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const KERNEL_LAYOUT_SYMBOL: &str = "KERNEL_LAYOUT";

/// Tag stored in `KernelLayout::kernfs_id_layout` when no known shape matched.
pub const LAYOUT_UNRESOLVED: u32 = 0;

/// Offset value meaning "field not found in this kernel".
pub const OFFSET_UNKNOWN: u32 = u32::MAX;

/// Known shapes of `struct kernfs_node` member `id`.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernfsIdLayout {
	/// `u64 id;`
	Modern = 1,
	/// `union kernfs_node_id id;` on 5.4 and older kernels (RHEL7 and friends).
	Legacy = 2,
}

impl KernfsIdLayout {
	#[inline(always)]
	pub const fn from_tag(tag: u32) -> Option<Self> {
		match tag {
			1 => Some(KernfsIdLayout::Modern),
			2 => Some(KernfsIdLayout::Legacy),
			_ => None,
		}
	}

	pub const fn tag(self) -> u32 {
		self as u32
	}
}

/// The legacy `{ ino, generation }` half of `union kernfs_node_id`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct KernfsIdParts {
	pub ino: u32,
	pub generation: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union KernfsNodeId {
	pub parts: KernfsIdParts,
	pub id: u64,
}

impl KernfsIdParts {
	/// Bit-identical reinterpretation through the union, not an arithmetic combination.
	#[inline(always)]
	pub const fn to_id(self) -> u64 {
		// SAFETY: both union members are plain integers of the same size.
		unsafe { KernfsNodeId { parts: self }.id }
	}

	#[inline(always)]
	pub const fn from_id(id: u64) -> Self {
		// SAFETY: both union members are plain integers of the same size.
		unsafe { KernfsNodeId { id }.parts }
	}
}

/// Byte offsets of every kernel field the instrumentation touches.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct KernelLayout {
	pub kernfs_id_layout: u32,
	pub kernfs_id: u32,
	pub task_cgroups: u32,
	pub task_real_parent: u32,
	pub css_set_dfl_cgrp: u32,
	pub css_set_subsys: u32,
	pub css_cgroup: u32,
	pub cgroup_kn: u32,
	pub binprm_file: u32,
	pub file_f_path: u32,
}

impl KernelLayout {
	pub const fn unresolved() -> Self {
		KernelLayout {
			kernfs_id_layout: LAYOUT_UNRESOLVED,
			kernfs_id: OFFSET_UNKNOWN,
			task_cgroups: OFFSET_UNKNOWN,
			task_real_parent: OFFSET_UNKNOWN,
			css_set_dfl_cgrp: OFFSET_UNKNOWN,
			css_set_subsys: OFFSET_UNKNOWN,
			css_cgroup: OFFSET_UNKNOWN,
			cgroup_kn: OFFSET_UNKNOWN,
			binprm_file: OFFSET_UNKNOWN,
			file_f_path: OFFSET_UNKNOWN,
		}
	}

	pub const fn kernfs_layout(&self) -> Option<KernfsIdLayout> {
		KernfsIdLayout::from_tag(self.kernfs_id_layout)
	}
}

impl Default for KernelLayout {
	fn default() -> Self {
		Self::unresolved()
	}
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for KernelLayout {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompatError {
	/// No known layout matched the running kernel.
	Unresolvable,
	/// A field the walk needs does not exist in the running kernel.
	MissingOffset,
	NullPointer,
	/// The kernel read helper failed with this errno.
	ReadFault(i64),
}

impl core::fmt::Display for CompatError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		write!(f, "{self:?}")
	}
}

impl core::error::Error for CompatError {}

/// Reads from kernel memory. `bpf_probe_read_kernel` in eBPF, plain loads in tests.
pub trait KernelRead {
	/// # Safety
	///
	/// `src` must be an address the implementation is allowed to read.
	unsafe fn read<T: Copy>(&self, src: *const T) -> Result<T, i64>;
}

#[inline(always)]
pub fn offset(raw: u32) -> Result<usize, CompatError> {
	if raw == OFFSET_UNKNOWN {
		return Err(CompatError::MissingOffset);
	}
	Ok(raw as usize)
}

/// Reads a `T` located `offset` bytes into the kernel object at `base`.
///
/// # Safety
///
/// `base` must point to a kernel object that has a `T` at `offset`.
#[inline(always)]
pub unsafe fn read_field<R: KernelRead, T: Copy>(mem: &R, base: *const u8, offset: usize) -> Result<T, CompatError> {
	if base.is_null() {
		return Err(CompatError::NullPointer);
	}
	mem.read(field_addr(base, offset) as *const T).map_err(CompatError::ReadFault)
}

/// Address of the field `offset` bytes into `base`. Kernel addresses sit at the
/// top of the address space, so this never assumes the sum stays in bounds.
#[inline(always)]
pub fn field_addr(base: *const u8, offset: usize) -> *const u8 {
	base.wrapping_add(offset)
}

/// Like [`read_field`], for pointer fields, rejecting NULL.
///
/// # Safety
///
/// Same as [`read_field`].
#[inline(always)]
pub unsafe fn read_ptr<R: KernelRead>(mem: &R, base: *const u8, offset: usize) -> Result<*const u8, CompatError> {
	let ptr: *const u8 = read_field(mem, base, offset)?;
	if ptr.is_null() {
		return Err(CompatError::NullPointer);
	}
	Ok(ptr)
}

/// Loads a pointer field straight through `base`, without the read helper.
///
/// Used where the verifier must keep tracking the result as a typed kernel
/// pointer, e.g. `linux_binprm.file` fed to `bpf_d_path`. A pointer obtained
/// through `bpf_probe_read_kernel` is only a scalar to it.
///
/// # Safety
///
/// `base` must be NULL or a trusted pointer to an object with a pointer at `offset`.
#[inline(always)]
pub unsafe fn load_ptr(base: *const u8, offset: usize) -> Result<*const u8, CompatError> {
	if base.is_null() {
		return Err(CompatError::NullPointer);
	}
	let ptr = core::ptr::read_volatile(field_addr(base, offset) as *const *const u8);
	if ptr.is_null() {
		return Err(CompatError::NullPointer);
	}
	Ok(ptr)
}

/// Reads `kernfs_node.id` with the layout chosen at load time.
#[derive(Clone, Copy, Debug)]
pub struct KernfsIdResolver {
	layout: Option<KernfsIdLayout>,
	id_offset: u32,
}

impl KernfsIdResolver {
	pub const fn new(layout: &KernelLayout) -> Self {
		KernfsIdResolver {
			layout: layout.kernfs_layout(),
			id_offset: layout.kernfs_id,
		}
	}

	pub const fn layout(&self) -> Option<KernfsIdLayout> {
		self.layout
	}

	/// # Safety
	///
	/// `kn` must be NULL or point to a `struct kernfs_node`.
	#[inline(always)]
	pub unsafe fn resolve<R: KernelRead>(&self, mem: &R, kn: *const u8) -> Result<u64, CompatError> {
		let layout = self.layout.ok_or(CompatError::Unresolvable)?;
		let at = offset(self.id_offset).map_err(|_| CompatError::Unresolvable)?;
		match layout {
			KernfsIdLayout::Modern => read_field::<R, u64>(mem, kn, at),
			KernfsIdLayout::Legacy => read_field::<R, KernfsIdParts>(mem, kn, at).map(KernfsIdParts::to_id),
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
