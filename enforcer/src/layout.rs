//! Kernel layout discovery from BTF.
//!
//! Everything the eBPF side needs to know about kernel structs is resolved here,
//! once, and handed over as a [`KernelLayout`].

use std::path::Path;

use btf_rs::{Btf, Type};
use enforcer_common::{KernelLayout, KernfsIdLayout, LAYOUT_UNRESOLVED, OFFSET_UNKNOWN};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// What a struct member turned out to be, typedefs and qualifiers stripped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldShape {
	/// Integer of this many bytes.
	Int(usize),
	/// Union with these member names. Members of anonymous structs inside the
	/// union are listed as if they were direct members.
	Union(Vec<String>),
	Struct,
	Pointer,
	Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
	/// Byte offset from the start of the outer struct.
	pub offset: u32,
	pub shape: FieldShape,
}

/// Read-only view over kernel type information.
pub trait TypeInfo {
	/// Looks up `member` in `struct strct`, descending into anonymous members.
	/// `Ok(None)` when the struct or the member does not exist.
	fn field(&self, strct: &str, member: &str) -> Result<Option<FieldInfo>>;
}

// region:    --- BTF

pub fn load_btf(path: &Path) -> Result<Btf> {
	Btf::from_file(path).map_err(|e| Error::Btf(format!("{}: {e}", path.display())))
}

fn btf_err(err: impl std::fmt::Display) -> Error {
	Error::Btf(err.to_string())
}

fn strip_modifiers(btf: &Btf, mut ty: Type) -> Result<Type> {
	loop {
		ty = match ty {
			Type::Typedef(t) => btf.resolve_chained_type(&t).map_err(btf_err)?,
			Type::Const(t) => btf.resolve_chained_type(&t).map_err(btf_err)?,
			Type::Volatile(t) => btf.resolve_chained_type(&t).map_err(btf_err)?,
			Type::Restrict(t) => btf.resolve_chained_type(&t).map_err(btf_err)?,
			other => return Ok(other),
		};
	}
}

fn union_member_names(btf: &Btf, union: &btf_rs::Struct, names: &mut Vec<String>) -> Result<()> {
	for member in union.members.iter() {
		let name = btf.resolve_name(member).unwrap_or_default();
		if !name.is_empty() {
			names.push(name);
			continue;
		}
		if let Type::Struct(inner) | Type::Union(inner) =
			strip_modifiers(btf, btf.resolve_chained_type(member).map_err(btf_err)?)?
		{
			union_member_names(btf, &inner, names)?;
		}
	}
	Ok(())
}

fn shape_of(btf: &Btf, ty: Type) -> Result<FieldShape> {
	let shape = match strip_modifiers(btf, ty)? {
		Type::Int(int) => FieldShape::Int(int.size()),
		Type::Union(union) => {
			let mut names = Vec::new();
			union_member_names(btf, &union, &mut names)?;
			FieldShape::Union(names)
		}
		Type::Struct(_) => FieldShape::Struct,
		Type::Ptr(_) => FieldShape::Pointer,
		_ => FieldShape::Other,
	};
	Ok(shape)
}

fn find_member(btf: &Btf, strct: &btf_rs::Struct, member: &str, base_bits: u32) -> Result<Option<FieldInfo>> {
	for m in strct.members.iter() {
		let bits = base_bits + m.bit_offset();
		let name = btf.resolve_name(m).unwrap_or_default();
		let ty = btf.resolve_chained_type(m).map_err(btf_err)?;

		if name == member {
			return Ok(Some(FieldInfo {
				offset: bits / 8,
				shape: shape_of(btf, ty)?,
			}));
		}
		if name.is_empty() {
			if let Type::Struct(inner) | Type::Union(inner) = strip_modifiers(btf, ty)? {
				if let Some(found) = find_member(btf, &inner, member, bits)? {
					return Ok(Some(found));
				}
			}
		}
	}
	Ok(None)
}

impl TypeInfo for Btf {
	fn field(&self, strct: &str, member: &str) -> Result<Option<FieldInfo>> {
		// Unknown names are an error in btf-rs, a missing field for us.
		let Ok(types) = self.resolve_types_by_name(strct) else {
			return Ok(None);
		};
		for ty in types {
			if let Type::Struct(s) = ty {
				if let Some(found) = find_member(self, &s, member, 0)? {
					return Ok(Some(found));
				}
			}
		}
		Ok(None)
	}
}

// endregion: --- BTF

// region:    --- Probing

/// Matches `kernfs_node.id` against the known shapes.
pub fn resolve_kernfs_id_layout(types: &impl TypeInfo) -> Result<Option<(KernfsIdLayout, u32)>> {
	let Some(field) = types.field("kernfs_node", "id")? else {
		return Ok(None);
	};
	let layout = match &field.shape {
		FieldShape::Int(8) => Some(KernfsIdLayout::Modern),
		FieldShape::Union(names) if names.iter().any(|n| n == "ino") && names.iter().any(|n| n == "generation") => {
			Some(KernfsIdLayout::Legacy)
		}
		_ => None,
	};
	Ok(layout.map(|l| (l, field.offset)))
}

const FIELDS: [(&str, &str); 8] = [
	("task_struct", "cgroups"),
	("task_struct", "real_parent"),
	("css_set", "dfl_cgrp"),
	("css_set", "subsys"),
	("cgroup_subsys_state", "cgroup"),
	("cgroup", "kn"),
	("linux_binprm", "file"),
	("file", "f_path"),
];

fn offset_or_unknown(types: &impl TypeInfo, strct: &str, member: &str) -> Result<u32> {
	match types.field(strct, member)? {
		Some(field) => {
			debug!("{strct}.{member} at offset {}", field.offset);
			Ok(field.offset)
		}
		None => {
			warn!("{strct}.{member} not found, dependent lookups will report unknown ids");
			Ok(OFFSET_UNKNOWN)
		}
	}
}

/// Builds the full layout. Missing pieces are recorded as unknown, never fatal.
pub fn probe_kernel_layout(types: &impl TypeInfo) -> Result<KernelLayout> {
	let mut layout = KernelLayout::unresolved();

	match resolve_kernfs_id_layout(types)? {
		Some((kind, offset)) => {
			info!("kernfs_node.id layout: {kind:?} at offset {offset}");
			layout.kernfs_id_layout = kind.tag();
			layout.kernfs_id = offset;
		}
		None => {
			warn!("unknown kernfs_node.id layout, cgroup ids will be reported as unknown");
			layout.kernfs_id_layout = LAYOUT_UNRESOLVED;
		}
	}

	let [cgroups, real_parent, dfl_cgrp, subsys, css_cgroup, cgroup_kn, binprm_file, f_path] =
		FIELDS.map(|(s, m)| offset_or_unknown(types, s, m));
	layout.task_cgroups = cgroups?;
	layout.task_real_parent = real_parent?;
	layout.css_set_dfl_cgrp = dfl_cgrp?;
	layout.css_set_subsys = subsys?;
	layout.css_cgroup = css_cgroup?;
	layout.cgroup_kn = cgroup_kn?;
	layout.binprm_file = binprm_file?;
	layout.file_f_path = f_path?;

	Ok(layout)
}

// endregion: --- Probing

// region:    --- Tests


// endregion: --- Tests
