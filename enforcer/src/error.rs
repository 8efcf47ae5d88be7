use std::path::PathBuf;

use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum Error {
	#[from(String, &String, &str)]
	Custom(String),
	InvalidEventSize,
	UnknownLogCode(u32),

	// -- Kernel layout
	#[display("BTF error: {_0}")]
	Btf(String),

	// -- Cgroups
	#[display("unsupported cgroup filesystem type: {_0:#x}")]
	UnsupportedCgroupFs(u64),
	NotAMountPoint(PathBuf),
	NoInterestingController(Vec<String>),
	MalformedCgroupsLine(String),

	// -- Externals
	#[from]
	Io(std::io::Error),
}

impl From<enforcer_common::UnknownLogCode> for Error {
	fn from(val: enforcer_common::UnknownLogCode) -> Self {
		Self::UnknownLogCode(val.0)
	}
}

// region:    --- Custom

impl Error {
	pub fn custom_from_err(err: impl std::error::Error) -> Self {
		Self::Custom(err.to_string())
	}
}

// endregion: --- Custom

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
