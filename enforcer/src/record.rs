use std::borrow::Cow;

use enforcer_common::{LogCode, LogEvent};
use tracing::Level;
use zerocopy::FromBytes;

use crate::{Error, Result};

/// One decoded `RINGBUF_LOGS` record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogRecord {
	pub event: LogEvent,
}

impl LogRecord {
	pub fn parse(data: &[u8]) -> Result<Self> {
		let (event, _) = LogEvent::read_from_prefix(data).map_err(|_| Error::InvalidEventSize)?;
		Ok(LogRecord { event })
	}

	pub fn code(&self) -> Result<LogCode> {
		Ok(self.event.log_code()?)
	}

	pub fn comm(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(self.event.comm_bytes())
	}

	pub fn message(&self) -> &'static str {
		match self.code() {
			Ok(LogCode::MissingProcessEvtMap) => "failed to lookup process event in per-cpu map",
			Ok(LogCode::MissingFileStruct) => "executable with missing file struct",
			Ok(LogCode::FailToResolvePath) => "failed to resolve path",
			Ok(LogCode::EmptyPath) => "empty path detected",
			Ok(LogCode::FailToCopyExecPath) => "failed to copy exec path",
			Ok(LogCode::DropExecEvent) => "dropped exec event",
			Ok(LogCode::PathLenTooLong) => "path length too long",
			Ok(LogCode::PolicyModeMissing) => "policy mode missing",
			Ok(LogCode::DropViolation) => "dropped violation event",
			Ok(LogCode::FailToResolveCgroupId) => "failed to resolve cgroup id",
			Ok(LogCode::FailToResolveParentCgroupId) => "failed to resolve parent cgroup id",
			Err(_) => "unknown log event type",
		}
	}

	pub fn level(&self) -> Level {
		match self.code() {
			Ok(LogCode::MissingProcessEvtMap | LogCode::MissingFileStruct | LogCode::FailToCopyExecPath) | Err(_) => {
				Level::ERROR
			}
			Ok(_) => Level::WARN,
		}
	}

	/// Renders the record through `tracing` with the per-code extra fields.
	pub fn log(&self) {
		let evt = &self.event;
		let msg = self.message();
		let comm = self.comm();

		macro_rules! emit {
			($lvl:ident $(, $key:ident = $val:expr)*) => {
				tracing::$lvl!(
					tid = evt.pid,
					pid = evt.tgid,
					comm = %comm,
					cgroup_id = evt.cgid,
					cgroup_tracker_id = evt.cg_tracker_id,
					$($key = $val,)*
					"{}",
					msg
				)
			};
		}

		match self.code() {
			Ok(LogCode::MissingProcessEvtMap) => emit!(error, cpu = evt.arg1),
			Ok(LogCode::MissingFileStruct) => emit!(error),
			Ok(LogCode::FailToCopyExecPath) => emit!(error, errno = evt.arg1),
			Ok(LogCode::FailToResolvePath) => emit!(warn, errno = evt.arg1),
			Ok(LogCode::PolicyModeMissing) => emit!(warn, policy_id = evt.arg1),
			Ok(LogCode::DropViolation) => emit!(warn, policy_id = evt.arg1, mode = evt.arg2),
			Ok(_) => emit!(warn),
			Err(_) => tracing::error!(code = evt.code, "{msg}"),
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
