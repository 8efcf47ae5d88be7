use core::ptr::addr_of_mut;

use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const TASK_COMM_LEN: usize = 16;
pub const PATH_LEN: usize = 256;

/// Placeholder for ids that could not be resolved. Cgroup ids start at 1.
pub const UNKNOWN_ID: u64 = 0;

/// A single buffer shared between all CPUs.
pub const LOG_RINGBUF_BYTES: u32 = 16 * 1024 * 1024;
pub const EXEC_RINGBUF_BYTES: u32 = 256 * 1024;

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogCode {
	/// arg1 is the cpu.
	MissingProcessEvtMap = 1,
	MissingFileStruct = 2,
	/// arg1 is the errno returned by the path helper.
	FailToResolvePath = 3,
	EmptyPath = 4,
	/// arg1 is the errno returned by the copy helper.
	FailToCopyExecPath = 5,
	DropExecEvent = 6,
	PathLenTooLong = 7,
	/// arg1 is the policy id.
	PolicyModeMissing = 8,
	/// arg1 is the policy id, arg2 the policy mode.
	DropViolation = 9,
	FailToResolveCgroupId = 10,
	FailToResolveParentCgroupId = 11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownLogCode(pub u32);

impl TryFrom<u32> for LogCode {
	type Error = UnknownLogCode;

	fn try_from(value: u32) -> Result<Self, Self::Error> {
		let code = match value {
			1 => LogCode::MissingProcessEvtMap,
			2 => LogCode::MissingFileStruct,
			3 => LogCode::FailToResolvePath,
			4 => LogCode::EmptyPath,
			5 => LogCode::FailToCopyExecPath,
			6 => LogCode::DropExecEvent,
			7 => LogCode::PathLenTooLong,
			8 => LogCode::PolicyModeMissing,
			9 => LogCode::DropViolation,
			10 => LogCode::FailToResolveCgroupId,
			11 => LogCode::FailToResolveParentCgroupId,
			other => return Err(UnknownLogCode(other)),
		};
		Ok(code)
	}
}

/// Who a diagnostic is about. Built lazily by the channel, only when logging is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogSubject {
	pub comm: [u8; TASK_COMM_LEN],
	pub cgid: u64,
	pub cg_tracker_id: u64,
	pub pid: u32,
	pub tgid: u32,
}

impl LogSubject {
	pub const fn unknown() -> Self {
		LogSubject {
			comm: [0u8; TASK_COMM_LEN],
			cgid: UNKNOWN_ID,
			cg_tracker_id: UNKNOWN_ID,
			pid: 0,
			tgid: 0,
		}
	}
}

/// Copies a task name the way the kernel stores it: at most 15 bytes, NUL terminated.
pub fn comm_from(name: &[u8]) -> [u8; TASK_COMM_LEN] {
	let mut comm = [0u8; TASK_COMM_LEN];
	let len = name.len().min(TASK_COMM_LEN - 1);
	comm[..len].copy_from_slice(&name[..len]);
	comm
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct LogEvent {
	pub code: u32,
	pub comm: [u8; TASK_COMM_LEN],
	pub _pad0: [u8; 4],
	pub cgid: u64,
	pub cg_tracker_id: u64,
	pub pid: u32,
	pub tgid: u32,
	pub arg1: u64,
	pub arg2: u64,
}

const _: () = assert!(core::mem::size_of::<LogEvent>() == 64);

impl LogEvent {
	#[inline(always)]
	pub fn new(code: LogCode, subject: &LogSubject, arg1: u64, arg2: u64) -> Self {
		LogEvent {
			code: code as u32,
			comm: subject.comm,
			_pad0: [0u8; 4],
			cgid: subject.cgid,
			cg_tracker_id: subject.cg_tracker_id,
			pid: subject.pid,
			tgid: subject.tgid,
			arg1,
			arg2,
		}
	}

	pub fn log_code(&self) -> Result<LogCode, UnknownLogCode> {
		LogCode::try_from(self.code)
	}

	/// The task name up to the first NUL, or all 16 bytes when there is none.
	pub fn comm_bytes(&self) -> &[u8] {
		let len = self.comm.iter().position(|&b| b == 0).unwrap_or(TASK_COMM_LEN);
		&self.comm[..len]
	}
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ExecEvent {
	pub cgid: u64,
	pub parent_cgid: u64,
	pub cg_tracker_id: u64,
	pub pid: u32,
	pub tgid: u32,
	pub comm: [u8; TASK_COMM_LEN],
	pub path: [u8; PATH_LEN],
}

impl ExecEvent {
	/// Initialises a freshly reserved, possibly dirty, record in place. `path` is
	/// zeroed and left for the caller to fill.
	///
	/// # Safety
	///
	/// `dst` must be valid for writes of one `ExecEvent`.
	#[inline(always)]
	pub unsafe fn init_at(dst: *mut ExecEvent, subject: &LogSubject, parent_cgid: u64) {
		addr_of_mut!((*dst).cgid).write(subject.cgid);
		addr_of_mut!((*dst).parent_cgid).write(parent_cgid);
		addr_of_mut!((*dst).cg_tracker_id).write(subject.cg_tracker_id);
		addr_of_mut!((*dst).pid).write(subject.pid);
		addr_of_mut!((*dst).tgid).write(subject.tgid);
		addr_of_mut!((*dst).comm).write(subject.comm);
		addr_of_mut!((*dst).path).write_bytes(0, 1);
	}
}

// region:    --- Tests


// endregion: --- Tests
