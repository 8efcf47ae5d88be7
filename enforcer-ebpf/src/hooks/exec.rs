use aya_ebpf::{
	bindings::path,
	helpers::{
		bpf_get_current_comm, bpf_get_current_pid_tgid, bpf_probe_read_kernel_str_bytes,
		r#gen::{bpf_d_path, bpf_get_current_task, bpf_get_smp_processor_id},
	},
	programs::LsmContext,
};
use core::ptr::addr_of_mut;

use enforcer_common::{
	field_addr, load_ptr, log_event, offset, CgroupWalker, EventChannel, ExecEvent, LogCode, LogSubject, PATH_LEN,
	TASK_COMM_LEN, UNKNOWN_ID,
};

use crate::{
	compat::ProbeRead,
	log::LogRing,
	maps::{kernel_layout, load_time_config, CG_TRACKER_MAP, FPATH, RINGBUF_EXEC},
};

const ENAMETOOLONG: i64 = 36;

/// Reports every exec to user space. Never denies: every path returns `Ok(0)` and
/// problems along the way only show up in the diagnostics channel.
pub fn try_bprm_check_security(ctx: LsmContext) -> Result<i32, i32> {
	let config = load_time_config();
	let layout = kernel_layout();
	let logs = EventChannel::new(&config, &LogRing);
	let walker = CgroupWalker::new(&config, &layout);

	let pid_tgid = bpf_get_current_pid_tgid();
	let task = unsafe { bpf_get_current_task() } as *const u8;
	let mut subject = LogSubject {
		comm: bpf_get_current_comm().unwrap_or([0u8; TASK_COMM_LEN]),
		cgid: UNKNOWN_ID,
		cg_tracker_id: UNKNOWN_ID,
		pid: pid_tgid as u32,
		tgid: (pid_tgid >> 32) as u32,
	};

	let parent_cgid = unsafe { walker.resolve_subject(&ProbeRead, task, &logs, &mut subject) };
	if let Some(tracker) = unsafe { CG_TRACKER_MAP.get(&subject.cgid) } {
		subject.cg_tracker_id = *tracker;
	}

	let Some(buf) = FPATH.get_ptr_mut(0) else {
		log_event!(logs, LogCode::MissingProcessEvtMap, || subject, unsafe {
			bpf_get_smp_processor_id()
		} as u64);
		return Ok(0);
	};

	// `file` must stay a typed pointer for bpf_d_path, so it is loaded through the
	// ctx argument and never through the read helper.
	let bprm: *const u8 = unsafe { ctx.arg(0) };
	let file = match offset(layout.binprm_file).and_then(|at| unsafe { load_ptr(bprm, at) }) {
		Ok(file) => file,
		Err(_) => {
			log_event!(logs, LogCode::MissingFileStruct, || subject);
			return Ok(0);
		}
	};
	let Ok(f_path_at) = offset(layout.file_f_path) else {
		log_event!(logs, LogCode::FailToResolvePath, || subject);
		return Ok(0);
	};

	let ret = unsafe {
		let f_path = field_addr(file, f_path_at) as *mut path;
		bpf_d_path(f_path, buf as *mut i8, PATH_LEN as u32)
	};
	if ret == -ENAMETOOLONG {
		log_event!(logs, LogCode::PathLenTooLong, || subject);
		return Ok(0);
	}
	if ret < 0 {
		log_event!(logs, LogCode::FailToResolvePath, || subject, (-ret) as u64);
		return Ok(0);
	}
	// Length includes the trailing NUL.
	if ret <= 1 {
		log_event!(logs, LogCode::EmptyPath, || subject);
		return Ok(0);
	}

	let Some(mut entry) = RINGBUF_EXEC.reserve::<ExecEvent>(0) else {
		log_event!(logs, LogCode::DropExecEvent, || subject);
		return Ok(0);
	};

	// Ring memory is reused. No reference to the record before it is initialised.
	let event = entry.as_mut_ptr();
	let copied = unsafe {
		ExecEvent::init_at(event, &subject, parent_cgid);
		bpf_probe_read_kernel_str_bytes(buf as *const u8, &mut *addr_of_mut!((*event).path))
	}
	.map(|p| p.len());
	if let Err(errno) = copied {
		entry.discard(0);
		log_event!(logs, LogCode::FailToCopyExecPath, || subject, errno.unsigned_abs());
		return Ok(0);
	}

	entry.submit(0);
	Ok(0)
}
