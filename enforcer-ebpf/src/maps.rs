use aya_ebpf::{
	macros::map,
	maps::{HashMap, PerCpuArray, RingBuf},
};
use enforcer_common::{KernelLayout, LoadTimeConfig, EXEC_RINGBUF_BYTES, LOG_RINGBUF_BYTES, PATH_LEN};

const CG_TRACKER_MAX_ENTRIES: u32 = 8192;

#[map]
pub static RINGBUF_LOGS: RingBuf = RingBuf::with_byte_size(LOG_RINGBUF_BYTES, 0);

#[map]
pub static RINGBUF_EXEC: RingBuf = RingBuf::with_byte_size(EXEC_RINGBUF_BYTES, 0);

/// Scratch space for `bpf_d_path`, too large for the stack.
#[map(name = "FPATH")]
pub static FPATH: PerCpuArray<[u8; PATH_LEN]> = PerCpuArray::with_max_entries(1, 0);

/// Cgroup id -> id of the tracked cgroup it belongs to. Filled from user space.
#[map]
pub static CG_TRACKER_MAP: HashMap<u64, u64> = HashMap::with_max_entries(CG_TRACKER_MAX_ENTRIES, 0);

// region:    --- Load-time globals

#[no_mangle]
static LOAD_TIME_CONFIG: LoadTimeConfig = LoadTimeConfig::disabled();

#[no_mangle]
static KERNEL_LAYOUT: KernelLayout = KernelLayout::unresolved();

// The loader rewrites both symbols before load, the compiler must not fold them.
#[inline(always)]
pub fn load_time_config() -> LoadTimeConfig {
	unsafe { core::ptr::read_volatile(&LOAD_TIME_CONFIG) }
}

#[inline(always)]
pub fn kernel_layout() -> KernelLayout {
	unsafe { core::ptr::read_volatile(&KERNEL_LAYOUT) }
}

// endregion: --- Load-time globals
