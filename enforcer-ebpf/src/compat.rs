use aya_ebpf::helpers::bpf_probe_read_kernel;
use enforcer_common::KernelRead;

pub struct ProbeRead;

impl KernelRead for ProbeRead {
	#[inline(always)]
	unsafe fn read<T: Copy>(&self, src: *const T) -> Result<T, i64> {
		bpf_probe_read_kernel(src).map_err(|e| e as i64)
	}
}
