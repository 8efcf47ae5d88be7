#![no_std]
#![no_main]

use aya_ebpf::{macros::lsm, programs::LsmContext};

mod compat;
mod hooks;
mod log;
mod maps;

#[lsm(hook = "bprm_check_security")]
pub fn bprm_check_security(ctx: LsmContext) -> i32 {
	match hooks::try_bprm_check_security(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
	loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
