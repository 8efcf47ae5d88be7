use anyhow::Context as _;
use which::which;

/// The eBPF object is linked by `bpf-linker`, which cargo does not track. Rebuild
/// whenever the binary found on `PATH` changes.
fn main() -> anyhow::Result<()> {
	let bpf_linker = which("bpf-linker").context("bpf-linker not found in PATH")?;
	println!("cargo:rerun-if-changed={}", bpf_linker.display());
	Ok(())
}
