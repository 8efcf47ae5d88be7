#![cfg_attr(not(test), no_std)]

// region:    --- Modules
mod cgroup;
mod channel;
mod compat;
mod config;
mod event;

#[cfg(test)]
mod testing;
// endregion: --- Modules

pub use cgroup::*;
pub use channel::*;
pub use compat::*;
pub use config::*;
pub use event::*;
