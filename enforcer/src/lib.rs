// region:    --- Modules
mod error;
mod load_time;
mod record;

pub mod cgroups;
pub mod layout;
// endregion: --- Modules

pub use self::error::{Error, Result};
pub use load_time::*;
pub use record::*;
