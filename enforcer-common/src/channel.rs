use crate::{
	config::LoadTimeConfig,
	event::{LogCode, LogEvent, LogSubject},
};

/// Destination of diagnostic records.
///
/// `commit` must either publish the whole record or nothing, and must never wait:
/// when there is no room it returns `false` and the record is gone.
pub trait LogSink {
	fn commit(&self, event: &LogEvent) -> bool;
}

/// Gated, lossy diagnostics channel.
///
/// The gate is the load-time `debug_mode`. When it is off, `emit` returns before
/// the subject closure runs, so call sites pay for one branch and nothing else.
pub struct EventChannel<'a, S> {
	sink: &'a S,
	enabled: bool,
}

impl<'a, S: LogSink> EventChannel<'a, S> {
	#[inline(always)]
	pub fn new(config: &LoadTimeConfig, sink: &'a S) -> Self {
		EventChannel {
			sink,
			enabled: config.debug_enabled(),
		}
	}

	#[inline(always)]
	pub fn enabled(&self) -> bool {
		self.enabled
	}

	/// Best effort. A full sink drops the record silently.
	#[inline(always)]
	pub fn emit<F>(&self, code: LogCode, subject: F, arg1: u64, arg2: u64)
	where
		F: FnOnce() -> LogSubject,
	{
		if !self.enabled {
			return;
		}
		let event = LogEvent::new(code, &subject(), arg1, arg2);
		let _ = self.sink.commit(&event);
	}
}

/// Guarded form of [`EventChannel::emit`]: with logging off neither the subject nor
/// the argument expressions are evaluated.
///
/// ```ignore
/// log_event!(logs, LogCode::DropViolation, || subject, policy_id, mode);
/// ```
#[macro_export]
macro_rules! log_event {
	($chan:expr, $code:expr, $subject:expr) => {
		$crate::log_event!($chan, $code, $subject, 0, 0)
	};
	($chan:expr, $code:expr, $subject:expr, $arg1:expr) => {
		$crate::log_event!($chan, $code, $subject, $arg1, 0)
	};
	($chan:expr, $code:expr, $subject:expr, $arg1:expr, $arg2:expr) => {{
		let chan = &$chan;
		if chan.enabled() {
			chan.emit($code, $subject, $arg1, $arg2);
		}
	}};
}

// region:    --- Tests


// endregion: --- Tests
