use enforcer_common::{LogEvent, LogSink};

use crate::maps::RINGBUF_LOGS;

/// Writes records into `RINGBUF_LOGS`. A failed reservation means the ring is full.
pub struct LogRing;

impl LogSink for LogRing {
	#[inline(always)]
	fn commit(&self, event: &LogEvent) -> bool {
		match RINGBUF_LOGS.reserve::<LogEvent>(0) {
			Some(mut entry) => {
				entry.write(*event);
				entry.submit(0);
				true
			}
			None => false,
		}
	}
}
