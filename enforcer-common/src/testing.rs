//! In-process stand-ins for the kernel side: a bounded multi-producer ring and
//! direct memory reads.

use std::sync::atomic::{AtomicUsize, Ordering};

use flume::{Receiver, Sender, TrySendError};

use crate::{channel::LogSink, compat::KernelRead, event::LogEvent};

const EFAULT: i64 = -14;

/// Bounded queue with the same contract as the kernel ring buffer: producers
/// never wait and a full ring rejects the newest record.
pub struct FixtureRing<const N: usize> {
	tx: Sender<LogEvent>,
	rx: Receiver<LogEvent>,
	committed: AtomicUsize,
	dropped: AtomicUsize,
}

impl<const N: usize> FixtureRing<N> {
	pub fn new() -> Self {
		let (tx, rx) = flume::bounded(N);
		FixtureRing {
			tx,
			rx,
			committed: AtomicUsize::new(0),
			dropped: AtomicUsize::new(0),
		}
	}

	pub fn committed(&self) -> usize {
		self.committed.load(Ordering::Acquire)
	}

	pub fn dropped(&self) -> usize {
		self.dropped.load(Ordering::Acquire)
	}

	pub fn pop(&self) -> Option<LogEvent> {
		self.rx.try_recv().ok()
	}
}

impl<const N: usize> LogSink for FixtureRing<N> {
	fn commit(&self, event: &LogEvent) -> bool {
		match self.tx.try_send(*event) {
			Ok(()) => {
				self.committed.fetch_add(1, Ordering::AcqRel);
				true
			}
			Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
				self.dropped.fetch_add(1, Ordering::AcqRel);
				false
			}
		}
	}
}

/// Reads straight from process memory. NULL faults like the kernel helper does.
pub struct FixtureMemory;

impl KernelRead for FixtureMemory {
	unsafe fn read<T: Copy>(&self, src: *const T) -> Result<T, i64> {
		if src.is_null() {
			return Err(EFAULT);
		}
		Ok(core::ptr::read_unaligned(src))
	}
}

/// Every read fails with the given errno.
pub struct FaultingMemory(pub i64);

impl KernelRead for FaultingMemory {
	unsafe fn read<T: Copy>(&self, _src: *const T) -> Result<T, i64> {
		Err(self.0)
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::event::{LogCode, LogSubject};

	#[test]
	fn full_ring_rejects_newest_and_keeps_oldest() -> Result<()> {
		// -- Setup & Fixtures
		let ring = FixtureRing::<2>::new();
		let fx_evt = |arg1| LogEvent::new(LogCode::EmptyPath, &LogSubject::unknown(), arg1, 0);

		// -- Exec
		let accepted: Vec<bool> = (0..4u64).map(|i| ring.commit(&fx_evt(i))).collect();

		// -- Check
		assert_eq!(accepted, [true, true, false, false]);
		assert_eq!((ring.committed(), ring.dropped()), (2, 2));
		assert_eq!(ring.pop().map(|e| e.arg1), Some(0));
		assert_eq!(ring.pop().map(|e| e.arg1), Some(1));
		assert!(ring.pop().is_none());

		// room again after draining
		assert!(ring.commit(&fx_evt(9)));
		assert_eq!(ring.pop().map(|e| e.arg1), Some(9));

		Ok(())
	}
}

// endregion: --- Tests
