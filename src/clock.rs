//! Time sources used for local expiry checks.

// self
use crate::_prelude::*;

/// Supplies the instant treated as "now" for expiry decisions.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall-clock UTC time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock for tests and replay tooling.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `instant`.
	pub fn new(instant: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(instant)))
	}

	/// Creates a clock frozen at the given Unix second.
	pub fn at_unix(seconds: i64) -> Self {
		Self::new(OffsetDateTime::UNIX_EPOCH + Duration::seconds(seconds))
	}

	/// Moves the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}

	/// Moves the clock to the given Unix second.
	pub fn set_unix(&self, seconds: i64) {
		self.set(OffsetDateTime::UNIX_EPOCH + Duration::seconds(seconds));
	}

	/// Advances the clock by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}
