// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for the token lifecycle of one [`TokenClient`](crate::flows::TokenClient).
#[derive(Debug, Default)]
pub struct FlowMetrics {
	acquisitions: AtomicU64,
	refreshes: AtomicU64,
	cache_hits: AtomicU64,
	failures: AtomicU64,
}
impl FlowMetrics {
	/// Returns the number of successful client-credentials acquisitions.
	pub fn acquisitions(&self) -> u64 {
		self.acquisitions.load(Ordering::Relaxed)
	}

	/// Returns the number of successful refreshes.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of calls served from the stored credential.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of failed acquisitions and refreshes.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_acquisition(&self) {
		self.acquisitions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
