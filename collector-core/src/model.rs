//! Wire format and in-memory aggregation for gauge/counter metrics.

// std
use std::{
	collections::HashMap,
	sync::RwLock,
};
// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::_prelude::*;

/// HTTP header carrying the HMAC signature of a request/response body.
pub const HASH_HEADER: &str = "HashSHA256";

/// Discriminates the two metric kinds the collector understands.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
	/// Last-write-wins floating point sample.
	Gauge,
	/// Monotonically accumulating signed integer.
	Counter,
}

/// Wire representation of a single metric report or query.
///
/// `delta` carries the counter payload, `value` the gauge payload; exactly one of the two is
/// populated depending on `kind`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MetricForm {
	/// Metric name.
	pub id: String,
	/// Metric kind.
	#[serde(rename = "type")]
	pub kind: Option<MetricKind>,
	/// Counter increment, present for [`MetricKind::Counter`].
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delta: Option<i64>,
	/// Gauge value, present for [`MetricKind::Gauge`].
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
}
impl MetricForm {
	/// Build a gauge report.
	pub fn gauge(id: impl Into<String>, value: f64) -> Self {
		Self { id: id.into(), kind: Some(MetricKind::Gauge), delta: None, value: Some(value) }
	}

	/// Build a counter report.
	pub fn counter(id: impl Into<String>, delta: i64) -> Self {
		Self { id: id.into(), kind: Some(MetricKind::Counter), delta: Some(delta), value: None }
	}

	/// Whether this form reports a gauge.
	pub fn is_gauge(&self) -> bool {
		self.kind == Some(MetricKind::Gauge)
	}

	/// Whether this form reports a counter.
	pub fn is_counter(&self) -> bool {
		self.kind == Some(MetricKind::Counter)
	}
}

/// Thread-safe gauge/counter aggregation table.
///
/// Counters accumulate (`AddCounterValue` semantics), gauges are last-write-wins. Both maps are
/// guarded by their own lock so a gauge write never blocks a counter read.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Table {
	#[serde(with = "map_lock")]
	counters: RwLock<HashMap<String, i64>>,
	#[serde(with = "map_lock")]
	gauges: RwLock<HashMap<String, f64>>,
}
impl Table {
	/// Construct an empty table.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Add `delta` to the named counter, creating it if absent. Returns the new value.
	pub fn add_counter(&self, name: &str, delta: i64) -> i64 {
		let mut counters = self.counters.write().expect("counters lock poisoned");
		let entry = counters.entry(name.to_owned()).or_insert(0);

		*entry += delta;
		*entry
	}

	/// Overwrite the named gauge.
	pub fn set_gauge(&self, name: &str, value: f64) {
		self.gauges.write().expect("gauges lock poisoned").insert(name.to_owned(), value);
	}

	/// Read a counter's current value.
	pub fn counter(&self, name: &str) -> Option<i64> {
		self.counters.read().expect("counters lock poisoned").get(name).copied()
	}

	/// Read a gauge's current value.
	pub fn gauge(&self, name: &str) -> Option<f64> {
		self.gauges.read().expect("gauges lock poisoned").get(name).copied()
	}

	/// Point-in-time copy of every counter.
	pub fn snapshot_counters(&self) -> HashMap<String, i64> {
		self.counters.read().expect("counters lock poisoned").clone()
	}

	/// Point-in-time copy of every gauge.
	pub fn snapshot_gauges(&self) -> HashMap<String, f64> {
		self.gauges.read().expect("gauges lock poisoned").clone()
	}

	/// Replace the whole table's contents, e.g. after a store restore.
	pub fn restore(&self, counters: HashMap<String, i64>, gauges: HashMap<String, f64>) {
		*self.counters.write().expect("counters lock poisoned") = counters;
		*self.gauges.write().expect("gauges lock poisoned") = gauges;
	}

	/// Serialize the current state as a batch of [`MetricForm`]s, used by the file backend.
	pub fn to_forms(&self) -> Vec<MetricForm> {
		let mut forms = Vec::with_capacity(self.counters.read().unwrap().len()
			+ self.gauges.read().unwrap().len());

		forms.extend(
			self.snapshot_gauges().into_iter().map(|(id, value)| MetricForm::gauge(id, value)),
		);
		forms.extend(
			self.snapshot_counters().into_iter().map(|(id, delta)| MetricForm::counter(id, delta)),
		);

		forms
	}
}

mod map_lock {
	// std
	use std::{collections::HashMap, hash::Hash, sync::RwLock};
	// crates.io
	use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

	pub fn serialize<S, K, V>(lock: &RwLock<HashMap<K, V>>, ser: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
		K: Serialize + Eq + Hash,
		V: Serialize,
	{
		lock.read().map_err(serde::ser::Error::custom)?.serialize(ser)
	}

	pub fn deserialize<'de, D, K, V>(de: D) -> Result<RwLock<HashMap<K, V>>, D::Error>
	where
		D: Deserializer<'de>,
		K: Deserialize<'de> + Eq + Hash,
		V: Deserialize<'de>,
	{
		HashMap::deserialize(de).map(RwLock::new).map_err(de::Error::custom)
	}
}
