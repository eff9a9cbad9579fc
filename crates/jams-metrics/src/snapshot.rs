//! Gauge snapshot shared by the tasks of one scrape.
//!
//! Every write takes the table lock for the duration of a single map update,
//! so concurrent writers never observe or leave a half-written table. Writes
//! to distinct labels never interfere; writes to the same scalar are
//! last-writer-wins unless [`GaugeSnapshot::add`] is used.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::gauges::{self, Gauge};

/// All samples recorded for one gauge.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeFamily {
    pub gauge: Gauge,
    /// Label value → sample. Scalar gauges use the `None` key.
    pub samples: BTreeMap<Option<String>, f64>,
}

/// Request-scoped gauge table.
#[derive(Debug, Default)]
pub struct GaugeSnapshot {
    families: Mutex<BTreeMap<&'static str, GaugeFamily>>,
}

impl Clone for GaugeSnapshot {
    fn clone(&self) -> Self {
        Self {
            families: Mutex::new(self.table().clone()),
        }
    }
}

impl GaugeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<&'static str, GaugeFamily>> {
        // A panicking writer cannot leave a sample half-written, so the data
        // is still consistent after poisoning.
        self.families.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, gauge: Gauge, label: Option<&str>, apply: impl FnOnce(&mut f64)) {
        if gauge.label.is_some() != label.is_some() {
            warn!(gauge = gauge.name, ?label, "label mismatch, sample dropped");
            return;
        }
        let mut table = self.table();
        let family = table.entry(gauge.name).or_insert_with(|| GaugeFamily {
            gauge,
            samples: BTreeMap::new(),
        });
        apply(family.samples.entry(label.map(str::to_string)).or_insert(0.0));
    }

    /// Overwrite a scalar gauge.
    pub fn set(&self, gauge: Gauge, value: f64) {
        self.update(gauge, None, |v| *v = value);
    }

    /// Overwrite the series of `gauge` labeled with `label_value`.
    pub fn set_labeled(&self, gauge: Gauge, label_value: &str, value: f64) {
        self.update(gauge, Some(label_value), |v| *v = value);
    }

    /// Atomically add `delta` to a scalar gauge (missing counts as zero).
    pub fn add(&self, gauge: Gauge, delta: f64) {
        self.update(gauge, None, |v| *v += delta);
    }

    /// Current value of one series.
    pub fn get(&self, gauge: Gauge, label_value: Option<&str>) -> Option<f64> {
        self.table()
            .get(gauge.name)
            .and_then(|f| f.samples.get(&label_value.map(str::to_string)).copied())
    }

    /// Owned copy of every family, in catalog order.
    pub fn families(&self) -> Vec<GaugeFamily> {
        in_exposition_order(self.table().values().cloned().collect())
    }

    pub fn into_families(self) -> Vec<GaugeFamily> {
        in_exposition_order(
            self.families
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .into_values()
                .collect(),
        )
    }

    /// Total number of series across all families.
    pub fn len(&self) -> usize {
        self.table().values().map(|f| f.samples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn in_exposition_order(mut families: Vec<GaugeFamily>) -> Vec<GaugeFamily> {
    families.sort_by_key(|f| (gauges::exposition_rank(&f.gauge), f.gauge.name));
    families
}
