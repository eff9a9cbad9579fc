//! jams-metrics — gauge storage and exposition for the JAMS exporter.
//!
//! One [`GaugeSnapshot`] is created per scrape, written concurrently by the
//! collection tasks, and rendered once all of them have finished.
//!
//! # Architecture
//!
//! ```text
//! gauges::*            ← static catalog (name, help, label)
//! GaugeSnapshot
//!   ├── set() / set_labeled() / add()  ← called from collection tasks
//!   └── families()                     → owned copy, catalog order
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod gauges;
pub mod prometheus;
pub mod snapshot;

pub use gauges::Gauge;
pub use prometheus::render_prometheus;
pub use snapshot::{GaugeFamily, GaugeSnapshot};
