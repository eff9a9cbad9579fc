//! Prometheus text exposition format.
//!
//! Renders a gauge snapshot into the text format scraped by a Prometheus
//! server or compatible agent.

use std::fmt::Write;

use crate::snapshot::GaugeFamily;

/// Render gauge families into Prometheus text format.
///
/// Families without samples are skipped entirely.
pub fn render_prometheus(families: &[GaugeFamily]) -> String {
    let mut out = String::new();

    for family in families.iter().filter(|f| !f.samples.is_empty()) {
        let gauge = family.gauge;
        let _ = writeln!(out, "# HELP {} {}", gauge.name, escape_help(gauge.help));
        let _ = writeln!(out, "# TYPE {} gauge", gauge.name);

        for (label_value, value) in &family.samples {
            match (gauge.label, label_value) {
                (Some(key), Some(v)) => {
                    let _ = writeln!(
                        out,
                        "{}{{{}=\"{}\"}} {}",
                        gauge.name,
                        key,
                        escape_label(v),
                        format_value(*value)
                    );
                }
                _ => {
                    let _ = writeln!(out, "{} {}", gauge.name, format_value(*value));
                }
            }
        }
    }

    out
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}
