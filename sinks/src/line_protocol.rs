//! InfluxDB line protocol encoding
//!
//! `measurement[,tag=value...] field=value[,field=value...] timestamp`

use tsload_core::{DataPoint, FieldValue};

/// Encode one point as a single line (no trailing newline)
///
/// Timestamps are written as-is; the sinks request nanosecond precision,
/// so the synthetic index lands at `index` ns after the epoch.
pub fn encode(point: &DataPoint) -> String {
    let mut line = String::with_capacity(64);
    escape_into(&mut line, point.measurement(), &[',', ' ']);

    for (key, value) in point.tags() {
        line.push(',');
        escape_into(&mut line, key, &[',', '=', ' ']);
        line.push('=');
        escape_into(&mut line, value, &[',', '=', ' ']);
    }

    let mut separator = ' ';
    for (key, value) in point.fields() {
        line.push(separator);
        separator = ',';
        escape_into(&mut line, key, &[',', '=', ' ']);
        line.push('=');
        encode_field(&mut line, value);
    }

    line.push(' ');
    line.push_str(&point.timestamp().to_string());
    line
}

/// Encode a batch as a newline separated request body
pub fn encode_batch<'a>(points: impl IntoIterator<Item = &'a DataPoint>) -> String {
    points
        .into_iter()
        .map(encode)
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_field(line: &mut String, value: &FieldValue) {
    match value {
        FieldValue::Integer(v) => {
            line.push_str(&v.to_string());
            line.push('i');
        }
        FieldValue::Float(v) => line.push_str(&v.to_string()),
        FieldValue::Bool(v) => line.push_str(if *v { "true" } else { "false" }),
        FieldValue::Text(v) => {
            line.push('"');
            escape_into(line, v, &['"', '\\']);
            line.push('"');
        }
    }
}

fn escape_into(line: &mut String, value: &str, special: &[char]) {
    for c in value.chars() {
        if special.contains(&c) {
            line.push('\\');
        }
        line.push(c);
    }
}
