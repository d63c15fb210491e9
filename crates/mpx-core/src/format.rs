//! Human readable rendering of counters, sizes and durations.

use std::time::Duration;

/// Rendered in place of a zero rate or an absent value.
pub const PLACEHOLDER: &str = "-";

const DECIMAL_UNITS: [&str; 6] = ["", "k", "M", "G", "T", "P"];
const BINARY_UNITS: [&str; 8] = ["", "M", "G", "T", "P", "E", "Z", "Y"];

/// Splits a non-negative value along the divide-by-1000 ladder.
///
/// Returns `None` for zero (and anything that is not a positive finite number).
fn scale_decimal(value: f64) -> Option<(String, &'static str)> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    let mut tier = 0;
    let mut scaled = value;
    while scaled >= 1000.0 && tier + 1 < DECIMAL_UNITS.len() {
        scaled /= 1000.0;
        tier += 1;
    }
    // 999.6 would otherwise print as "1000" and 999_960 as "1000.0 k".
    let rounds_up = if tier == 0 {
        scaled.round() >= 1000.0
    } else {
        (scaled * 10.0).round() >= 10_000.0
    };
    if rounds_up && tier + 1 < DECIMAL_UNITS.len() {
        scaled /= 1000.0;
        tier += 1;
    }

    let digits = if tier == 0 {
        format!("{}", value.round() as u64)
    } else {
        format!("{scaled:.1}")
    };
    Some((digits, DECIMAL_UNITS[tier]))
}

/// `1_500_000` renders as `"1.5 Mbps"`, `999` as `"999 bps"`, zero as the placeholder.
pub fn human_throughput(bps: u64) -> String {
    match scale_decimal(bps as f64) {
        Some((digits, unit)) => format!("{digits} {unit}bps"),
        None => PLACEHOLDER.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeGroup {
    pub digits: String,
    /// Binary unit letter; empty for the KiB tier.
    pub unit: &'static str,
}

impl SizeGroup {
    fn new(digits: impl Into<String>, unit: &'static str) -> Self {
        Self {
            digits: digits.into(),
            unit,
        }
    }
}

/// Groups a byte count for display along the divide-by-1024 ladder.
///
/// The base tier is KiB and carries no unit letter. When the value at the
/// natural tier would show fewer than three digits and the next tier down
/// carries more information, the lower tier is used instead. Values that
/// round to four or more digits split into a head in the next unit up and a
/// zero padded three digit tail, so 1030 MiB renders as `1G` + `030M`.
pub fn group_file_size(bytes: u64) -> Vec<SizeGroup> {
    if bytes == 0 {
        return vec![SizeGroup::new("0", "")];
    }
    if bytes <= 1024 {
        return vec![SizeGroup::new("1", "")];
    }

    let mut tier = 0usize;
    while tier + 1 < BINARY_UNITS.len() && u128::from(bytes) >= 1024u128.pow(tier as u32 + 2) {
        tier += 1;
    }
    let mut value = bytes as f64 / 1024f64.powi(tier as i32 + 1);

    if tier > 0 && value < 100.0 {
        let lower = (value * 1024.0).round();
        if lower != value.round() * 1024.0 {
            tier -= 1;
            value *= 1024.0;
        }
    }

    let rounded = value.round() as u64;
    if rounded < 1000 {
        return vec![SizeGroup::new(rounded.to_string(), BINARY_UNITS[tier])];
    }

    let head_unit = BINARY_UNITS
        .get(tier + 1)
        .copied()
        .unwrap_or(BINARY_UNITS[BINARY_UNITS.len() - 1]);
    vec![
        SizeGroup::new((rounded / 1000).to_string(), head_unit),
        SizeGroup::new(format!("{:03}", rounded % 1000), BINARY_UNITS[tier]),
    ]
}

pub fn human_file_size(bytes: u64) -> String {
    group_file_size(bytes)
        .iter()
        .map(|group| format!("{}{}", group.digits, group.unit))
        .collect()
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Comma grouped integer, optionally with an explicit `+` on non-negative values.
pub fn number_with_commas(n: i64, always_with_sign: bool) -> String {
    let grouped = group_digits(&n.unsigned_abs().to_string());
    if n < 0 {
        format!("-{grouped}")
    } else if always_with_sign {
        format!("+{grouped}")
    } else {
        grouped
    }
}

pub fn human_quantity(n: u64) -> String {
    if n > 10_000 {
        let thousands = (n as f64 / 1000.0).round() as i64;
        format!("{}k", number_with_commas(thousands, false))
    } else if n > 1000 {
        format!("{:.1}k", n as f64 / 1000.0)
    } else {
        n.to_string()
    }
}

/// `"1,234 ms"`; `None` when there is no measurement.
pub fn duration_to_millis(duration: Option<Duration>) -> Option<String> {
    let duration = duration?;
    let millis = (duration.as_secs_f64() * 1000.0).round() as i64;
    Some(format!("{} ms", number_with_commas(millis, false)))
}

/// The two most significant non-zero parts of `d h m s`, e.g. `1d2h` or `5m3s`.
pub fn human_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let parts = [
        ("d", secs / 86_400),
        ("h", (secs % 86_400) / 3600),
        ("m", (secs % 3600) / 60),
        ("s", secs % 60),
    ];
    let rendered: String = parts
        .iter()
        .filter(|(_, amount)| *amount > 0)
        .take(2)
        .map(|(unit, amount)| format!("{amount}{unit}"))
        .collect();
    if rendered.is_empty() {
        "0s".to_string()
    } else {
        rendered
    }
}

/// Share of errored connections as a percentage with one decimal.
pub fn error_rate(conn_error: u32, conn_total: u32) -> String {
    if conn_total == 0 {
        return PLACEHOLDER.to_string();
    }
    format!(
        "{:.1}%",
        f64::from(conn_error) / f64::from(conn_total) * 100.0
    )
}
