//! Human-readable number formatting for player and visit counts.

use serde_json::Value;

const BILLION: f64 = 1_000_000_000.0;
const MILLION: f64 = 1_000_000.0;
const THOUSAND: f64 = 1_000.0;

/// Format a count with a magnitude suffix.
///
/// `B` and `K` carry two decimals, `M` carries one. Values below a thousand
/// are truncated to an integer. Non-finite input formats as `"0"`.
pub fn format_number(num: f64) -> String {
    if !num.is_finite() {
        return "0".to_string();
    }

    if num >= BILLION {
        format!("{:.2}B", num / BILLION)
    } else if num >= MILLION {
        format!("{:.1}M", num / MILLION)
    } else if num >= THOUSAND {
        format!("{:.2}K", num / THOUSAND)
    } else {
        format!("{}", num.trunc() as i64)
    }
}

/// Format an integer count.
pub fn format_count(num: u64) -> String {
    format_number(num as f64)
}

/// Format an arbitrary JSON value; anything that is not a number yields `"0"`.
pub fn format_value(value: &Value) -> String {
    value.as_f64().map(format_number).unwrap_or_else(|| "0".to_string())
}
