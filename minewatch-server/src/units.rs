//! Display formatting and wall-clock helpers shared by the collectors.

use time::OffsetDateTime;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Two-decimal display string, the format every "display-ready" field uses.
///
/// A value sitting exactly halfway between two hundredths rounds away from
/// zero (`0.125` -> `"0.13"`). `format!` alone would round it to even.
pub fn fixed2(value: f64) -> String {
    match hundredths_tie(value) {
        Some(doubled) => {
            let hundredths = (doubled + 1) / 2;
            let sign = if value < 0.0 { "-" } else { "" };
            format!("{sign}{}.{:02}", hundredths / 100, hundredths % 100)
        }
        None => format!("{value:.2}"),
    }
}

/// `|value| * 200` when that product is exactly an odd integer.
///
/// Works on the exact binary value: `1.005` is stored slightly below the
/// tie and is not reported.
fn hundredths_tie(value: f64) -> Option<u128> {
    if !value.is_finite() || value == 0.0 {
        return None;
    }

    let bits = value.abs().to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exp) = if exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), exponent - 1075)
    };

    // |value| * 200 = mantissa * 25 * 2^(exp + 3)
    let scaled = u128::from(mantissa) * 25;
    let shift = exp + 3;
    let zeros = scaled.trailing_zeros() as i32;
    if shift > 0 || zeros != -shift {
        return None;
    }
    Some(scaled >> zeros)
}

/// Bytes to GiB, formatted with [`fixed2`].
pub fn format_gib(bytes: f64) -> String {
    fixed2(bytes / BYTES_PER_GIB)
}

pub fn epoch_millis() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or_default()
}

pub fn epoch_secs_f64() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}
