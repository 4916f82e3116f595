//! Locale independent conversions between numbers and text.
//!
//! Parsing is lenient in the manner of stream extraction:
//! leading whitespace is skipped,
//! the longest numeric prefix is taken,
//! and a text without one reads as zero.

fn skip_sign(bytes: &[u8], mut pos: usize) -> usize {
    if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
        pos += 1;
    }
    pos
}

fn skip_digits(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    pos
}

/// Parse the leading integer of a text, saturating on overflow.
pub(crate) fn parse_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits_start = skip_sign(bytes, 0);
    let end = skip_digits(bytes, digits_start);
    if end == digits_start {
        return 0;
    }
    text[..end].parse().unwrap_or_else(|_| {
        if bytes[0] == b'-' {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

/// Parse the leading decimal number of a text,
/// with an optional fraction and exponent.
pub(crate) fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let int_start = skip_sign(bytes, 0);
    let mut end = skip_digits(bytes, int_start);
    let mut has_digits = end > int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_end = skip_digits(bytes, end + 1);
        has_digits |= frac_end > end + 1;
        end = frac_end;
    }
    if !has_digits {
        return 0.;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let exp_start = skip_sign(bytes, end + 1);
        let exp_end = skip_digits(bytes, exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }
    text[..end].parse().unwrap_or(0.)
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Format with the given number of significant digits,
/// switching to an exponent only for very small or very large magnitudes.
/// Trailing zeros of the fraction are dropped.
pub(crate) fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0. { "inf" } else { "-inf" }.to_string();
    }
    if value == 0. {
        return "0".to_string();
    }
    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < -4 || exponent >= precision as i32 {
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            if exponent < 0 { '-' } else { '+' },
            exponent.abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// Format with exactly six decimal places.
pub(crate) fn format_fixed(value: f64) -> String {
    format!("{:.6}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_integers() {
        assert_eq!(parse_integer("42"), 42);
        assert_eq!(parse_integer("  -17abc"), -17);
        assert_eq!(parse_integer("+01"), 1);
        assert_eq!(parse_integer("1.9"), 1);
        assert_eq!(parse_integer("abc"), 0);
        assert_eq!(parse_integer(""), 0);
        assert_eq!(parse_integer("-"), 0);
        assert_eq!(parse_integer("99999999999999999999"), i64::MAX);
    }

    #[test]
    fn lenient_floats() {
        assert_eq!(parse_float("1.5"), 1.5);
        assert_eq!(parse_float(" -2.5e2xyz"), -250.);
        assert_eq!(parse_float(".25"), 0.25);
        assert_eq!(parse_float("3."), 3.);
        assert_eq!(parse_float("7e"), 7.);
        assert_eq!(parse_float("e5"), 0.);
        assert_eq!(parse_float("."), 0.);
    }

    #[test]
    fn general_format() {
        assert_eq!(format_general(3.14159265, 6), "3.14159");
        assert_eq!(format_general(100., 6), "100");
        assert_eq!(format_general(0.0001, 6), "0.0001");
        assert_eq!(format_general(0.00001234, 6), "1.234e-05");
        assert_eq!(format_general(1234567., 6), "1.23457e+06");
        assert_eq!(format_general(-2.5, 6), "-2.5");
        assert_eq!(format_general(0., 6), "0");
    }

    #[test]
    fn fixed_format() {
        assert_eq!(format_fixed(1.5), "1.500000");
        assert_eq!(format_fixed(-3.), "-3.000000");
    }
}
