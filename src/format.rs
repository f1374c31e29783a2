use rust_decimal::{Decimal, RoundingStrategy};

/// Render a minor-unit count with `scale` implied decimal places.
///
/// The fraction is always padded to the full scale (`1000` fils renders as
/// `1.000`). With `grouping`, thousands separators are inserted into the
/// integer part.
pub fn format_minor_units(amount: i64, scale: u32, grouping: bool) -> String {
    let value = Decimal::new(amount, scale);
    let negative = value.is_sign_negative() && !value.is_zero();

    let mut s = pad_fraction_to_dp(&value.abs().to_string(), scale);
    if grouping {
        s = group_number_string(&s);
    }

    if negative {
        format!("-{s}")
    } else {
        s
    }
}

/// `part / total * 100`, rounded half away from zero to two decimal places.
///
/// Returns zero when `total` is not positive.
pub fn percentage_of(part: i64, total: i64) -> Decimal {
    if total <= 0 {
        return Decimal::ZERO;
    }
    let ratio = Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(total);
    round_percent(ratio)
}

pub fn round_percent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn group_int_digits(int_part: &str) -> String {
    // Insert commas every 3 digits, preserving any leading zeros.
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    out
}

fn pad_fraction_to_dp(s: &str, dp: u32) -> String {
    if dp == 0 {
        return s
            .split_once('.')
            .map(|(i, _)| i.to_string())
            .unwrap_or_else(|| s.to_string());
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    let mut out = String::with_capacity(int_part.len() + 1 + dp as usize);
    out.push_str(int_part);
    out.push('.');

    let mut written = 0usize;
    for ch in frac_part.chars().take(dp as usize) {
        out.push(ch);
        written += 1;
    }
    while written < dp as usize {
        out.push('0');
        written += 1;
    }

    out
}

fn group_number_string(s: &str) -> String {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    let grouped = group_int_digits(int_part);
    match frac_part {
        Some(f) if !f.is_empty() => format!("{grouped}.{f}"),
        _ => grouped,
    }
}
