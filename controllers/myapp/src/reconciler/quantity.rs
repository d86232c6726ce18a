//! Resource quantity comparison.
//!
//! The API server stores CPU and memory quantities in canonical form, so
//! `0.5` comes back as `500m` and `1024Mi` as `1Gi`. Quantities are compared
//! by value, in nano-units, so a spec written in another notation still
//! matches what is read back.

const NANO: i128 = 1_000_000_000;

/// Whether two quantity strings denote the same amount.
///
/// Strings that do not parse are compared verbatim.
pub fn same_quantity(a: &str, b: &str) -> bool {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Parse a quantity into nano-units; `None` when it is malformed or finer
/// than a nano-unit
pub fn parse(quantity: &str) -> Option<i128> {
    let quantity = quantity.trim();
    let split = quantity
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(quantity.len());
    let (number, suffix) = quantity.split_at(split);

    let multiplier = multiplier(suffix)?;
    let (negative, number) = match number.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, number.strip_prefix('+').unwrap_or(number)),
    };

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits: i128 = format!("{whole}{fraction}").parse().ok()?;
    let scale = 10_i128.checked_pow(u32::try_from(fraction.len()).ok()?)?;
    let scaled = digits.checked_mul(multiplier)?;
    if scaled % scale != 0 {
        return None;
    }

    let value = scaled / scale;
    Some(if negative { -value } else { value })
}

/// Nano-units per unit of `suffix`
fn multiplier(suffix: &str) -> Option<i128> {
    let binary = |power: u32| 1024_i128.checked_pow(power)?.checked_mul(NANO);
    let decimal = |exponent: i32| {
        let exponent = u32::try_from(exponent.checked_add(9)?).ok()?;
        10_i128.checked_pow(exponent)
    };

    match suffix {
        "Ki" => binary(1),
        "Mi" => binary(2),
        "Gi" => binary(3),
        "Ti" => binary(4),
        "Pi" => binary(5),
        "Ei" => binary(6),
        "n" => decimal(-9),
        "u" => decimal(-6),
        "m" => decimal(-3),
        "" => decimal(0),
        "k" => decimal(3),
        "M" => decimal(6),
        "G" => decimal(9),
        "T" => decimal(12),
        "P" => decimal(15),
        "E" => decimal(18),
        _ => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))?;
            decimal(exponent.parse().ok()?)
        }
    }
}
