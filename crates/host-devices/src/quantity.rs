//! Kubernetes resource quantities.
//!
//! Accepts the textual notation of `resource.Quantity`
//! (`<sign><digits>.<digits><suffix>` with decimal SI, binary SI or `e<n>`
//! suffixes) and evaluates it to an exact non-negative integer. Values that
//! are fractional after applying the suffix (`500m`, `1.5`) are rejected
//! instead of rounded: a device count is either whole or a mistake.

use thiserror::Error;

/// Why a quantity string is not a usable device count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// Empty string
    #[error("quantity is empty")]
    Empty,

    /// Not in Kubernetes quantity notation
    #[error("quantity is not in Kubernetes quantity notation")]
    Malformed,

    /// Below zero
    #[error("quantity must not be negative")]
    Negative,

    /// Not a whole number after applying the suffix
    #[error("quantity must be a whole number")]
    Fractional,

    /// Larger than u64
    #[error("quantity is too large")]
    Overflow,
}

/// Evaluate a Kubernetes quantity to a whole, non-negative count.
///
/// ```
/// use host_devices::parse_quantity;
///
/// assert_eq!(parse_quantity("4"), Ok(4));
/// assert_eq!(parse_quantity("2k"), Ok(2000));
/// assert_eq!(parse_quantity("1Ki"), Ok(1024));
/// assert!(parse_quantity("500m").is_err());
/// ```
pub fn parse_quantity(input: &str) -> Result<u64, QuantityError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QuantityError::Empty);
    }

    let (negative, unsigned) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    let (integer, fraction) = match number.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (number, ""),
    };
    if fraction.contains('.') || (integer.is_empty() && fraction.is_empty()) {
        return Err(QuantityError::Malformed);
    }

    let (base, exponent) = parse_suffix(suffix)?;

    let fraction = fraction.trim_end_matches('0');
    let digits = format!("{}{}", integer.trim_start_matches('0'), fraction);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    if negative {
        return Err(QuantityError::Negative);
    }

    let mantissa: u128 = digits.parse().map_err(|_| QuantityError::Overflow)?;
    let scale = i64::try_from(fraction.len()).map_err(|_| QuantityError::Fractional)?;

    let value = match base {
        Base::Binary => {
            let numerator = mantissa
                .checked_mul(1u128 << exponent)
                .ok_or(QuantityError::Overflow)?;
            divide_exact(numerator, scale)?
        }
        Base::Decimal => {
            let exponent = i64::from(exponent) - scale;
            if exponent >= 0 {
                let factor = pow10(exponent).ok_or(QuantityError::Overflow)?;
                mantissa.checked_mul(factor).ok_or(QuantityError::Overflow)?
            } else {
                divide_exact(mantissa, -exponent)?
            }
        }
    };

    u64::try_from(value).map_err(|_| QuantityError::Overflow)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Base {
    Binary,
    Decimal,
}

fn parse_suffix(suffix: &str) -> Result<(Base, i32), QuantityError> {
    let parsed = match suffix {
        "" => (Base::Decimal, 0),
        "m" => (Base::Decimal, -3),
        "k" => (Base::Decimal, 3),
        "M" => (Base::Decimal, 6),
        "G" => (Base::Decimal, 9),
        "T" => (Base::Decimal, 12),
        "P" => (Base::Decimal, 15),
        "E" => (Base::Decimal, 18),
        "Ki" => (Base::Binary, 10),
        "Mi" => (Base::Binary, 20),
        "Gi" => (Base::Binary, 30),
        "Ti" => (Base::Binary, 40),
        "Pi" => (Base::Binary, 50),
        "Ei" => (Base::Binary, 60),
        _ => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))
                .ok_or(QuantityError::Malformed)?;
            if exponent.is_empty() {
                return Err(QuantityError::Malformed);
            }
            let exponent = exponent
                .parse::<i32>()
                .map_err(|_| QuantityError::Malformed)?;
            (Base::Decimal, exponent)
        }
    };
    Ok(parsed)
}

fn pow10(exponent: i64) -> Option<u128> {
    10u128.checked_pow(u32::try_from(exponent).ok()?)
}

/// `value / 10^scale`, only if the division leaves no remainder.
fn divide_exact(value: u128, scale: i64) -> Result<u128, QuantityError> {
    // value is non-zero here, so a divisor wider than u128 cannot divide it
    let divisor = pow10(scale).ok_or(QuantityError::Fractional)?;
    if value % divisor == 0 {
        Ok(value / divisor)
    } else {
        Err(QuantityError::Fractional)
    }
}
