use crate::error::AmrError;
use crate::model::{MeasuredValue, SusceptibilityCall};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a result string from a susceptibility report into a MeasuredValue.
///
/// Handles formats like:
/// - "0.5" -> Mic(0.5)
/// - "<=0.25", "≤0.25", "< 0.25" -> AtMost(0.25)
/// - ">32" -> Above(32)
/// - "0,5" -> Mic(0.5) (decimal comma)
/// - "S", "I", "R" -> Reported(call)
/// - "", "-", "n.a." -> None (not tested)
pub fn parse_value(s: &str) -> Result<Option<MeasuredValue>, AmrError> {
    let s = s.trim();

    if s.is_empty() || s == "-" || s == "—" || s.eq_ignore_ascii_case("n.a.") || s == "N/A" {
        return Ok(None);
    }

    if let Some(call) = SusceptibilityCall::from_code(s) {
        return Ok(Some(MeasuredValue::Reported(call)));
    }

    // Off-scale low. "<x" is widened to "<=x".
    for prefix in ["<=", "≤", "<"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            return Ok(Some(MeasuredValue::AtMost(parse_decimal(rest)?)));
        }
    }

    if s.starts_with(">=") || s.starts_with('≥') {
        return Err(AmrError::ParseError(format!(
            "ambiguous off-scale value '{s}': use '>x' for results above the tested range"
        )));
    }

    if let Some(rest) = s.strip_prefix('>') {
        return Ok(Some(MeasuredValue::Above(parse_decimal(rest)?)));
    }

    Ok(Some(MeasuredValue::Mic(parse_decimal(s)?)))
}

/// Parse a non-negative decimal value, accepting a decimal comma.
fn parse_decimal(s: &str) -> Result<Decimal, AmrError> {
    let s = s.trim();
    let normalized = s.replace(',', ".");
    let value = Decimal::from_str(&normalized)
        .map_err(|e| AmrError::ParseError(format!("invalid number '{}': {}", s, e)))?;
    if value.is_sign_negative() {
        return Err(AmrError::ParseError(format!(
            "negative concentration '{}'",
            s
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_on_scale_mic() {
        let v = parse_value("0.5").unwrap().unwrap();
        assert_eq!(v, MeasuredValue::Mic(dec!(0.5)));
    }

    #[test]
    fn test_at_most() {
        assert_eq!(
            parse_value("<=0.25").unwrap().unwrap(),
            MeasuredValue::AtMost(dec!(0.25))
        );
        assert_eq!(
            parse_value("≤0.25").unwrap().unwrap(),
            MeasuredValue::AtMost(dec!(0.25))
        );
        assert_eq!(
            parse_value("< 0.25").unwrap().unwrap(),
            MeasuredValue::AtMost(dec!(0.25))
        );
    }

    #[test]
    fn test_above() {
        assert_eq!(
            parse_value(">32").unwrap().unwrap(),
            MeasuredValue::Above(dec!(32))
        );
    }

    #[test]
    fn test_greater_or_equal_rejected() {
        assert!(parse_value(">=32").is_err());
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(
            parse_value("0,125").unwrap().unwrap(),
            MeasuredValue::Mic(dec!(0.125))
        );
    }

    #[test]
    fn test_categorical() {
        assert_eq!(
            parse_value("r").unwrap().unwrap(),
            MeasuredValue::Reported(SusceptibilityCall::Resistant)
        );
        assert_eq!(
            parse_value("Intermediate").unwrap().unwrap(),
            MeasuredValue::Reported(SusceptibilityCall::Intermediate)
        );
    }

    #[test]
    fn test_not_tested_returns_none() {
        assert!(parse_value("").unwrap().is_none());
        assert!(parse_value("-").unwrap().is_none());
        assert!(parse_value("n.a.").unwrap().is_none());
    }

    #[test]
    fn test_negative_rejected() {
        assert!(parse_value("-2").is_err());
    }

    #[test]
    fn test_invalid_returns_error() {
        assert!(parse_value("abc").is_err());
    }
}
