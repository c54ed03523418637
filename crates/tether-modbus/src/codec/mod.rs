// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Register-level value codec.
//!
//! Converts wire-level register and coil arrays into typed application
//! values, following the big-endian word order conventional for Modbus
//! multi-register types (high word first).
//!
//! Decoding is total: a short response, an unknown data type or an odd
//! length degrades to the raw value with a log line, never an error or a
//! panic. One misconfigured point must not take down a collection sweep
//! that reads fifty others.

mod formula;

pub use formula::{apply_formula, reverse_formula};

use tracing::{debug, warn};

use tether_core::{DataKind, Value};

use crate::types::RawValues;

// =============================================================================
// Decoding
// =============================================================================

/// Decodes raw transport values into a typed [`Value`].
///
/// `length` is the point's configured register count, which drives the
/// combining strategy:
///
/// - `1`: single-unit decode (sign interpretation, masking, or bool).
/// - `2`: two registers combined big-endian into 32 bits.
/// - `4`: four registers combined big-endian into 64 bits.
/// - anything else: per-register decode for 16-bit kinds, raw otherwise.
///
/// Unknown data-type names pass the raw value through with a warning.
pub fn decode(raw: &RawValues, data_type: &str, length: u16) -> Value {
    match raw {
        RawValues::Bits(bits) => decode_bits(bits, data_type, length),
        RawValues::Registers(regs) => decode_registers(regs, data_type, length),
    }
}

/// Coil and discrete-input responses.
///
/// Bit points are almost always typed `bool`; a numeric data type on a bit
/// point treats each bit as a 0/1 register and reuses the register rules.
fn decode_bits(bits: &[bool], data_type: &str, length: u16) -> Value {
    let kind = DataKind::parse(data_type);
    match kind {
        Some(DataKind::Bool) | None => {
            if kind.is_none() {
                warn!(data_type, "unknown data type on bit point, returning raw bits");
            }
            match bits {
                [] => {
                    warn!(data_type, "empty response for bit decode");
                    Value::Array(Vec::new())
                }
                [first, ..] if length == 1 => Value::Bool(*first),
                _ => Value::Array(bits.iter().map(|&b| Value::Bool(b)).collect()),
            }
        }
        Some(_) => {
            let regs: Vec<u16> = bits.iter().map(|&b| u16::from(b)).collect();
            decode_registers(&regs, data_type, length)
        }
    }
}

fn decode_registers(regs: &[u16], data_type: &str, length: u16) -> Value {
    let kind = DataKind::parse(data_type);
    match length {
        1 => decode_single(regs, data_type, kind),
        2 => decode_pair(regs, data_type, kind),
        4 => decode_quad(regs, data_type, kind),
        _ => decode_batch(regs, kind),
    }
}

fn decode_single(regs: &[u16], data_type: &str, kind: Option<DataKind>) -> Value {
    let Some(&raw) = regs.first() else {
        warn!(data_type, "empty response for single-register decode");
        return Value::Array(Vec::new());
    };
    let wide = i64::from(raw);
    match kind {
        Some(DataKind::Bool) => Value::Bool(raw != 0),
        Some(DataKind::Int8) => Value::Int(if wide >= 128 { wide - 256 } else { wide }),
        Some(DataKind::Int16) => Value::Int(i64::from(raw as i16)),
        Some(DataKind::Int32) => Value::Int(wide),
        Some(DataKind::UInt8) => Value::UInt(u64::from(raw & 0xFF)),
        Some(DataKind::UInt16) | Some(DataKind::UInt32) => Value::UInt(u64::from(raw)),
        // A lone register holds no IEEE-754 bit pattern; the numeric value
        // is widened, not reinterpreted.
        Some(DataKind::Float32) | Some(DataKind::Float64) => Value::Float(f64::from(raw)),
        None => {
            warn!(data_type, raw, "unknown data type, returning raw register");
            Value::UInt(u64::from(raw))
        }
    }
}

fn decode_pair(regs: &[u16], data_type: &str, kind: Option<DataKind>) -> Value {
    let (Some(&hi), Some(&lo)) = (regs.first(), regs.get(1)) else {
        warn!(
            data_type,
            got = regs.len(),
            "short response for two-register decode"
        );
        return short_response_fallback(regs);
    };
    let combined = (u32::from(hi) << 16) | u32::from(lo);
    match kind {
        Some(DataKind::Int32) => Value::Int(i64::from(combined as i32)),
        Some(DataKind::UInt32) => Value::UInt(u64::from(combined)),
        Some(DataKind::Float32) => Value::Float(f64::from(f32::from_bits(combined))),
        _ => {
            debug!(data_type, "combining two registers as unsigned 32-bit");
            Value::UInt(u64::from(combined))
        }
    }
}

fn decode_quad(regs: &[u16], data_type: &str, kind: Option<DataKind>) -> Value {
    if regs.len() < 4 {
        warn!(
            data_type,
            got = regs.len(),
            "short response for four-register decode"
        );
        return short_response_fallback(regs);
    }
    match kind {
        Some(DataKind::Float64) => {
            let bits = (u64::from(regs[0]) << 48)
                | (u64::from(regs[1]) << 32)
                | (u64::from(regs[2]) << 16)
                | u64::from(regs[3]);
            Value::Float(f64::from_bits(bits))
        }
        _ => raw_register_array(regs),
    }
}

/// Batch reads of a register count outside the combined shapes.
///
/// Only the 16-bit kinds get a per-register interpretation; everything
/// else is handed back as the raw sequence.
fn decode_batch(regs: &[u16], kind: Option<DataKind>) -> Value {
    match kind {
        Some(DataKind::Int16) => {
            Value::Array(regs.iter().map(|&r| Value::Int(i64::from(r as i16))).collect())
        }
        // uint16 masking is a no-op on u16 input, so the unsigned view and
        // the raw sequence coincide.
        _ => raw_register_array(regs),
    }
}

fn raw_register_array(regs: &[u16]) -> Value {
    Value::Array(regs.iter().map(|&r| Value::UInt(u64::from(r))).collect())
}

/// First register, or zero when the response carried nothing at all.
fn short_response_fallback(regs: &[u16]) -> Value {
    match regs.first() {
        Some(&reg) => Value::UInt(u64::from(reg)),
        None => Value::UInt(0),
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Packs an IEEE-754 single into two registers, high word first.
///
/// Inverse of the two-register `float32` decode. Production writes go
/// through the single-register cast path; this exists for fixtures that
/// seed register banks with known float patterns.
pub fn encode_f32(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, (bits & 0xFFFF) as u16]
}

/// Packs an IEEE-754 double into four registers, high word first.
pub fn encode_f64(value: f64) -> [u16; 4] {
    let bits = value.to_bits();
    [
        (bits >> 48) as u16,
        ((bits >> 32) & 0xFFFF) as u16,
        ((bits >> 16) & 0xFFFF) as u16,
        (bits & 0xFFFF) as u16,
    ]
}

/// Packs a 32-bit integer into two registers, high word first.
pub fn encode_u32(value: u32) -> [u16; 2] {
    [(value >> 16) as u16, (value & 0xFFFF) as u16]
}

// =============================================================================
// Range validation
// =============================================================================

/// Outcome of a bounds check.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCheck {
    /// Whether the value sits inside the configured bounds.
    pub valid: bool,
    /// Human-readable description of the violated bound, if any.
    pub message: Option<String>,
}

impl RangeCheck {
    fn ok() -> Self {
        RangeCheck {
            valid: true,
            message: None,
        }
    }

    fn violated(message: String) -> Self {
        RangeCheck {
            valid: false,
            message: Some(message),
        }
    }
}

/// Checks a value against the point's optional min/max bounds.
///
/// The check only applies when both bounds are configured and the value is
/// numeric; in every other case the value passes. An out-of-range value
/// produces a message naming the bound it violated.
pub fn validate_range(value: &Value, min: Option<f64>, max: Option<f64>) -> RangeCheck {
    let (Some(min), Some(max)) = (min, max) else {
        return RangeCheck::ok();
    };
    let Some(v) = value.as_f64() else {
        return RangeCheck::ok();
    };
    if v < min {
        RangeCheck::violated(format!("value {value} is below the minimum {min}"))
    } else if v > max {
        RangeCheck::violated(format!("value {value} exceeds the maximum {max}"))
    } else {
        RangeCheck::ok()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn regs(values: &[u16]) -> RawValues {
        RawValues::Registers(values.to_vec())
    }

    #[test]
    fn test_decode_single_signed() {
        assert_eq!(decode(&regs(&[5]), "int16", 1), Value::Int(5));
        assert_eq!(decode(&regs(&[65535]), "int16", 1), Value::Int(-1));
        assert_eq!(decode(&regs(&[32768]), "int16", 1), Value::Int(-32768));
        assert_eq!(decode(&regs(&[200]), "int8", 1), Value::Int(-56));
        assert_eq!(decode(&regs(&[127]), "int8", 1), Value::Int(127));
    }

    #[test]
    fn test_decode_single_unsigned_masks() {
        assert_eq!(decode(&regs(&[0x1FF]), "uint8", 1), Value::UInt(0xFF));
        assert_eq!(decode(&regs(&[65535]), "uint16", 1), Value::UInt(65535));
        assert_eq!(decode(&regs(&[42]), "dword", 1), Value::UInt(42));
    }

    #[test]
    fn test_decode_single_float_is_a_cast() {
        // One register cannot carry an IEEE bit pattern, so 25 decodes as
        // 25.0 rather than a reinterpretation of the bits.
        assert_eq!(decode(&regs(&[25]), "float32", 1), Value::Float(25.0));
        assert_eq!(decode(&regs(&[25]), "double", 1), Value::Float(25.0));
    }

    #[test]
    fn test_decode_single_int32_passthrough() {
        assert_eq!(decode(&regs(&[40000]), "int32", 1), Value::Int(40000));
        assert_eq!(decode(&regs(&[40000]), "long", 1), Value::Int(40000));
    }

    #[test]
    fn test_decode_single_unknown_type() {
        assert_eq!(decode(&regs(&[77]), "string", 1), Value::UInt(77));
    }

    #[test]
    fn test_decode_pair_signed() {
        // 0xFFFF_FFFE == -2 as int32.
        assert_eq!(
            decode(&regs(&[0xFFFF, 0xFFFE]), "int32", 2),
            Value::Int(-2)
        );
        assert_eq!(
            decode(&regs(&[0x0001, 0x0000]), "int32", 2),
            Value::Int(65536)
        );
        assert_eq!(
            decode(&regs(&[0xFFFF, 0xFFFE]), "uint32", 2),
            Value::UInt(0xFFFF_FFFE)
        );
    }

    #[test]
    fn test_decode_pair_float_reinterprets_bits() {
        let words = encode_f32(12.5);
        assert_eq!(decode(&regs(&words), "float32", 2), Value::Float(12.5));
        let words = encode_f32(-0.1);
        match decode(&regs(&words), "real", 2) {
            Value::Float(v) => assert!((v - (-0.1f32 as f64)).abs() < 1e-9),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_pair_other_combines_unsigned() {
        assert_eq!(
            decode(&regs(&[0x0001, 0x0002]), "int16", 2),
            Value::UInt(0x0001_0002)
        );
    }

    #[test]
    fn test_decode_pair_short_response() {
        assert_eq!(decode(&regs(&[9]), "int32", 2), Value::UInt(9));
        assert_eq!(decode(&regs(&[]), "int32", 2), Value::UInt(0));
    }

    #[test]
    fn test_decode_quad_double() {
        let words = encode_f64(3.14159);
        assert_eq!(
            decode(&regs(&words), "float64", 4),
            Value::Float(3.14159)
        );
    }

    #[test]
    fn test_decode_quad_other_returns_sequence() {
        assert_eq!(
            decode(&regs(&[1, 2, 3, 4]), "uint16", 4),
            Value::Array(vec![
                Value::UInt(1),
                Value::UInt(2),
                Value::UInt(3),
                Value::UInt(4)
            ])
        );
    }

    #[test]
    fn test_decode_batch_per_register() {
        assert_eq!(
            decode(&regs(&[1, 65535, 3]), "int16", 3),
            Value::Array(vec![Value::Int(1), Value::Int(-1), Value::Int(3)])
        );
        assert_eq!(
            decode(&regs(&[1, 2, 3]), "float32", 3),
            Value::Array(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)])
        );
    }

    #[test]
    fn test_decode_bits() {
        let bits = RawValues::Bits(vec![true]);
        assert_eq!(decode(&bits, "bool", 1), Value::Bool(true));

        let bits = RawValues::Bits(vec![true, false, true]);
        assert_eq!(
            decode(&bits, "boolean", 3),
            Value::Array(vec![
                Value::Bool(true),
                Value::Bool(false),
                Value::Bool(true)
            ])
        );

        // Numeric type on a bit point reads the bit as a 0/1 register.
        let bits = RawValues::Bits(vec![true]);
        assert_eq!(decode(&bits, "uint16", 1), Value::UInt(1));
    }

    #[test]
    fn test_decode_register_bool() {
        assert_eq!(decode(&regs(&[0]), "bool", 1), Value::Bool(false));
        assert_eq!(decode(&regs(&[7]), "bool", 1), Value::Bool(true));
    }

    #[test]
    fn test_float_round_trips() {
        for v in [0.0f32, 1.0, -1.5, 3.4e38, 1.2e-7] {
            let words = encode_f32(v);
            match decode(&regs(&words), "float32", 2) {
                Value::Float(got) => assert_eq!(got as f32, v),
                other => panic!("expected float, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validate_range() {
        let check = validate_range(&Value::Int(50), Some(0.0), Some(100.0));
        assert!(check.valid);
        assert!(check.message.is_none());

        let check = validate_range(&Value::Int(150), Some(0.0), Some(100.0));
        assert!(!check.valid);
        let message = check.message.as_deref().unwrap_or_default();
        assert!(message.contains("exceeds the maximum 100"));

        let check = validate_range(&Value::Float(-3.5), Some(0.0), Some(100.0));
        assert!(!check.valid);
        let message = check.message.as_deref().unwrap_or_default();
        assert!(message.contains("below the minimum 0"));
    }

    #[test]
    fn test_validate_range_skips_without_both_bounds() {
        assert!(validate_range(&Value::Int(500), Some(0.0), None).valid);
        assert!(validate_range(&Value::Int(500), None, Some(100.0)).valid);
        assert!(validate_range(&Value::Int(500), None, None).valid);
        // Non-numeric values are not range-checked.
        assert!(validate_range(&Value::Bool(true), Some(0.0), Some(1.0)).valid);
    }
}
