//! Declared element precision for payloads and coordinates
//!
//! Values are always held as `f64`. The declared type records which
//! representation they must round-trip through, so precision escalation
//! during reduction is visible and can be undone.

use std::fmt;

/// Element type of a payload or coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DType {
    #[default]
    F32,
    F64,
    I32,
    I64,
}

/// Declared floating precision for every produced array
pub const FLOAT_DTYPE: DType = DType::F32;

impl DType {
    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Round a value through this representation
    #[inline]
    pub fn cast(self, value: f64) -> f64 {
        match self {
            DType::F32 => value as f32 as f64,
            DType::F64 => value,
            DType::I32 => value.trunc().clamp(i32::MIN as f64, i32::MAX as f64),
            DType::I64 => value.trunc(),
        }
    }

    /// The type a reduction promotes to
    pub fn escalated(self) -> DType {
        match self {
            DType::F32 | DType::F64 => DType::F64,
            other => other,
        }
    }

    /// Declared precision for this type: floats demote to [`FLOAT_DTYPE`]
    pub fn demoted(self) -> DType {
        if self.is_float() {
            FLOAT_DTYPE
        } else {
            self
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::I32 => "int32",
            DType::I64 => "int64",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_f32_rounds() {
        let v = 0.1_f64;
        assert_ne!(DType::F32.cast(v), v);
        assert_eq!(DType::F32.cast(v), 0.1_f32 as f64);
        assert_eq!(DType::F64.cast(v), v);
    }

    #[test]
    fn test_cast_integer_truncates() {
        assert_eq!(DType::I32.cast(2.9), 2.0);
        assert_eq!(DType::I64.cast(-2.9), -2.0);
    }

    #[test]
    fn test_demotion() {
        assert_eq!(DType::F64.demoted(), DType::F32);
        assert_eq!(DType::I64.demoted(), DType::I64);
        assert_eq!(DType::F32.escalated(), DType::F64);
    }
}
