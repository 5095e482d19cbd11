//! Type promotion and coercion rules

use super::{DType, DTypeSet};

/// Promote two dtypes to a common dtype for binary operations
///
/// - Complex wins over floats, floats over integers
/// - Larger types win over smaller types
/// - Signed wins over unsigned when mixing, widening if needed
/// - Bool loses to everything
pub fn promote(lhs: DType, rhs: DType) -> DType {
    use DType::*;

    if lhs == rhs {
        return lhs;
    }

    // Mixing signed and unsigned integers: promote to a signed type wide
    // enough for both, saturating at I64
    if lhs.is_signed_int() && rhs.is_unsigned_int() {
        return match (lhs, rhs) {
            (I64, _) => I64,
            (I32, U64 | U32) => I64,
            (I32, _) => I32,
            (I16, U64 | U32) => I64,
            (I16, U16) => I32,
            (I16, _) => I16,
            (I8, U64 | U32) => I64,
            (I8, U16) => I32,
            (I8, _) => I16,
            _ => I64,
        };
    }
    if rhs.is_signed_int() && lhs.is_unsigned_int() {
        return promote(rhs, lhs);
    }

    // Complex64 cannot hold F64 exactly
    if matches!((lhs, rhs), (Complex64, F64) | (F64, Complex64)) {
        return Complex128;
    }

    if lhs.rank() >= rhs.rank() {
        lhs
    } else {
        rhs
    }
}

/// Check if a dtype can be safely cast to another without data loss
pub fn can_cast_safely(from: DType, to: DType) -> bool {
    use DType::*;

    if from == to {
        return true;
    }

    match (from, to) {
        // Bool to anything numeric
        (Bool, _) => true,

        // Integer widening
        (I8, I16 | I32 | I64) => true,
        (I16, I32 | I64) => true,
        (I32, I64) => true,
        (U8, U16 | U32 | U64 | I16 | I32 | I64) => true,
        (U16, U32 | U64 | I32 | I64) => true,
        (U32, U64 | I64) => true,

        // Integers to floats (may lose precision for very large values)
        (I8 | U8 | I16 | U16, F32 | F64) => true,
        (I32 | U32 | I64 | U64, F64) => true,

        // Floats
        (F32, F64) => true,

        // Anything real to complex (imaginary part = 0)
        (I8 | U8 | I16 | U16 | F32, Complex64 | Complex128) => true,
        (I32 | U32 | I64 | U64 | F64, Complex128) => true,
        (Complex64, Complex128) => true,

        _ => false,
    }
}

/// Find the smallest declared dtype that `requested` can be coerced to
///
/// Walks the coercion order upwards from `requested` and returns the first
/// declared dtype that `requested` casts to safely. Returns `None` when no
/// declared dtype dominates the request.
pub fn coercion_target(requested: DType, declared: DTypeSet) -> Option<DType> {
    if declared.contains(requested) {
        return Some(requested);
    }
    declared
        .iter()
        .filter(|dt| dt.rank() > requested.rank())
        .find(|dt| can_cast_safely(requested, *dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use DType::*;

    #[test]
    fn test_same_type_promotion() {
        assert_eq!(promote(F32, F32), F32);
        assert_eq!(promote(I64, I64), I64);
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(promote(F32, F64), F64);
        assert_eq!(promote(I64, F32), F32);
        assert_eq!(promote(I32, F64), F64);
    }

    #[test]
    fn test_signed_unsigned_promotion() {
        assert_eq!(promote(I32, U32), I64);
        assert_eq!(promote(I16, U16), I32);
        assert_eq!(promote(I8, U8), I16);
        assert_eq!(promote(U8, I8), I16);
    }

    #[test]
    fn test_bool_loses() {
        assert_eq!(promote(Bool, I8), I8);
        assert_eq!(promote(U64, Bool), U64);
    }

    #[test]
    fn test_complex_promotion() {
        assert_eq!(promote(Complex64, F64), Complex128);
        assert_eq!(promote(Complex64, F32), Complex64);
    }

    #[test]
    fn test_coercion_prefers_smallest_dominating() {
        let declared: DTypeSet = [I32, I64, F64].into_iter().collect();
        assert_eq!(coercion_target(I8, declared), Some(I32));
        assert_eq!(coercion_target(U32, declared), Some(I64));
        assert_eq!(coercion_target(F32, declared), Some(F64));
        assert_eq!(coercion_target(I64, declared), Some(I64));
        assert_eq!(coercion_target(Complex64, declared), None);
    }

    #[test]
    fn test_coercion_never_narrows() {
        let declared: DTypeSet = [I8, F32].into_iter().collect();
        assert_eq!(coercion_target(I64, declared), None);
        assert_eq!(coercion_target(F64, declared), None);
        assert_eq!(coercion_target(U8, declared), Some(F32));
    }

    #[test]
    fn test_safe_casts() {
        assert!(can_cast_safely(Bool, F32));
        assert!(can_cast_safely(U8, I16));
        assert!(!can_cast_safely(I16, U16));
        assert!(!can_cast_safely(F64, F32));
        assert!(!can_cast_safely(F64, Complex64));
    }
}
