//! Automatic container names

use super::Shape;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter shared by every container kind
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Next automatic name for a container of `shape` (`s_0`, `v_1`, `M_2`, ...)
///
/// Names are unique within a process lifetime.
pub(crate) fn next_name(shape: Shape) -> String {
    let prefix = match shape {
        Shape::Scalar => "s",
        Shape::Vector(_) => "v",
        Shape::Matrix(..) => "M",
    };
    format!("{prefix}_{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names() {
        let a = next_name(Shape::Vector(3));
        let b = next_name(Shape::Vector(3));
        assert_ne!(a, b);
        assert!(a.starts_with("v_"));
        assert!(next_name(Shape::Matrix(1, 1)).starts_with("M_"));
    }
}
