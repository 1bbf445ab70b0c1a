//! Rebalance scheduling.

use crate::error::{EngineError, Result};

/// Mark which positions of a length-`len` index trigger a re-optimization.
///
/// Flags are true at positions 0, N, 2N, ... for stride N, giving exactly
/// `ceil(len / stride)` rebalance dates. The stride counts index positions,
/// not calendar days.
pub fn rebalance_flags(len: usize, stride: usize) -> Result<Vec<bool>> {
    if stride == 0 {
        return Err(EngineError::ConfigError(
            "rebalance frequency must be at least 1".to_string(),
        ));
    }
    Ok((0..len).map(|i| i % stride == 0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_two() {
        let flags = rebalance_flags(4, 2).unwrap();
        assert_eq!(flags, vec![true, false, true, false]);
    }

    #[test]
    fn test_flag_count_is_ceil() {
        for (len, stride, expected) in [(10, 3, 4), (9, 3, 3), (1, 5, 1), (0, 5, 0)] {
            let flags = rebalance_flags(len, stride).unwrap();
            assert_eq!(flags.iter().filter(|&&f| f).count(), expected);
        }
    }

    #[test]
    fn test_first_position_always_flagged() {
        let flags = rebalance_flags(100, 21).unwrap();
        assert!(flags[0]);
        assert!(flags[21]);
        assert!(!flags[22]);
    }

    #[test]
    fn test_zero_stride_rejected() {
        assert!(rebalance_flags(10, 0).is_err());
    }
}
