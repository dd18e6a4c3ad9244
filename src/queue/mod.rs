//! Tubes, the tube registry and the ready/lease bookkeeping behind them

/// Lease tracking for taken tasks
pub mod lease;
/// Priority ordering of ready tasks
pub mod ready;
/// Process-wide tube registry
pub mod registry;
/// Single tube: storage and take scheduling
pub mod tube;

use std::time::Duration;

/// Convert a take timeout given in seconds into a [`Duration`]
///
/// `None` means wait forever. Negative, NaN, infinite or out of range values
/// are rejected.
pub fn parse_timeout(secs: Option<f64>) -> crate::Result<Option<Duration>> {
    let Some(secs) = secs else {
        return Ok(None);
    };
    Duration::try_from_secs_f64(secs).map(Some).map_err(|e| {
        crate::TubeQueueError::InvalidArgument(format!(
            "timeout must be a non-negative number of seconds, got {secs}: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(None).unwrap(), None);
        assert_eq!(
            parse_timeout(Some(1.5)).unwrap(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(parse_timeout(Some(0.0)).unwrap(), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_timeout_rejects_bad_values() {
        assert!(parse_timeout(Some(-1.0)).is_err());
        assert!(parse_timeout(Some(f64::NAN)).is_err());
        assert!(parse_timeout(Some(f64::INFINITY)).is_err());
        assert!(parse_timeout(Some(1e20)).is_err());
    }
}
