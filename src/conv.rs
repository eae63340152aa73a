//! Conversion utilities

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    backend::{Deltat, Timestamp},
    error::{Error, Result},
};

/// Convert a [`Timestamp`] to a [`DateTime<Utc>`]
pub(crate) fn ts_to_dt(ts: Timestamp) -> Result<Option<DateTime<Utc>>> {
    if ts == 0 {
        return Ok(None);
    }
    DateTime::from_timestamp((ts as u32).into(), 0)
        .map(Some)
        .ok_or(Error::TimestampConversion)
}

/// Convert a [`DateTime<Utc>`] to a [`Timestamp`]
pub(crate) fn dt_to_ts(dt: Option<DateTime<Utc>>) -> Result<Timestamp> {
    if let Some(dt) = dt {
        dt.timestamp().try_into().map_err(Error::DateTimeConversion)
    } else {
        Ok(0)
    }
}

/// Convert a [`Deltat`] to a [`Duration`]
pub(crate) fn delta_to_dur(delta: Deltat) -> Option<Duration> {
    if delta == 0 {
        return None;
    }
    Some(Duration::from_secs(delta.unsigned_abs().into()))
}

/// Convert a [`Duration`] to a [`Deltat`]
pub(crate) fn dur_to_delta(dur: Option<Duration>) -> Result<Deltat> {
    if let Some(dur) = dur {
        dur.as_secs().try_into().map_err(Error::DurationConversion)
    } else {
        Ok(0)
    }
}

/// Current time as a [`Timestamp`]
#[cfg(feature = "memory")]
pub(crate) fn now_ts() -> Timestamp {
    dt_to_ts(Some(Utc::now())).unwrap_or(Timestamp::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_means_unset() -> Result<()> {
        assert_eq!(ts_to_dt(0)?, None);
        assert_eq!(dt_to_ts(None)?, 0);
        assert_eq!(delta_to_dur(0), None);
        assert_eq!(dur_to_delta(None)?, 0);
        Ok(())
    }

    #[test]
    fn timestamp() -> Result<()> {
        let dt = ts_to_dt(1_700_000_000)?.unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt_to_ts(Some(dt))?, 1_700_000_000);
        Ok(())
    }

    #[test]
    fn duration_overflow() {
        let err = dur_to_delta(Some(Duration::from_secs(u64::MAX))).unwrap_err();
        assert!(matches!(err, Error::DurationConversion(_)));
    }

    #[test]
    fn datetime_overflow() {
        let far = DateTime::from_timestamp(i64::from(i32::MAX) + 1, 0);
        let err = dt_to_ts(far).unwrap_err();
        assert!(matches!(err, Error::DateTimeConversion(_)));
    }
}
