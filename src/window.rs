//! Resolution of request parameters into aligned query windows.

use crate::{duration, DwhExportError, Result};

const DEFAULT_INTERVAL_MILLIS: i64 = 60_000;
const DEFAULT_OFFSET_MILLIS: i64 = 60_000;
pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Raw window parameters as supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct WindowParams {
    pub interval: Option<String>,
    pub range: Option<String>,
    pub offset: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Half-open `[start, end)` window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_millis: i64,
    pub end_millis: i64,
    pub interval_millis: i64,
}

/// The window sent to the database: one extra interval before `start` so that
/// windowed functions have context for the first bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedTimeWindow {
    pub start_millis: i64,
    pub end_millis: i64,
    pub interval_millis: i64,
}

impl TimeWindow {
    pub fn extended(&self) -> ExtendedTimeWindow {
        ExtendedTimeWindow {
            start_millis: self.start_millis - self.interval_millis,
            end_millis: self.end_millis,
            interval_millis: self.interval_millis,
        }
    }

    pub fn contains(&self, millis: i64) -> bool {
        millis >= self.start_millis && millis < self.end_millis
    }
}

impl ExtendedTimeWindow {
    pub fn start_nanos(&self) -> i64 {
        self.start_millis * NANOS_PER_MILLI
    }

    pub fn end_nanos(&self) -> i64 {
        self.end_millis * NANOS_PER_MILLI
    }
}

/// Resolves `params` against the wall clock `now_millis`.
pub fn resolve(params: &WindowParams, now_millis: i64) -> Result<TimeWindow> {
    let interval_millis = match &params.interval {
        Some(interval) => duration::parse_millis(interval)?,
        None => DEFAULT_INTERVAL_MILLIS,
    };
    if interval_millis <= 0 {
        return Err(DwhExportError::InvalidWindow(
            "The 'interval' must be greater than zero!".to_string(),
        ));
    }

    let window = if params.start.is_some() || params.end.is_some() {
        if params.range.is_some() || params.offset.is_some() {
            return Err(DwhExportError::ConflictingParameters);
        }
        resolve_explicit(params.start, params.end, interval_millis)?
    } else {
        resolve_range_offset(
            params.range.as_deref(),
            params.offset.as_deref(),
            interval_millis,
            now_millis,
        )?
    };

    check_representable(&window)?;
    Ok(window)
}

fn resolve_explicit(start: Option<i64>, end: Option<i64>, interval_millis: i64) -> Result<TimeWindow> {
    let (start_millis, end_millis) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(DwhExportError::InvalidWindow(
                "You must specify both 'start' and 'end'!".to_string(),
            ))
        }
    };

    if start_millis % interval_millis != 0 || end_millis % interval_millis != 0 {
        return Err(DwhExportError::MisalignedWindow);
    }
    if start_millis >= end_millis {
        return Err(DwhExportError::InvalidWindow(
            "The 'start' timestamp must be before 'end'!".to_string(),
        ));
    }

    Ok(TimeWindow {
        start_millis,
        end_millis,
        interval_millis,
    })
}

fn resolve_range_offset(
    range: Option<&str>,
    offset: Option<&str>,
    interval_millis: i64,
    now_millis: i64,
) -> Result<TimeWindow> {
    let range_millis = match range {
        Some(range) => duration::parse_millis(range)?,
        None => interval_millis,
    };
    if range_millis <= 0 {
        return Err(DwhExportError::InvalidWindow(
            "The 'range' must be greater than zero!".to_string(),
        ));
    }
    let offset_millis = match offset {
        Some(offset) => duration::parse_millis(offset)?,
        None => DEFAULT_OFFSET_MILLIS,
    };

    let end_millis = now_millis.saturating_sub(offset_millis).div_euclid(interval_millis) * interval_millis;

    Ok(TimeWindow {
        start_millis: end_millis.saturating_sub(range_millis),
        end_millis,
        interval_millis,
    })
}

// The extended start must still fit into i64 nanoseconds for the time filter.
fn check_representable(window: &TimeWindow) -> Result<()> {
    let extended_start = window.start_millis.checked_sub(window.interval_millis);
    let fits = |millis: Option<i64>| millis.and_then(|m| m.checked_mul(NANOS_PER_MILLI)).is_some();

    if fits(extended_start) && fits(Some(window.end_millis)) {
        Ok(())
    } else {
        Err(DwhExportError::InvalidWindow(
            "The requested time window is out of range!".to_string(),
        ))
    }
}
