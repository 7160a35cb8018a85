use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::AppError;

pub fn now_rfc3339_utc() -> Result<String, AppError> {
    format_rfc3339(OffsetDateTime::now_utc())
}

pub fn format_rfc3339(ts: OffsetDateTime) -> Result<String, AppError> {
    ts.format(&Rfc3339).map_err(|e| {
        AppError::new("TIME_FORMAT_FAILED", "Failed to format time").with_details(e.to_string())
    })
}

/// Returns true when `s` parses as an RFC3339 timestamp.
pub fn is_rfc3339(s: &str) -> bool {
    OffsetDateTime::parse(s, &Rfc3339).is_ok()
}
