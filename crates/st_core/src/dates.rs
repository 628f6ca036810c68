//! Publication date parsing and pt-BR display formatting.

use chrono::{DateTime, FixedOffset, Locale, NaiveDate, TimeZone, Utc};

use crate::{Error, Result};

pub const DISPLAY_LOCALE: Locale = Locale::pt_BR;

/// "19 mar 2021"
pub const LISTING_DATE_FORMAT: &str = "%d %b %Y";

/// "19 03 2021"
pub const ARTICLE_DATE_FORMAT: &str = "%d %m %Y";

/// Parses the timestamp shapes the CMS emits: RFC 3339, the `+0000` offset
/// form, or a bare calendar date taken as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt);
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| Error::InvalidDate(format!("{raw}: {e}")))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::InvalidDate(raw.to_string()))?;
    Ok(Utc.from_utc_datetime(&midnight).into())
}

pub fn format_listing_date(date: &DateTime<FixedOffset>) -> String {
    date.format_localized(LISTING_DATE_FORMAT, DISPLAY_LOCALE).to_string()
}

pub fn format_article_date(date: &DateTime<FixedOffset>) -> String {
    date.format_localized(ARTICLE_DATE_FORMAT, DISPLAY_LOCALE).to_string()
}
