//! Display helpers for task timestamps.

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Render a UTC timestamp in an IANA zone like "America/Chicago".
pub fn format_local(dt: DateTime<Utc>, tz: &str) -> Result<String> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;
    Ok(dt.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_in_chicago_time() {
        // Feb is CST (UTC-6)
        let utc = Utc.with_ymd_and_hms(2026, 2, 21, 5, 59, 0).unwrap();
        assert_eq!(format_local(utc, "America/Chicago").unwrap(), "2026-02-20 23:59 CST");
    }

    #[test]
    fn rejects_unknown_zone() {
        assert!(format_local(Utc::now(), "Mars/Olympus").is_err());
    }
}
