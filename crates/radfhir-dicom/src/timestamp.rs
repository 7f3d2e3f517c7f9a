//! DICOM 日期/时间组合
//!
//! DICOM 的 DA/TM 值不带时区，时区由会话配置给出。
//! 命名时区按日期解析偏移，夏令时切换前后的检查得到不同的偏移。

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use radfhir_core::{RadFhirError, Result};
use std::str::FromStr;

/// 源数据所在时区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTimezone {
    /// IANA 命名时区，如 `Europe/Berlin`
    Named(Tz),
    /// 固定偏移，如 `+01:00`
    Fixed(FixedOffset),
}

impl SourceTimezone {
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// 本地时间对应的偏移；夏令时跳过的时刻没有偏移
    pub fn offset_at(&self, local: &NaiveDateTime) -> Option<FixedOffset> {
        self.localize(local).map(|dt| *dt.offset())
    }

    /// 组合日期与时间；任一缺失或格式错误时返回 None
    pub fn combine(&self, date: Option<&str>, time: Option<&str>) -> Option<DateTime<FixedOffset>> {
        let date = parse_da(date?)?;
        let time = parse_tm(time?)?;
        self.localize(&date.and_time(time))
    }

    /// 重复的本地时刻（夏令时结束）取较早的一个
    fn localize(&self, local: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Fixed(offset) => offset.from_local_datetime(local).earliest(),
            Self::Named(tz) => tz
                .from_local_datetime(local)
                .earliest()
                .map(|dt| dt.with_timezone(&dt.offset().fix())),
        }
    }
}

impl Default for SourceTimezone {
    fn default() -> Self {
        Self::utc()
    }
}

impl FromStr for SourceTimezone {
    type Err = RadFhirError;

    /// 支持 `UTC`、`Z`、`GMT`、IANA 时区名，以及 `+HH:MM`、`+HHMM`、`+HH` 形式的固定偏移
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if ["UTC", "Z", "GMT"].iter().any(|z| s.eq_ignore_ascii_case(z)) {
            return Ok(Self::utc());
        }

        let invalid = || RadFhirError::Config(format!("unsupported timezone: {}", s));

        let (sign, rest) = match s.chars().next() {
            Some('+') => (1, &s[1..]),
            Some('-') => (-1, &s[1..]),
            _ => return s.parse::<Tz>().map(Self::Named).map_err(|_| invalid()),
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let (hours, minutes) = match digits.len() {
            2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
            4 => (
                digits[0..2].parse::<i32>().map_err(|_| invalid())?,
                digits[2..4].parse::<i32>().map_err(|_| invalid())?,
            ),
            _ => return Err(invalid()),
        };
        if hours > 14 || minutes > 59 {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self::Fixed)
            .ok_or_else(invalid)
    }
}

/// 解析 DA (YYYYMMDD)
pub fn parse_da(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

/// 解析 TM (HH[MM[SS[.FFFFFF]]])，小数秒被忽略
pub fn parse_tm(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    let whole = value.split('.').next().unwrap_or(value);
    if !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let field = |range: std::ops::Range<usize>| whole.get(range).and_then(|v| v.parse::<u32>().ok());
    let (hour, minute, second) = match whole.len() {
        2 => (field(0..2)?, 0, 0),
        4 => (field(0..2)?, field(2..4)?, 0),
        6 => (field(0..2)?, field(2..4)?, field(4..6)?),
        _ => return None,
    };
    // 闰秒按 59 秒处理
    NaiveTime::from_hms_opt(hour, minute, second.min(59))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon(date: &str) -> NaiveDateTime {
        parse_da(date).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn offset_secs(tz: &str, date: &str) -> i32 {
        let tz: SourceTimezone = tz.parse().unwrap();
        tz.offset_at(&noon(date)).unwrap().local_minus_utc()
    }

    #[test]
    fn test_parse_fixed_offsets() {
        assert_eq!("UTC".parse::<SourceTimezone>().unwrap(), SourceTimezone::utc());
        assert_eq!("z".parse::<SourceTimezone>().unwrap(), SourceTimezone::utc());
        assert_eq!(offset_secs("+01:00", "20240715"), 3600);
        assert_eq!(offset_secs("-0500", "20240715"), -5 * 3600);
        assert_eq!(offset_secs("+05:30", "20240715"), 5 * 3600 + 1800);
        assert!("+02".parse::<SourceTimezone>().is_ok());
    }

    #[test]
    fn test_parse_named_zones() {
        assert_eq!(
            "Europe/Berlin".parse::<SourceTimezone>().unwrap(),
            SourceTimezone::Named(chrono_tz::Europe::Berlin)
        );
        assert!(matches!(
            "America/New_York".parse::<SourceTimezone>(),
            Ok(SourceTimezone::Named(_))
        ));
    }

    #[test]
    fn test_reject_unknown_timezones() {
        assert!("Mars/Olympus".parse::<SourceTimezone>().is_err());
        assert!("+25:00".parse::<SourceTimezone>().is_err());
        assert!("+1".parse::<SourceTimezone>().is_err());
        assert!("".parse::<SourceTimezone>().is_err());
    }

    #[test]
    fn test_named_zone_follows_daylight_saving() {
        let berlin: SourceTimezone = "Europe/Berlin".parse().unwrap();
        let summer = berlin.combine(Some("20240715"), Some("120000")).unwrap();
        assert_eq!(summer.to_rfc3339(), "2024-07-15T12:00:00+02:00");
        let winter = berlin.combine(Some("20240115"), Some("120000")).unwrap();
        assert_eq!(winter.to_rfc3339(), "2024-01-15T12:00:00+01:00");
    }

    #[test]
    fn test_named_zone_transition_edges() {
        let berlin: SourceTimezone = "Europe/Berlin".parse().unwrap();
        // 02:30 不存在于 2024-03-31
        assert!(berlin.combine(Some("20240331"), Some("023000")).is_none());
        // 02:30 在 2024-10-27 出现两次，取夏令时的一个
        let repeated = berlin.combine(Some("20241027"), Some("023000")).unwrap();
        assert_eq!(repeated.to_rfc3339(), "2024-10-27T02:30:00+02:00");
    }

    #[test]
    fn test_combine_date_and_time() {
        let tz: SourceTimezone = "+01:00".parse().unwrap();
        let started = tz.combine(Some("20240315"), Some("142530.123")).unwrap();
        assert_eq!(started.to_rfc3339(), "2024-03-15T14:25:30+01:00");
    }

    #[test]
    fn test_combine_short_time_forms() {
        let tz = SourceTimezone::utc();
        let started = tz.combine(Some("20240315"), Some("0930")).unwrap();
        assert_eq!(started.to_rfc3339(), "2024-03-15T09:30:00+00:00");
        let started = tz.combine(Some("20240315"), Some("07")).unwrap();
        assert_eq!(started.to_rfc3339(), "2024-03-15T07:00:00+00:00");
    }

    #[test]
    fn test_combine_requires_both_parts() {
        let tz = SourceTimezone::utc();
        assert!(tz.combine(Some("20240315"), None).is_none());
        assert!(tz.combine(None, Some("101010")).is_none());
    }

    #[test]
    fn test_combine_rejects_malformed_values() {
        let tz = SourceTimezone::utc();
        assert!(tz.combine(Some("20230229"), Some("101010")).is_none());
        assert!(tz.combine(Some("2024-03-15"), Some("101010")).is_none());
        assert!(tz.combine(Some("20240315"), Some("256000")).is_none());
        assert!(tz.combine(Some("20240315"), Some("10101")).is_none());
    }
}
