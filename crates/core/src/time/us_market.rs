use crate::config::env_or;
use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::America::New_York;

// Before the regular session opens the most-active list still describes the previous session.
const OPEN_CUTOFF_HOUR_ET: u32 = 9;
const OPEN_CUTOFF_MINUTE_ET: u32 = 30;

pub fn resolve_report_date(
    report_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = report_date_arg {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid report date {s:?}, expected YYYY-MM-DD"));
    }

    let now_et = now_utc.with_timezone(&New_York);
    let session_open =
        (now_et.hour(), now_et.minute()) >= (OPEN_CUTOFF_HOUR_ET, OPEN_CUTOFF_MINUTE_ET);
    let mut date = now_et.date_naive();
    if !session_open {
        date = date - Duration::days(1);
    }

    let extra = configured_holidays();
    while is_weekend(date) || is_market_holiday(date) || extra.contains(&date) {
        date = date - Duration::days(1);
    }

    Ok(date)
}

/// Full-day NYSE/NASDAQ closures, with weekend holidays shifted to the observed weekday.
pub fn is_market_holiday(date: NaiveDate) -> bool {
    nyse_holidays(date.year()).contains(&date)
}

fn nyse_holidays(year: i32) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(10);

    // A Saturday New Year's Day is not made up on the previous Friday.
    if let Some(d) = NaiveDate::from_ymd_opt(year, 1, 1) {
        match d.weekday() {
            Weekday::Sat => {}
            Weekday::Sun => out.push(d + Duration::days(1)),
            _ => out.push(d),
        }
    }

    let floating = [
        (1, Weekday::Mon, 3),  // Martin Luther King Jr. Day
        (2, Weekday::Mon, 3),  // Washington's Birthday
        (9, Weekday::Mon, 1),  // Labor Day
        (11, Weekday::Thu, 4), // Thanksgiving
    ];
    out.extend(
        floating
            .into_iter()
            .filter_map(|(m, wd, n)| NaiveDate::from_weekday_of_month_opt(year, m, wd, n)),
    );

    // Memorial Day: last Monday of May.
    if let Some(d) = NaiveDate::from_weekday_of_month_opt(year, 5, Weekday::Mon, 5)
        .or_else(|| NaiveDate::from_weekday_of_month_opt(year, 5, Weekday::Mon, 4))
    {
        out.push(d);
    }

    if let Some(easter) = easter_sunday(year) {
        out.push(easter - Duration::days(2));
    }

    let mut fixed = vec![(7, 4), (12, 25)];
    if year >= 2022 {
        fixed.push((6, 19));
    }
    out.extend(
        fixed
            .into_iter()
            .filter_map(|(m, d)| NaiveDate::from_ymd_opt(year, m, d))
            .map(observed),
    );

    out
}

fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// Gregorian Easter Sunday (anonymous computus).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Ad-hoc closures from `US_MARKET_HOLIDAYS="YYYY-MM-DD,..."`, e.g. national days of mourning.
fn configured_holidays() -> Vec<NaiveDate> {
    env_or("US_MARKET_HOLIDAYS", "")
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| NaiveDate::parse_from_str(part, "%Y-%m-%d").ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn explicit_date_wins() {
        let now = at(2026, 1, 3, 8, 0);
        assert_eq!(resolve_report_date(Some("2026-02-14"), now).unwrap(), ymd(2026, 2, 14));
        assert!(resolve_report_date(Some("14/02/2026"), now).is_err());
    }

    #[test]
    fn uses_same_day_after_open() {
        // 2026-01-06 15:00 UTC = 10:00 EST, a Tuesday.
        assert_eq!(resolve_report_date(None, at(2026, 1, 6, 15, 0)).unwrap(), ymd(2026, 1, 6));
    }

    #[test]
    fn rolls_back_before_open_and_over_weekend() {
        // 2026-01-05 13:00 UTC = 08:00 EST Monday; Sunday rolls back to Friday.
        assert_eq!(resolve_report_date(None, at(2026, 1, 5, 13, 0)).unwrap(), ymd(2026, 1, 2));
        // Saturday afternoon.
        assert_eq!(resolve_report_date(None, at(2026, 1, 3, 18, 0)).unwrap(), ymd(2026, 1, 2));
    }

    #[test]
    fn follows_daylight_time_transitions() {
        // 2026-03-09 13:45 UTC = 09:45 EDT (08:45 under EST).
        assert_eq!(resolve_report_date(None, at(2026, 3, 9, 13, 45)).unwrap(), ymd(2026, 3, 9));
        // 2026-11-02 14:00 UTC = 09:00 EST (10:00 under EDT).
        assert_eq!(resolve_report_date(None, at(2026, 11, 2, 14, 0)).unwrap(), ymd(2026, 10, 30));
    }

    #[test]
    fn skips_observed_independence_day() {
        // July 4 2026 is a Saturday, so the market closes Friday July 3.
        assert_eq!(resolve_report_date(None, at(2026, 7, 3, 18, 0)).unwrap(), ymd(2026, 7, 2));
    }

    #[test]
    fn skips_good_friday() {
        assert_eq!(resolve_report_date(None, at(2026, 4, 3, 18, 0)).unwrap(), ymd(2026, 4, 2));
    }

    #[test]
    fn pre_open_day_after_thanksgiving_skips_thanksgiving() {
        // 2026-11-27 13:00 UTC = 08:00 EST Friday; Thursday the 26th is Thanksgiving.
        assert_eq!(
            resolve_report_date(None, at(2026, 11, 27, 13, 0)).unwrap(),
            ymd(2026, 11, 25)
        );
    }

    #[test]
    fn skips_christmas() {
        assert_eq!(resolve_report_date(None, at(2026, 12, 25, 16, 0)).unwrap(), ymd(2026, 12, 24));
    }

    #[test]
    fn holiday_calendar_for_2026() {
        let mut days = nyse_holidays(2026);
        days.sort();
        assert_eq!(
            days,
            vec![
                ymd(2026, 1, 1),
                ymd(2026, 1, 19),
                ymd(2026, 2, 16),
                ymd(2026, 4, 3),
                ymd(2026, 5, 25),
                ymd(2026, 6, 19),
                ymd(2026, 7, 3),
                ymd(2026, 9, 7),
                ymd(2026, 11, 26),
                ymd(2026, 12, 25),
            ]
        );
    }

    #[test]
    fn saturday_new_year_is_not_made_up() {
        // 2022-01-01 was a Saturday; Friday 2021-12-31 traded.
        assert!(!is_market_holiday(ymd(2021, 12, 31)));
        assert!(!is_market_holiday(ymd(2022, 1, 1)));
        // 2023-01-01 was a Sunday, observed Monday.
        assert!(is_market_holiday(ymd(2023, 1, 2)));
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2024), Some(ymd(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(ymd(2025, 4, 20)));
        assert_eq!(easter_sunday(2026), Some(ymd(2026, 4, 5)));
    }
}
