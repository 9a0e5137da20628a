use chrono::{Datelike, NaiveDate, Weekday};

/// Dates that tend to break date arithmetic: leap days, year edges, and the US daylight
/// saving transitions. Returned sorted and restricted to `start..=end`.
pub fn edge_dates_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for year in start.year()..=end.year() {
        let candidates = [
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 2, 29),
            us_dst_start(year),
            us_dst_end(year),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ];
        dates.extend(candidates.into_iter().flatten().filter(|date| *date >= start && *date <= end));
    }
    dates.sort_unstable();
    dates
}

/// Second Sunday in March.
pub fn us_dst_start(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2)
}

/// First Sunday in November.
pub fn us_dst_end(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{edge_dates_between, us_dst_end, us_dst_start};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn dst_transitions_match_known_dates() {
        assert_eq!(us_dst_start(2024), Some(date(2024, 3, 10)));
        assert_eq!(us_dst_end(2024), Some(date(2024, 11, 3)));
        assert_eq!(us_dst_start(2025), Some(date(2025, 3, 9)));
        assert_eq!(us_dst_end(2025), Some(date(2025, 11, 2)));
    }

    #[test]
    fn edge_dates_stay_inside_window() {
        let dates = edge_dates_between(date(2023, 2, 3), date(2026, 2, 2));

        assert!(dates.contains(&date(2024, 2, 29)));
        assert!(dates.contains(&date(2025, 12, 31)));
        assert!(dates.contains(&date(2026, 1, 1)));
        assert!(!dates.contains(&date(2023, 1, 1)));
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
