use time::{Date, Duration, Month};

/// Month/day keys ("MM-DD") for every calendar day in the inclusive window
/// `[today, today + days]`. Comparing birthdays by these keys instead of a
/// date range keeps the query correct across the Dec -> Jan boundary.
///
/// Feb 29 rule: a window that covers Feb 28 of a non-leap year also gets
/// the "02-29" key, so leap-day birthdays are celebrated on the 28th in
/// off years.
pub fn birthday_window_keys(today: Date, days: i64) -> Vec<String> {
    let mut keys = Vec::with_capacity(days as usize + 2);
    for offset in 0..=days {
        let day = today + Duration::days(offset);
        keys.push(format!("{:02}-{:02}", day.month() as u8, day.day()));
        if day.month() == Month::February
            && day.day() == 28
            && !time::util::is_leap_year(day.year())
        {
            keys.push("02-29".to_string());
        }
    }
    keys
}

/// Escape LIKE metacharacters so user input matches as a literal substring.
pub fn escape_like(q: &str) -> String {
    q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn window_inside_one_month() {
        let keys = birthday_window_keys(date!(2024 - 06 - 10), 7);
        assert_eq!(keys.len(), 8);
        assert_eq!(keys.first().unwrap(), "06-10");
        assert_eq!(keys.last().unwrap(), "06-17");
    }

    #[test]
    fn window_wraps_year_boundary() {
        let keys = birthday_window_keys(date!(2024 - 12 - 28), 7);
        // Dec 30 must be in the window even though it belongs to the old
        // year while Jan dates belong to the next.
        assert!(keys.contains(&"12-30".to_string()));
        assert!(keys.contains(&"12-31".to_string()));
        assert!(keys.contains(&"01-01".to_string()));
        assert!(keys.contains(&"01-04".to_string()));
        assert!(!keys.contains(&"01-05".to_string()));
    }

    #[test]
    fn leap_day_matches_in_leap_year() {
        let keys = birthday_window_keys(date!(2024 - 02 - 25), 7);
        assert!(keys.contains(&"02-29".to_string()));
        assert!(keys.contains(&"03-03".to_string()));
    }

    #[test]
    fn leap_day_maps_to_feb_28_in_off_years() {
        let keys = birthday_window_keys(date!(2023 - 02 - 25), 7);
        assert!(keys.contains(&"02-28".to_string()));
        assert!(keys.contains(&"02-29".to_string()));
        assert!(keys.contains(&"03-04".to_string()));
    }

    #[test]
    fn window_of_ten_days_excludes_day_eleven() {
        let keys = birthday_window_keys(date!(2024 - 06 - 01), 7);
        assert!(!keys.contains(&"06-11".to_string()));
    }

    #[test]
    fn escape_like_makes_metacharacters_literal() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("smit"), "smit");
    }
}
