//! Human-readable schedule summaries.
//!
//! Renders "Tuesdays 8-10am" style strings for app display. Canonical
//! day sets collapse to `Daily`, `Weekdays`, and `Weekends`; anything
//! else gets an abbreviated day list. Groups whose active days do not
//! share one hour set render as "Multiple schedules".

use std::collections::BTreeSet;

use sweepcast_models::{HourArrays, Weekday};

/// Three-letter day abbreviations, Monday first.
const DAY_ABBREV: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Renders the summary string for one group's hour arrays.
#[must_use]
pub fn render(hours: &HourArrays) -> String {
    let active: Vec<usize> = (0..7).filter(|&i| !hours[i].is_empty()).collect();
    let Some(&first) = active.first() else {
        return "No cleaning".to_string();
    };

    let shared = &hours[first];
    if active.iter().any(|&i| &hours[i] != shared) {
        return "Multiple schedules".to_string();
    }

    let start = shared.first().copied().unwrap_or(0);
    let end = shared.last().copied().unwrap_or(0) + 1;
    format!("{} {}", day_phrase(&active), window_phrase(start, end))
}

fn day_phrase(active: &[usize]) -> String {
    let set: BTreeSet<usize> = active.iter().copied().collect();
    let weekdays: BTreeSet<usize> = (0..5).collect();
    let weekend: BTreeSet<usize> = [5, 6].into_iter().collect();
    let all: BTreeSet<usize> = (0..7).collect();

    if set == all {
        "Daily".to_string()
    } else if set == weekdays {
        "Weekdays".to_string()
    } else if set == weekend {
        "Weekends".to_string()
    } else if let [single] = active {
        format!("{}s", Weekday::ALL[*single])
    } else {
        active
            .iter()
            .map(|&i| DAY_ABBREV[i])
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Renders an hour window in 12-hour form, sharing the meridiem suffix
/// when both ends agree: "8-10am", "11am-1pm".
fn window_phrase(start: u8, end: u8) -> String {
    let (start_display, start_meridiem) = twelve_hour(start);
    let (end_display, end_meridiem) = twelve_hour(end);
    if start_meridiem == end_meridiem {
        format!("{start_display}-{end_display}{end_meridiem}")
    } else {
        format!("{start_display}{start_meridiem}-{end_display}{end_meridiem}")
    }
}

const fn twelve_hour(hour: u8) -> (u8, &'static str) {
    let hour = hour % 24;
    let meridiem = if hour < 12 { "am" } else { "pm" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    (display, meridiem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrays(windows: &[(Weekday, u8, u8)]) -> HourArrays {
        let mut hours = HourArrays::default();
        for &(day, from, to) in windows {
            hours[day.index()].extend(from..to);
        }
        hours
    }

    #[test]
    fn single_day_window() {
        let hours = arrays(&[(Weekday::Tuesday, 8, 10)]);
        assert_eq!(render(&hours), "Tuesdays 8-10am");
    }

    #[test]
    fn weekday_set_collapses() {
        let windows: Vec<(Weekday, u8, u8)> = Weekday::ALL[..5]
            .iter()
            .map(|&d| (d, 6, 8))
            .collect();
        assert_eq!(render(&arrays(&windows)), "Weekdays 6-8am");
    }

    #[test]
    fn weekend_set_collapses() {
        let hours = arrays(&[(Weekday::Saturday, 12, 14), (Weekday::Sunday, 12, 14)]);
        assert_eq!(render(&hours), "Weekends 12-2pm");
    }

    #[test]
    fn full_week_is_daily() {
        let windows: Vec<(Weekday, u8, u8)> =
            Weekday::ALL.iter().map(|&d| (d, 0, 6)).collect();
        assert_eq!(render(&arrays(&windows)), "Daily 12-6am");
    }

    #[test]
    fn other_day_sets_abbreviate() {
        let hours = arrays(&[
            (Weekday::Monday, 8, 10),
            (Weekday::Wednesday, 8, 10),
            (Weekday::Friday, 8, 10),
        ]);
        assert_eq!(render(&hours), "Mon/Wed/Fri 8-10am");
    }

    #[test]
    fn meridiem_crossing_window() {
        let hours = arrays(&[(Weekday::Tuesday, 11, 13)]);
        assert_eq!(render(&hours), "Tuesdays 11am-1pm");
    }

    #[test]
    fn differing_day_windows_are_multiple_schedules() {
        let hours = arrays(&[(Weekday::Tuesday, 8, 10), (Weekday::Friday, 12, 14)]);
        assert_eq!(render(&hours), "Multiple schedules");
    }

    #[test]
    fn empty_arrays_mean_no_cleaning() {
        assert_eq!(render(&HourArrays::default()), "No cleaning");
    }
}
