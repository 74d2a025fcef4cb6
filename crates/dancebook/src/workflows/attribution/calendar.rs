use chrono::{Datelike, Duration, NaiveDate, Weekday};

use super::domain::Slot;

/// Fixed-date holidays as (month, day) pairs.
const FIXED_HOLIDAYS: [(u32, u32); 8] = [
    (1, 1),
    (5, 1),
    (5, 8),
    (7, 14),
    (8, 15),
    (11, 1),
    (11, 11),
    (12, 25),
];

/// Movable holidays as day offsets from Easter Sunday: Easter Monday,
/// Ascension, Whit Monday.
const EASTER_OFFSETS: [i64; 3] = [1, 39, 50];

/// Gregorian computus validity bounds.
const MIN_YEAR: i32 = 1583;
const MAX_YEAR: i32 = 4099;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("no holiday calendar for year {0}: supported range is {MIN_YEAR}..={MAX_YEAR}")]
    UnsupportedYear(i32),
}

/// Easter Sunday for the given year, via the anonymous Gregorian computus.
pub fn easter_sunday(year: i32) -> Result<NaiveDate, CalendarError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(CalendarError::UnsupportedYear(year));
    }

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

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .ok_or(CalendarError::UnsupportedYear(year))
}

/// Whether a (date, slot) pair counts as a premium, high-demand slot.
///
/// The classification keys off a reference day: the day after the outing for
/// the late slots (those sessions are the eve of that day), the outing day
/// itself otherwise. The reference day is premium when it is a weekend day,
/// one of the fixed holidays, or an Easter-relative holiday. Only afternoon
/// and evening slots ever carry the resulting flag.
pub fn is_premium_day(date: NaiveDate, slot: Slot) -> Result<bool, CalendarError> {
    let reference = if slot.shifts_reference_day() {
        date + Duration::days(1)
    } else {
        date
    };

    if matches!(reference.weekday(), Weekday::Sat | Weekday::Sun) {
        return Ok(slot.premium_capable());
    }

    Ok(slot.premium_capable() && is_holiday(reference)?)
}

fn is_holiday(date: NaiveDate) -> Result<bool, CalendarError> {
    if FIXED_HOLIDAYS.contains(&(date.month(), date.day())) {
        return Ok(true);
    }

    let easter = easter_sunday(date.year())?;
    Ok(EASTER_OFFSETS
        .iter()
        .any(|offset| easter + Duration::days(*offset) == date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn computus_matches_known_easter_sundays() {
        // 2024 is a leap year.
        assert_eq!(easter_sunday(2024), Ok(date(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Ok(date(2025, 4, 20)));
        assert_eq!(easter_sunday(2026), Ok(date(2026, 4, 5)));
    }

    #[test]
    fn computus_rejects_out_of_range_years() {
        assert_eq!(easter_sunday(1582), Err(CalendarError::UnsupportedYear(1582)));
        assert_eq!(easter_sunday(4100), Err(CalendarError::UnsupportedYear(4100)));
    }

    #[test]
    fn weekends_are_premium_for_afternoon_slots() {
        // 2025-06-07 is a Saturday, 2025-06-08 a Sunday.
        assert_eq!(is_premium_day(date(2025, 6, 7), Slot::Afternoon), Ok(true));
        assert_eq!(is_premium_day(date(2025, 6, 8), Slot::Afternoon), Ok(true));
        // 2025-06-16 is a plain Monday.
        assert_eq!(is_premium_day(date(2025, 6, 16), Slot::Afternoon), Ok(false));
    }

    #[test]
    fn evening_slots_key_off_the_next_day() {
        // Friday evening is the eve of a Saturday.
        assert_eq!(is_premium_day(date(2025, 6, 6), Slot::Evening), Ok(true));
        // Saturday evening is the eve of a Sunday.
        assert_eq!(is_premium_day(date(2025, 6, 7), Slot::Evening), Ok(true));
        // Sunday evening is the eve of a plain Monday (June 9 is Whit Monday
        // that year, so take the following week).
        assert_eq!(is_premium_day(date(2025, 6, 15), Slot::Evening), Ok(false));
    }

    #[test]
    fn morning_and_after_slots_are_never_premium() {
        assert_eq!(is_premium_day(date(2025, 6, 7), Slot::Morning), Ok(false));
        // Friday after-midnight rolls onto a Saturday.
        assert_eq!(is_premium_day(date(2025, 6, 6), Slot::After), Ok(false));
    }

    #[test]
    fn fixed_holidays_are_premium_across_years() {
        for year in [2024, 2025, 2026] {
            for (month, day) in FIXED_HOLIDAYS {
                assert_eq!(
                    is_premium_day(date(year, month, day), Slot::Afternoon),
                    Ok(true),
                    "{year}-{month:02}-{day:02} should be premium"
                );
            }
        }
    }

    #[test]
    fn easter_relative_holidays_are_premium() {
        // 2024: Easter Monday Apr 1, Ascension May 9, Whit Monday May 20.
        // All of them are weekdays, so the holiday branch is what fires.
        assert_eq!(is_premium_day(date(2024, 4, 1), Slot::Afternoon), Ok(true));
        assert_eq!(is_premium_day(date(2024, 5, 9), Slot::Afternoon), Ok(true));
        assert_eq!(is_premium_day(date(2024, 5, 20), Slot::Afternoon), Ok(true));
        // 2025: Whit Monday falls on June 9.
        assert_eq!(is_premium_day(date(2025, 6, 9), Slot::Afternoon), Ok(true));
        // The eve of an Easter-relative holiday flags evening slots.
        assert_eq!(is_premium_day(date(2024, 5, 8), Slot::Evening), Ok(true));
    }

    #[test]
    fn classification_is_stable_under_recomputation() {
        let first = is_premium_day(date(2026, 4, 6), Slot::Afternoon);
        let second = is_premium_day(date(2026, 4, 6), Slot::Afternoon);
        assert_eq!(first, second);
        assert_eq!(first, Ok(true)); // Easter Monday 2026
    }
}
