//! Relative and absolute date phrases

use crate::patterns::{
    month_from_name, weekday_from_name, DATE_DAY_AFTER_TOMORROW, DATE_DAY_BEFORE_YESTERDAY,
    DATE_DAY_ONLY, DATE_LAST_MONTH, DATE_LAST_WEEK, DATE_NAMED, DATE_NEXT_MONTH, DATE_NEXT_WEEK,
    DATE_NUMERIC, DATE_TODAY, DATE_TOMORROW, DATE_WEEKDAY, DATE_YESTERDAY,
};
use chrono::{Datelike, Days, Months, NaiveDate};
use regex::Regex;

/// Date stated in the sentence, plus the text with that phrase blanked.
///
/// `None` means nothing matched; callers fall back to today. A phrase that
/// matched but does not round-trip through the calendar ("31/02") also
/// resolves to today.
pub fn extract_date(text: &str, today: NaiveDate, prefer_future: bool) -> (Option<NaiveDate>, String) {
    if let Some(caps) = DATE_NUMERIC.captures(text) {
        let day = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let month = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
        let year = caps.get(3).and_then(|m| parse_year(m.as_str()));
        let date = match (day, month) {
            (Some(d), Some(m)) => calendar_date(year.unwrap_or(today.year()), m, d),
            _ => None,
        };
        return (Some(date.unwrap_or(today)), blank(&DATE_NUMERIC, text));
    }

    if let Some(caps) = DATE_NAMED.captures(text) {
        let day = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let month = caps.get(2).and_then(|m| month_from_name(m.as_str()));
        let year = caps.get(3).and_then(|m| parse_year(m.as_str()));
        let date = match (day, month) {
            (Some(d), Some(m)) => calendar_date(year.unwrap_or(today.year()), m, d),
            _ => None,
        };
        return (Some(date.unwrap_or(today)), blank(&DATE_NAMED, text));
    }

    if let Some(caps) = DATE_DAY_ONLY.captures(text) {
        let date = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .and_then(|day| day_of_month(today, day, prefer_future));
        return (Some(date.unwrap_or(today)), blank(&DATE_DAY_ONLY, text));
    }

    let relative: [(&Regex, fn(NaiveDate) -> Option<NaiveDate>); 9] = [
        (&*DATE_DAY_AFTER_TOMORROW, |t| t.checked_add_days(Days::new(2))),
        (&*DATE_DAY_BEFORE_YESTERDAY, |t| t.checked_sub_days(Days::new(2))),
        (&*DATE_YESTERDAY, |t| t.checked_sub_days(Days::new(1))),
        (&*DATE_TOMORROW, |t| t.checked_add_days(Days::new(1))),
        (&*DATE_TODAY, Some),
        (&*DATE_NEXT_WEEK, |t| t.checked_add_days(Days::new(7))),
        (&*DATE_LAST_WEEK, |t| t.checked_sub_days(Days::new(7))),
        (&*DATE_NEXT_MONTH, |t| t.checked_add_months(Months::new(1))),
        (&*DATE_LAST_MONTH, |t| t.checked_sub_months(Months::new(1))),
    ];

    for (pattern, resolve) in relative {
        if pattern.is_match(text) {
            return (Some(resolve(today).unwrap_or(today)), blank(pattern, text));
        }
    }

    for caps in DATE_WEEKDAY.captures_iter(text) {
        let Some(target) = caps.get(2).and_then(|m| weekday_from_name(m.as_str())) else {
            continue;
        };
        let prefix = caps.get(1).map(|m| m.as_str());
        let suffix = caps.get(4).map(|m| m.as_str());
        let has_feira = caps.get(3).is_some();

        let forward = match (prefix, suffix) {
            (_, Some("que vem")) => true,
            (_, Some(_)) => false,
            (Some(p), None) if p.starts_with("pr") => true,
            (Some(_), None) => prefer_future,
            (None, None) if has_feira => prefer_future,
            // a bare "segunda" is more often an ordinal than a day
            (None, None) => continue,
        };

        let date = if forward {
            next_weekday(today, target)
        } else {
            previous_weekday(today, target)
        };

        let Some(whole) = caps.get(0) else {
            continue;
        };
        let mut rest = text.to_string();
        rest.replace_range(whole.range(), " ");
        return (Some(date.unwrap_or(today)), rest);
    }

    (None, text.to_string())
}

/// Build a date, returning `None` when the triple is not on the calendar
pub fn calendar_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Last day of the given month
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    first
        .checked_add_months(Months::new(1))?
        .checked_sub_days(Days::new(1))
}

pub fn parse_year(raw: &str) -> Option<i32> {
    let year = raw.parse::<i32>().ok()?;
    match raw.len() {
        2 => Some(2000 + year),
        4 => Some(year),
        _ => None,
    }
}

/// "dia 5": this month, or next month when a future date is expected and
/// the day already passed
fn day_of_month(today: NaiveDate, day: u32, prefer_future: bool) -> Option<NaiveDate> {
    let this_month = calendar_date(today.year(), today.month(), day)?;
    if prefer_future && this_month < today {
        let next = today.checked_add_months(Months::new(1))?;
        calendar_date(next.year(), next.month(), day)
    } else {
        Some(this_month)
    }
}

/// Next occurrence strictly after today (Monday = 0)
fn next_weekday(today: NaiveDate, target: u32) -> Option<NaiveDate> {
    let current = today.weekday().num_days_from_monday();
    let mut delta = (target + 7 - current) % 7;
    if delta == 0 {
        delta = 7;
    }
    today.checked_add_days(Days::new(delta as u64))
}

/// Most recent occurrence strictly before today
fn previous_weekday(today: NaiveDate, target: u32) -> Option<NaiveDate> {
    let current = today.weekday().num_days_from_monday();
    let mut delta = (current + 7 - target) % 7;
    if delta == 0 {
        delta = 7;
    }
    today.checked_sub_days(Days::new(delta as u64))
}

fn blank(pattern: &Regex, text: &str) -> String {
    pattern.replace(text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Wednesday
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_relative_words() {
        assert_eq!(extract_date("vendi ontem", today(), false).0, Some(date(2025, 3, 11)));
        assert_eq!(extract_date("vendi anteontem", today(), false).0, Some(date(2025, 3, 10)));
        assert_eq!(extract_date("vai pagar amanhã", today(), true).0, Some(date(2025, 3, 13)));
        assert_eq!(extract_date("depois de amanhã", today(), true).0, Some(date(2025, 3, 14)));
        assert_eq!(extract_date("mês que vem", today(), true).0, Some(date(2025, 4, 12)));
        assert_eq!(extract_date("semana passada", today(), false).0, Some(date(2025, 3, 5)));
    }

    #[test]
    fn test_absolute_forms() {
        assert_eq!(extract_date("pago dia 20/03", today(), false).0, Some(date(2025, 3, 20)));
        assert_eq!(extract_date("em 05/01/2026", today(), false).0, Some(date(2026, 1, 5)));
        assert_eq!(extract_date("15 de abril", today(), false).0, Some(date(2025, 4, 15)));
        assert_eq!(extract_date("dia 5", today(), true).0, Some(date(2025, 4, 5)));
        assert_eq!(extract_date("dia 5", today(), false).0, Some(date(2025, 3, 5)));
    }

    #[test]
    fn test_invalid_calendar_date_falls_back_to_today() {
        assert_eq!(extract_date("vence 31/02", today(), true).0, Some(today()));
    }

    #[test]
    fn test_weekdays() {
        assert_eq!(extract_date("próxima sexta", today(), false).0, Some(date(2025, 3, 14)));
        assert_eq!(extract_date("sexta passada", today(), false).0, Some(date(2025, 3, 7)));
        assert_eq!(extract_date("na quarta", today(), true).0, Some(date(2025, 3, 19)));
        assert_eq!(extract_date("na segunda", today(), false).0, Some(date(2025, 3, 10)));
        assert_eq!(extract_date("a segunda opção", today(), false).0, None);
    }

    #[test]
    fn test_no_date_and_masking() {
        let (found, rest) = extract_date("gastei 50 reais com transporte", today(), false);
        assert_eq!(found, None);
        assert_eq!(rest, "gastei 50 reais com transporte");

        let (_, rest) = extract_date("paguei 100 dia 15/03", today(), false);
        assert!(!rest.contains("15/03"));
    }

    #[test]
    fn test_month_end() {
        assert_eq!(month_end(2025, 2), Some(date(2025, 2, 28)));
        assert_eq!(month_end(2024, 12), Some(date(2024, 12, 31)));
    }
}
