//! Installment and recurrence phrases

use super::dates::{calendar_date, month_end, parse_year};
use super::money::parse_money_value;
use crate::models::{InstallmentInterval, RecurringInterval};
use crate::patterns::{
    month_from_name, INSTALLMENT_NX, INSTALLMENT_PARCELADO, INSTALLMENT_QUARTERLY,
    INSTALLMENT_WEEKLY, INSTALLMENT_WORDS, RECUR_END_MONTH, RECUR_END_NAMED, RECUR_END_NUMERIC,
    RECUR_EVERY_N, RECUR_MARKER, RECUR_MONTHLY, RECUR_QUARTERLY, RECUR_WEEKLY, RECUR_YEARLY,
};
use chrono::{Datelike, NaiveDate};
use regex::Regex;

pub const MAX_INSTALLMENTS: u32 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentSpec {
    pub count: u32,
    pub interval: InstallmentInterval,
    /// Per-parcel value from "Nx de V"
    pub per_parcel: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceSpec {
    /// `None` when only a marker like "fixa" was present
    pub interval: Option<RecurringInterval>,
    pub end_date: Option<NaiveDate>,
}

/// Find "3x", "3x de 50", "em 4 parcelas", "parcelado em 6".
///
/// Counts outside 1..=60 are ignored so a money value is never read as a
/// parcel count. The matched phrase is blanked in the returned text.
pub fn extract_installments(text: &str) -> (Option<InstallmentSpec>, String) {
    for pattern in [&*INSTALLMENT_NX, &*INSTALLMENT_WORDS, &*INSTALLMENT_PARCELADO] {
        for caps in pattern.captures_iter(text) {
            let Some(count) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
                continue;
            };
            if !(1..=MAX_INSTALLMENTS).contains(&count) {
                continue;
            }

            let per_parcel = caps
                .get(2)
                .and_then(|m| parse_money_value(m.as_str()))
                .filter(|v| *v > 0.0);

            let Some(whole) = caps.get(0) else {
                continue;
            };
            let mut rest = text.to_string();
            rest.replace_range(whole.range(), " ");

            let interval = if INSTALLMENT_WEEKLY.is_match(text) {
                rest = blank(&INSTALLMENT_WEEKLY, &rest);
                InstallmentInterval::Weekly
            } else if INSTALLMENT_QUARTERLY.is_match(text) {
                rest = blank(&INSTALLMENT_QUARTERLY, &rest);
                InstallmentInterval::Quarterly
            } else {
                InstallmentInterval::Monthly
            };

            let spec = InstallmentSpec {
                count,
                interval,
                per_parcel,
            };
            return (Some(spec), rest);
        }
    }

    (None, text.to_string())
}

/// Find a cadence ("todo mês", "a cada 2 semanas", "anual") and an optional
/// end date ("até 12/2025", "até 15 de dezembro", "até junho").
pub fn extract_recurrence(text: &str, today: NaiveDate) -> (Option<RecurrenceSpec>, String) {
    let mut rest = text.to_string();
    let mut interval = None;

    if let Some(caps) = RECUR_EVERY_N.captures(text) {
        let n = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let unit = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        interval = match n {
            Some(n) if n > 0 && unit.starts_with("semana") => Some(RecurringInterval::from_weeks(n)),
            Some(n) if n > 0 => Some(RecurringInterval::from_months(n)),
            _ => None,
        };
        rest = blank(&RECUR_EVERY_N, &rest);
    }

    if interval.is_none() {
        let cadences: [(&Regex, RecurringInterval); 4] = [
            (&*RECUR_WEEKLY, RecurringInterval::Weekly),
            (&*RECUR_MONTHLY, RecurringInterval::Monthly),
            (&*RECUR_QUARTERLY, RecurringInterval::Quarterly),
            (&*RECUR_YEARLY, RecurringInterval::Yearly),
        ];
        for (pattern, cadence) in cadences {
            if pattern.is_match(&rest) {
                interval = Some(cadence);
                rest = blank(pattern, &rest);
                break;
            }
        }
    }

    let marked = RECUR_MARKER.is_match(&rest);
    if interval.is_none() && !marked {
        return (None, text.to_string());
    }
    rest = blank(&RECUR_MARKER, &rest);

    let (end_date, rest) = extract_end_date(&rest, today);
    (Some(RecurrenceSpec { interval, end_date }), rest)
}

fn extract_end_date(text: &str, today: NaiveDate) -> (Option<NaiveDate>, String) {
    if let Some(caps) = RECUR_END_NUMERIC.captures(text) {
        let day = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let month = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
        let year = caps.get(3).and_then(|m| parse_year(m.as_str()));
        let date = match (day, month) {
            (Some(d), Some(m)) => resolve_end(today, year, |y| calendar_date(y, m, d)),
            _ => None,
        };
        return (date, blank(&RECUR_END_NUMERIC, text));
    }

    if let Some(caps) = RECUR_END_NAMED.captures(text) {
        let day = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let month = caps.get(2).and_then(|m| month_from_name(m.as_str()));
        let year = caps.get(3).and_then(|m| parse_year(m.as_str()));
        let date = match (day, month) {
            (Some(d), Some(m)) => resolve_end(today, year, |y| calendar_date(y, m, d)),
            _ => None,
        };
        return (date, blank(&RECUR_END_NAMED, text));
    }

    if let Some(caps) = RECUR_END_MONTH.captures(text) {
        let month = caps.get(1).and_then(|m| month_from_name(m.as_str()));
        let year = caps.get(2).and_then(|m| parse_year(m.as_str()));
        let date = month.and_then(|m| resolve_end(today, year, |y| month_end(y, m)));
        return (date, blank(&RECUR_END_MONTH, text));
    }

    (None, text.to_string())
}

/// Without an explicit year the end date is the next one that is not in
/// the past
fn resolve_end<F>(today: NaiveDate, year: Option<i32>, build: F) -> Option<NaiveDate>
where
    F: Fn(i32) -> Option<NaiveDate>,
{
    match year {
        Some(y) => build(y),
        None => {
            let this_year = build(today.year())?;
            if this_year >= today {
                Some(this_year)
            } else {
                build(today.year() + 1)
            }
        }
    }
}

/// Split `total` into `count` parcels of whole cents; the last parcel
/// absorbs the rounding remainder so the parts always add up to the total.
pub fn split_installments(total: f64, count: u32) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }

    let total_cents = (total * 100.0).round() as i64;
    let base = total_cents / count as i64;
    let remainder = total_cents - base * count as i64;

    (0..count)
        .map(|i| {
            let cents = if i + 1 == count { base + remainder } else { base };
            cents as f64 / 100.0
        })
        .collect()
}

fn blank(pattern: &Regex, text: &str) -> String {
    pattern.replace_all(text, " ").into_owned()
}
