//! Entity Extractor
//!
//! Turns a normalized sentence plus its intent into one immutable
//! [`Entities`] record. Sub-extractors run in a fixed order and blank the
//! spans they consume, so later tiers never re-read an installment count or
//! a date as money.

pub mod dates;
pub mod money;
pub mod product_name;
pub mod schedule;

use crate::config::InterpreterConfig;
use crate::models::{Entities, Intent, PaymentMethod};
use crate::patterns::{
    number_word_value, CURRENCY_WORD, DESCRIPTION_VERB, EXPENSE_CATEGORIES, FEE_PERCENT,
    FUTURE_PAYMENT, INCOME_CATEGORIES, LEADING_PREPOSITION, MONEY_BARE, MONEY_LED,
    MONEY_PREFIXED, MONEY_SUFFIX, PAYMENT_METHOD, PERCENT_SPAN, QTY_AFTER_VERB, QTY_NOT_FOLLOWED,
    QTY_UNITS, TASK_TITLE, TIME_OF_DAY,
};
use chrono::{Days, NaiveDate, NaiveTime};
use tracing::debug;

pub use money::{format_brl, parse_bare_money, parse_money_value};
pub use schedule::split_installments;

#[derive(Debug, Clone)]
pub struct EntityExtractor {
    default_payment_term_days: u64,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(&InterpreterConfig::default())
    }
}

impl EntityExtractor {
    pub fn new(config: &InterpreterConfig) -> Self {
        Self {
            default_payment_term_days: config.default_payment_term_days,
        }
    }

    /// Extract every entity the intent cares about from `text` (already
    /// normalized). `today` anchors relative dates.
    pub fn extract(&self, text: &str, intent: Intent, today: NaiveDate) -> Entities {
        let mut entities = Entities::default();
        let mut rest = text.to_string();

        if intent.is_financial() {
            let (installments, r) = schedule::extract_installments(&rest);
            rest = r;
            if let Some(spec) = installments {
                entities.is_installment = true;
                entities.installment_count = Some(spec.count);
                entities.installment_interval = Some(spec.interval);
                entities.installment_value = spec.per_parcel;
            }

            let (recurrence, r) = schedule::extract_recurrence(&rest, today);
            rest = r;
            if let Some(spec) = recurrence {
                entities.is_recurring = true;
                entities.recurring_interval = spec.interval;
                entities.recurring_end_date = spec.end_date;
            }

            entities.fee_percentage = extract_fee(&rest);
            entities.payment_method = extract_payment_method(&rest);
        }
        rest = PERCENT_SPAN.replace_all(&rest, " ").into_owned();

        if intent == Intent::CreateTask {
            let (time, r) = extract_time(&rest);
            entities.time = time;
            rest = r;
        }

        let mut stated_date = None;
        if intent.is_transactional() || intent == Intent::CreateTask {
            let prefer_future = intent == Intent::CreateTask || FUTURE_PAYMENT.is_match(text);
            let (date, r) = dates::extract_date(&rest, today, prefer_future);
            stated_date = date;
            rest = r;
        }

        if intent.is_transactional() {
            entities.quantity = extract_quantity(&rest);
            rest = QTY_UNITS.replace_all(&rest, " ").into_owned();
        }

        entities.amount = money::extract_amount(&rest, intent);
        if entities.amount.is_none() {
            if let (Some(count), Some(per_parcel)) =
                (entities.installment_count, entities.installment_value)
            {
                entities.amount = Some(crate::models::round_cents(count as f64 * per_parcel));
            }
        }

        entities.product_name = product_name::extract_product_name(text, intent);

        match intent {
            Intent::RegisterExpense => {
                entities.description = extract_description(&rest);
                entities.category = Some(categorize(text, EXPENSE_CATEGORIES));
            }
            Intent::RegisterIncome => {
                entities.description = extract_description(&rest);
                entities.category = Some(categorize(text, INCOME_CATEGORIES));
            }
            Intent::CreateTask => {
                entities.title = extract_task_title(&rest);
            }
            _ => {}
        }

        let date = stated_date.unwrap_or(today);
        if intent.schedules_payment() && !entities.is_installment && !entities.is_recurring {
            let future_date = stated_date.filter(|d| *d > today);
            if future_date.is_some() || FUTURE_PAYMENT.is_match(text) {
                entities.payment_scheduled = true;
                entities.payment_date = future_date.or_else(|| {
                    today.checked_add_days(Days::new(self.default_payment_term_days))
                });
                entities.date = Some(today);
            } else {
                entities.date = Some(date);
            }
        } else if intent.is_transactional() || intent == Intent::CreateTask {
            entities.date = Some(date);
        }

        debug!(intent = %intent, ?entities, "entities extracted");
        entities
    }
}

fn extract_quantity(text: &str) -> Option<u32> {
    if let Some(caps) = QTY_UNITS.captures(text) {
        if let Some(value) = caps.get(1).and_then(|m| quantity_value(m.as_str())) {
            return Some(value);
        }
    }

    for caps in QTY_AFTER_VERB.captures_iter(text) {
        let Some(m) = caps.get(1) else {
            continue;
        };
        if QTY_NOT_FOLLOWED.is_match(&text[m.end()..]) {
            continue;
        }
        if let Some(value) = quantity_value(m.as_str()) {
            return Some(value);
        }
    }

    None
}

fn quantity_value(raw: &str) -> Option<u32> {
    raw.parse::<u32>()
        .ok()
        .or_else(|| number_word_value(raw))
        .filter(|q| *q > 0)
}

fn extract_fee(text: &str) -> Option<f64> {
    let caps = FEE_PERCENT.captures(text)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    parse_money_value(raw).filter(|fee| *fee >= 0.0 && *fee < 100.0)
}

fn extract_payment_method(text: &str) -> Option<PaymentMethod> {
    let methods: Vec<PaymentMethod> = PAYMENT_METHOD
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| match m.as_str() {
            "pix" => Some(PaymentMethod::Pix),
            "dinheiro" | "espécie" | "especie" => Some(PaymentMethod::Dinheiro),
            "débito" | "debito" => Some(PaymentMethod::Debito),
            "crédito" | "credito" => Some(PaymentMethod::Credito),
            "cartão" | "cartao" | "maquininha" => Some(PaymentMethod::Cartao),
            _ => None,
        })
        .collect();

    // "cartão de crédito" names the specific kind
    methods
        .iter()
        .copied()
        .find(|m| matches!(m, PaymentMethod::Credito | PaymentMethod::Debito))
        .or_else(|| methods.first().copied())
}

fn extract_time(text: &str) -> (Option<NaiveTime>, String) {
    let Some(caps) = TIME_OF_DAY.captures(text) else {
        return (None, text.to_string());
    };

    let hour = caps
        .get(1)
        .or_else(|| caps.get(3))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    let minute = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0);

    let time = hour.and_then(|h| NaiveTime::from_hms_opt(h, minute, 0));
    (time, TIME_OF_DAY.replace(text, " ").into_owned())
}

fn extract_description(rest: &str) -> Option<String> {
    let mut text = rest.to_string();
    for pattern in [&*MONEY_PREFIXED, &*MONEY_SUFFIX, &*MONEY_LED, &*MONEY_BARE, &*CURRENCY_WORD] {
        text = pattern.replace_all(&text, " ").into_owned();
    }
    text = FUTURE_PAYMENT.replace_all(&text, " ").into_owned();
    text = PAYMENT_METHOD.replace_all(&text, " ").into_owned();

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let after_verb = DESCRIPTION_VERB.replace(&collapsed, "");
    let after_verb = after_verb.trim();
    let body = LEADING_PREPOSITION.replace(after_verb, "");

    let body = body
        .split(|c: char| matches!(c, ',' | ';' | '.' | '!' | '?'))
        .next()
        .unwrap_or_default();

    const DANGLING: &[&str] = &[
        "no", "na", "em", "de", "do", "da", "com", "pelo", "pela", "por", "para", "pra", "via",
        "o", "a", "e", "hoje",
    ];
    let mut words: Vec<&str> = body.split_whitespace().collect();
    while words.last().map(|w| DANGLING.contains(w)).unwrap_or(false) {
        words.pop();
    }

    let description = words.join(" ");
    if description.is_empty() {
        None
    } else {
        Some(description)
    }
}

fn extract_task_title(rest: &str) -> Option<String> {
    let raw = TASK_TITLE
        .iter()
        .find_map(|pattern| pattern.captures(rest).and_then(|caps| caps.get(1)))?
        .as_str();

    let title = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| c == '.' || c == '!')
        .trim()
        .to_string();

    let mut words: Vec<&str> = title.split_whitespace().collect();
    while words
        .last()
        .map(|w| matches!(*w, "para" | "pra" | "no" | "na" | "de" | "em" | "às" | "as"))
        .unwrap_or(false)
    {
        words.pop();
    }

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// First category whose keyword appears as a whole word; "outros" otherwise
fn categorize(text: &str, table: &[(&str, &[&str])]) -> String {
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| contains_word(text, kw)))
        .map(|(category, _)| category.to_string())
        .unwrap_or_else(|| "outros".to_string())
}

fn contains_word(text: &str, word: &str) -> bool {
    text.match_indices(word).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = text[..start]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        let after_ok = text[end..]
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InstallmentInterval, RecurringInterval};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn extract(text: &str, intent: Intent) -> Entities {
        EntityExtractor::default().extract(text, intent, today())
    }

    #[test]
    fn test_expense_with_description() {
        let e = extract("gastei 50 reais com transporte", Intent::RegisterExpense);
        assert_eq!(e.amount, Some(50.0));
        assert_eq!(e.description.as_deref(), Some("transporte"));
        assert_eq!(e.category.as_deref(), Some("transporte"));
        assert_eq!(e.date, Some(today()));
        assert!(!e.payment_scheduled);
    }

    #[test]
    fn test_expense_without_amount() {
        let e = extract("paguei a conta de luz", Intent::RegisterExpense);
        assert_eq!(e.amount, None);
        assert_eq!(e.description.as_deref(), Some("conta de luz"));
        assert_eq!(e.category.as_deref(), Some("energia"));
    }

    #[test]
    fn test_sale_installments_from_parcel_value() {
        let e = extract("vendi o colar de pérolas em 3x de 50 reais", Intent::SellProduct);
        assert!(e.is_installment);
        assert_eq!(e.installment_count, Some(3));
        assert_eq!(e.installment_interval, Some(InstallmentInterval::Monthly));
        assert_eq!(e.installment_value, Some(50.0));
        assert_eq!(e.amount, Some(150.0));
        assert_eq!(e.product_name.as_deref(), Some("colar de pérolas"));
        assert!(!e.payment_scheduled);
    }

    #[test]
    fn test_sale_quantity_and_amount() {
        let e = extract("vendi 3 brincos por 90", Intent::SellProduct);
        assert_eq!(e.quantity, Some(3));
        assert_eq!(e.amount, Some(90.0));
        assert_eq!(e.product_name.as_deref(), Some("brincos"));

        let e = extract("vendi dois anéis", Intent::SellProduct);
        assert_eq!(e.quantity, Some(2));
        assert_eq!(e.amount, None);
    }

    #[test]
    fn test_future_payment_is_scheduled() {
        let e = extract("vendi o colar por 120, o cliente vai pagar dia 20", Intent::SellProduct);
        assert!(e.payment_scheduled);
        assert_eq!(e.payment_date, NaiveDate::from_ymd_opt(2025, 3, 20));
        assert_eq!(e.date, Some(today()));

        let e = extract("vendi fiado o colar por 120", Intent::SellProduct);
        assert!(e.payment_scheduled);
        assert_eq!(e.payment_date, NaiveDate::from_ymd_opt(2025, 4, 11));
    }

    #[test]
    fn test_past_date_is_not_scheduled() {
        let e = extract("gastei 80 reais de gasolina ontem", Intent::RegisterExpense);
        assert!(!e.payment_scheduled);
        assert_eq!(e.date, NaiveDate::from_ymd_opt(2025, 3, 11));
    }

    #[test]
    fn test_recurring_expense() {
        let e = extract("paguei 1500 de aluguel todo mês até dezembro", Intent::RegisterExpense);
        assert!(e.is_recurring);
        assert_eq!(e.recurring_interval, Some(RecurringInterval::Monthly));
        assert_eq!(e.recurring_end_date, NaiveDate::from_ymd_opt(2025, 12, 31));
        assert_eq!(e.amount, Some(1500.0));
        assert_eq!(e.description.as_deref(), Some("aluguel"));
        assert!(!e.payment_scheduled);
    }

    #[test]
    fn test_card_fee_and_method() {
        let e = extract("vendi o colar por 200 no cartão de crédito com taxa de 3,5%", Intent::SellProduct);
        assert_eq!(e.payment_method, Some(PaymentMethod::Credito));
        assert_eq!(e.fee_percentage, Some(3.5));
        assert_eq!(e.amount, Some(200.0));
    }

    #[test]
    fn test_task_title_and_time() {
        let e = extract("me lembra de ligar para o fornecedor amanhã às 14h", Intent::CreateTask);
        assert_eq!(e.title.as_deref(), Some("ligar para o fornecedor"));
        assert_eq!(e.time, NaiveTime::from_hms_opt(14, 0, 0));
        assert_eq!(e.date, NaiveDate::from_ymd_opt(2025, 3, 13));
    }

    #[test]
    fn test_income_category() {
        let e = extract("recebi 300 do cliente joão", Intent::RegisterIncome);
        assert_eq!(e.amount, Some(300.0));
        assert_eq!(e.category.as_deref(), Some("vendas"));
        assert_eq!(e.description.as_deref(), Some("cliente joão"));
    }

    #[test]
    fn test_analytics_intents_carry_no_date() {
        let e = extract("quanto vendi hoje", Intent::CheckRevenue);
        assert_eq!(e.date, None);
        assert_eq!(e.amount, None);
    }
}
