//! Monetary values: parsing both decimal conventions, picking the amount
//! out of a sentence, and formatting in BRL.

use crate::models::Intent;
use crate::patterns::{
    BARE_MONEY, INSTALLMENT_MARKER_AFTER, MONEY_BARE, MONEY_LED, MONEY_PREFIXED, MONEY_SUFFIX,
    PAYMENT_CONTEXT, QTY_AFTER_VERB, UNIT_WORD,
};

/// Parse "1.234,56", "1,234.56", "80,39", "80.39" or "1500" into a value.
///
/// When both separators are present the last one is the decimal mark. A
/// lone separator followed by exactly three digits is a thousands mark.
pub fn parse_money_value(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_start_matches("r$").trim();
    if s.is_empty() {
        return None;
    }

    let has_dot = s.contains('.');
    let has_comma = s.contains(',');

    let normalized = match (has_dot, has_comma) {
        (true, true) => {
            let last_dot = s.rfind('.');
            let last_comma = s.rfind(',');
            if last_comma > last_dot {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (false, true) => {
            let parts: Vec<&str> = s.split(',').collect();
            if parts.len() == 2 && (1..=2).contains(&parts[1].len()) {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (true, false) => {
            let parts: Vec<&str> = s.split('.').collect();
            if parts.len() == 2 && parts[1].len() != 3 {
                s.to_string()
            } else {
                s.replace('.', "")
            }
        }
        (false, false) => s.to_string(),
    };

    let value = normalized.parse::<f64>().ok()?;
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// A reply made only of a monetary value ("150", "R$ 80,39", "é 50 reais")
pub fn parse_bare_money(text: &str) -> Option<f64> {
    let caps = BARE_MONEY.captures(text.trim())?;
    parse_money_value(caps.get(1)?.as_str()).filter(|v| *v > 0.0)
}

/// Pick the command amount from a sentence whose installment, date and
/// percentage spans were already blanked.
///
/// Tiers, first hit wins: currency prefix, preposition/verb-led number,
/// bare number of 3+ digits (financial intents only), currency suffix.
pub fn extract_amount(text: &str, intent: Intent) -> Option<f64> {
    for caps in MONEY_PREFIXED.captures_iter(text) {
        if let Some(value) = caps.get(1).and_then(|m| positive(m.as_str())) {
            return Some(value);
        }
    }

    let payment_context = PAYMENT_CONTEXT.is_match(text);
    for caps in MONEY_LED.captures_iter(text) {
        let (Some(keyword), Some(number)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if INSTALLMENT_MARKER_AFTER.is_match(&text[number.end()..]) {
            continue;
        }
        let Some(value) = positive(number.as_str()) else {
            continue;
        };

        let accepted = match keyword.as_str() {
            "de" | "no valor de" | "valor de" | "total de" | "custou" | "custa" | "custando"
            | "vale" => value >= 100.0 || payment_context,
            _ => true,
        };
        if accepted {
            return Some(value);
        }
    }

    if intent.is_financial() {
        for caps in MONEY_BARE.captures_iter(text) {
            let Some(number) = caps.get(1) else {
                continue;
            };
            let digits = number.as_str().chars().filter(|c| c.is_ascii_digit()).count();
            if digits < 3 {
                continue;
            }

            let after = &text[number.end()..];
            if INSTALLMENT_MARKER_AFTER.is_match(after) || UNIT_WORD.is_match(after.trim_start()) {
                continue;
            }
            if is_quantity_position(text, number.start()) {
                continue;
            }
            if let Some(value) = positive(number.as_str()) {
                return Some(value);
            }
        }
    }

    MONEY_SUFFIX
        .captures_iter(text)
        .find_map(|caps| caps.get(1).and_then(|m| positive(m.as_str())))
}

/// "vendi 150 colares": the number right after a stock verb is a quantity
fn is_quantity_position(text: &str, start: usize) -> bool {
    QTY_AFTER_VERB
        .captures_iter(text)
        .any(|caps| caps.get(1).map(|m| m.start()) == Some(start))
}

fn positive(raw: &str) -> Option<f64> {
    parse_money_value(raw).filter(|v| *v > 0.0)
}

/// Format as "R$ 1.234,56"
pub fn format_brl(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u64;
    let int_part = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}R$ {},{:02}", sign, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_decimal_conventions_agree() {
        assert_eq!(parse_money_value("80,39"), Some(80.39));
        assert_eq!(parse_money_value("80.39"), Some(80.39));
        assert_eq!(parse_money_value("1.234,56"), Some(1234.56));
        assert_eq!(parse_money_value("1,234.56"), Some(1234.56));
        assert_eq!(parse_money_value("1.500"), Some(1500.0));
        assert_eq!(parse_money_value("1,500"), Some(1500.0));
        assert_eq!(parse_money_value("2.000.000"), Some(2_000_000.0));
        assert_eq!(parse_money_value("abc"), None);
    }

    #[test]
    fn test_currency_tagged_sentences_agree() {
        let comma = extract_amount("gastei r$ 1.234,56 no mercado", Intent::RegisterExpense);
        let dot = extract_amount("gastei r$ 1,234.56 no mercado", Intent::RegisterExpense);
        assert_eq!(comma, Some(1234.56));
        assert_eq!(comma, dot);

        assert_eq!(
            extract_amount("paguei 80,39 de luz", Intent::RegisterExpense),
            extract_amount("paguei 80.39 de luz", Intent::RegisterExpense)
        );
    }

    #[test]
    fn test_amount_tiers() {
        assert_eq!(extract_amount("gastei 50 reais com transporte", Intent::RegisterExpense), Some(50.0));
        assert_eq!(extract_amount("vendi o colar por 120", Intent::SellProduct), Some(120.0));
        assert_eq!(extract_amount("recebi do cliente 80 reais", Intent::RegisterIncome), Some(80.0));
        assert_eq!(extract_amount("vendi um colar 150", Intent::SellProduct), Some(150.0));
    }

    #[test]
    fn test_small_de_number_without_payment_context_is_ignored() {
        assert_eq!(extract_amount("vendi o colar de 50", Intent::SellProduct), None);
        assert_eq!(extract_amount("comprei material de 50", Intent::RegisterExpense), Some(50.0));
    }

    #[test]
    fn test_quantity_is_not_money() {
        assert_eq!(extract_amount("vendi 150 colares", Intent::SellProduct), None);
        assert_eq!(extract_amount("comprei 200 unidades", Intent::BuyProduct), None);
    }

    #[test]
    fn test_installment_count_is_not_money() {
        assert_eq!(extract_amount("vendi o colar em 120x", Intent::SellProduct), None);
    }

    #[test]
    fn test_bare_money_reply() {
        assert_eq!(parse_bare_money("150"), Some(150.0));
        assert_eq!(parse_bare_money("R$ 80,39".to_lowercase().as_str()), Some(80.39));
        assert_eq!(parse_bare_money("50 reais"), Some(50.0));
        assert_eq!(parse_bare_money("não sei"), None);
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(120.0), "R$ 120,00");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
        assert_eq!(format_brl(-5.5), "-R$ 5,50");
    }
}
