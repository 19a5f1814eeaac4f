//! Intent Classifier
//!
//! Resolves which action an utterance requests:
//! - Priority rule: a purchase verb with a monetary amount is an expense
//!   ("comprei 200 reais de material"), not a stock purchase
//! - Otherwise the first entry of the ordered intent table that matches
//!
//! Confidence is binary (0.9 known, 0.1 unknown) and not calibrated.

use crate::models::Intent;
use crate::patterns::{normalize, CURRENCY_TAGGED, INTENT_TABLE, PURCHASE_VERB, UNIT_WORD};

pub const KNOWN_CONFIDENCE: f32 = 0.9;
pub const UNKNOWN_CONFIDENCE: f32 = 0.1;

/// Tokens after the purchase verb that may hold the amount
const PURCHASE_WINDOW: usize = 4;

/// Intent classifier
pub struct IntentClassifier;

impl IntentClassifier {
    /// Classify raw or normalized text
    pub fn classify(text: &str) -> (Intent, f32) {
        let text = normalize(text);
        let intent = Self::classify_normalized(&text);
        (intent, confidence_for(intent))
    }

    pub fn classify_normalized(text: &str) -> Intent {
        if is_purchase_with_amount(text) {
            return Intent::RegisterExpense;
        }

        INTENT_TABLE
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(text)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Unknown)
    }
}

pub fn confidence_for(intent: Intent) -> f32 {
    if intent == Intent::Unknown {
        UNKNOWN_CONFIDENCE
    } else {
        KNOWN_CONFIDENCE
    }
}

/// Purchase verb plus either a currency-tagged number anywhere, or a bare
/// number of 2+ digits within a few tokens that is not a unit count
fn is_purchase_with_amount(text: &str) -> bool {
    let Some(verb) = PURCHASE_VERB.find(text) else {
        return false;
    };

    if CURRENCY_TAGGED.is_match(text) {
        return true;
    }

    let tokens: Vec<&str> = text[verb.end()..].split_whitespace().collect();
    tokens
        .iter()
        .take(PURCHASE_WINDOW)
        .enumerate()
        .any(|(i, token)| {
            let number = token.trim_end_matches(|c: char| !c.is_ascii_digit());
            let digits = number.chars().filter(|c| c.is_ascii_digit()).count();
            let numeric = !number.is_empty()
                && number
                    .chars()
                    .all(|c| c.is_ascii_digit() || c == '.' || c == ',');

            if !numeric || digits < 2 {
                return false;
            }

            let unit_follows = tokens
                .get(i + 1)
                .map(|next| UNIT_WORD.is_match(next))
                .unwrap_or(false);
            !unit_follows
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(text: &str) -> Intent {
        IntentClassifier::classify(text).0
    }

    #[test]
    fn test_purchase_with_money_is_expense() {
        let cases = vec![
            "comprei 200 reais de material",
            "Comprei R$ 50 de embalagens",
            "comprei material por 80",
            "comprei tecido 150",
        ];

        for c in cases {
            assert_eq!(intent(c), Intent::RegisterExpense, "{}", c);
        }
    }

    #[test]
    fn test_purchase_with_unit_count_stays_buy() {
        assert_eq!(intent("comprei 10 unidades de colar"), Intent::BuyProduct);
        assert_eq!(intent("comprei 5 colares"), Intent::BuyProduct);
        assert_eq!(intent("comprei"), Intent::BuyProduct);
    }

    #[test]
    fn test_transactional_intents() {
        assert_eq!(intent("vendi o colar de pérolas"), Intent::SellProduct);
        assert_eq!(intent("gastei 50 reais com transporte"), Intent::RegisterExpense);
        assert_eq!(intent("paguei a conta de luz"), Intent::RegisterExpense);
        assert_eq!(intent("recebi 300 do cliente"), Intent::RegisterIncome);
        assert_eq!(intent("repor 10 unidades do anel"), Intent::RestockProduct);
        assert_eq!(intent("chegaram 20 caixas de sabonete"), Intent::RestockProduct);
    }

    #[test]
    fn test_queries_win_over_generic_verbs() {
        assert_eq!(intent("quanto vendi hoje?"), Intent::CheckRevenue);
        assert_eq!(intent("quanto gastei este mês"), Intent::CheckExpenses);
        assert_eq!(intent("qual meu lucro do mês"), Intent::CalculateProfit);
        assert_eq!(intent("quais os produtos mais vendidos"), Intent::AnalyzeProducts);
        assert_eq!(intent("me dá umas dicas"), Intent::GenerateInsights);
        assert_eq!(intent("me lembra de pagar o fornecedor amanhã"), Intent::CreateTask);
    }

    #[test]
    fn test_catalog_intents() {
        assert_eq!(intent("listar produtos"), Intent::ListProducts);
        assert_eq!(intent("buscar anel"), Intent::SearchProduct);
        assert_eq!(intent("quantos colares eu tenho?"), Intent::CheckStock);
        assert_eq!(intent("estoque do anel"), Intent::CheckStock);
    }

    #[test]
    fn test_help_and_unknown() {
        assert_eq!(intent("ajuda"), Intent::Help);
        assert_eq!(intent("o que você pode fazer?"), Intent::Help);

        let (unknown, confidence) = IntentClassifier::classify("bom dia flor do dia");
        assert_eq!(unknown, Intent::Unknown);
        assert_eq!(confidence, UNKNOWN_CONFIDENCE);
        assert_eq!(IntentClassifier::classify("vendi um anel").1, KNOWN_CONFIDENCE);
    }
}
