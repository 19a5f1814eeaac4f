//! Command Validator
//!
//! Rule engine over a parsed command. Pure and synchronous; every failing
//! rule is reported, each with a remediation hint, plus example commands
//! for the intent.

pub mod suggestions;

use crate::extraction::schedule::MAX_INSTALLMENTS;
use crate::models::{Intent, ParsedCommand, ValidationIssue, ValidationResult};
use chrono::{Datelike, NaiveDate};
use tracing::debug;

pub const MAX_AMOUNT: f64 = 1_000_000.0;
const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2100;

/// Trait for validation rules
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, command: &ParsedCommand) -> Vec<ValidationIssue>;
}

fn issue(field: &str, message: impl Into<String>, suggestion: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        field: field.to_string(),
        message: message.into(),
        suggestion: suggestion.into(),
    }
}

/// Validator that runs every registered rule
pub struct CommandValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl CommandValidator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn validate(&self, command: &ParsedCommand) -> ValidationResult {
        let errors: Vec<ValidationIssue> = self
            .rules
            .iter()
            .flat_map(|rule| {
                let found = rule.check(command);
                if !found.is_empty() {
                    debug!(rule = rule.name(), count = found.len(), "validation rule failed");
                }
                found
            })
            .collect();

        let is_valid = errors.is_empty();
        let suggestions = if is_valid {
            Vec::new()
        } else {
            suggestions::examples_for(command.intent)
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        ValidationResult {
            is_valid,
            errors,
            suggestions,
        }
    }
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Rules =================
//

pub struct UnknownIntentRule;

impl ValidationRule for UnknownIntentRule {
    fn name(&self) -> &'static str {
        "unknown_intent"
    }

    fn check(&self, command: &ParsedCommand) -> Vec<ValidationIssue> {
        if command.intent != Intent::Unknown {
            return Vec::new();
        }
        vec![issue(
            "intent",
            "Não entendi o que você quer fazer.",
            "Tente algo como \"vendi 2 colares por 100 reais\" ou digite \"ajuda\".",
        )]
    }
}

/// Years inside 2000..=2100, payment not before the transaction, recurrence
/// ending after it starts
pub struct DateSanityRule;

impl ValidationRule for DateSanityRule {
    fn name(&self) -> &'static str {
        "date_sanity"
    }

    fn check(&self, command: &ParsedCommand) -> Vec<ValidationIssue> {
        let e = &command.entities;
        let mut issues = Vec::new();

        let fields: [(&str, Option<NaiveDate>); 3] = [
            ("date", e.date),
            ("paymentDate", e.payment_date),
            ("recurringEndDate", e.recurring_end_date),
        ];
        for (field, date) in fields {
            if let Some(date) = date {
                if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                    issues.push(issue(
                        field,
                        format!("Data fora do intervalo aceito: {}", date.format("%d/%m/%Y")),
                        "Use datas como \"15/03\" ou \"15 de março de 2025\".",
                    ));
                }
            }
        }

        if let (Some(date), Some(payment)) = (e.date, e.payment_date) {
            if payment < date {
                issues.push(issue(
                    "paymentDate",
                    "A data de pagamento é anterior à data da transação.",
                    "Informe uma data de pagamento futura, como \"vai pagar dia 20\".",
                ));
            }
        }

        if let (Some(date), Some(end)) = (e.date, e.recurring_end_date) {
            if end <= date {
                issues.push(issue(
                    "recurringEndDate",
                    "A recorrência termina antes de começar.",
                    "Use um fim futuro, como \"todo mês até dezembro\".",
                ));
            }
        }

        issues
    }
}

pub struct AmountBoundsRule;

impl ValidationRule for AmountBoundsRule {
    fn name(&self) -> &'static str {
        "amount_bounds"
    }

    fn check(&self, command: &ParsedCommand) -> Vec<ValidationIssue> {
        let e = &command.entities;
        let mut issues = Vec::new();

        for (field, value) in [("amount", e.amount), ("installmentValue", e.installment_value)] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    issues.push(issue(
                        field,
                        "O valor precisa ser maior que zero.",
                        "Informe o valor, como \"50 reais\" ou \"R$ 80,39\".",
                    ));
                } else if value >= MAX_AMOUNT {
                    issues.push(issue(
                        field,
                        "O valor informado é alto demais.",
                        "Confira o valor; aceito até R$ 999.999,99.",
                    ));
                }
            }
        }

        issues
    }
}

pub struct InstallmentCountRule;

impl ValidationRule for InstallmentCountRule {
    fn name(&self) -> &'static str {
        "installment_count"
    }

    fn check(&self, command: &ParsedCommand) -> Vec<ValidationIssue> {
        let e = &command.entities;
        if !e.is_installment {
            return Vec::new();
        }

        match e.installment_count {
            Some(count) if (2..=MAX_INSTALLMENTS).contains(&count) => Vec::new(),
            _ => vec![issue(
                "installmentCount",
                format!("O parcelamento precisa ter entre 2 e {} parcelas.", MAX_INSTALLMENTS),
                "Exemplo: \"em 3x de 50 reais\".",
            )],
        }
    }
}

pub struct RecurringRule;

impl ValidationRule for RecurringRule {
    fn name(&self) -> &'static str {
        "recurring"
    }

    fn check(&self, command: &ParsedCommand) -> Vec<ValidationIssue> {
        let e = &command.entities;
        if !e.is_recurring {
            return Vec::new();
        }

        // Expense/income without a value is asked for in the next turn; the
        // recurrence flags ride along in the pending entities
        let amount_deferred = e.amount.is_none()
            && matches!(
                command.intent,
                Intent::RegisterExpense | Intent::RegisterIncome
            );

        let mut issues = Vec::new();
        if !amount_deferred && !e.amount.map(|a| a > 0.0).unwrap_or(false) {
            issues.push(issue(
                "amount",
                "Para lançamentos recorrentes preciso do valor.",
                "Exemplo: \"paguei 1500 de aluguel todo mês\".",
            ));
        }
        if e.recurring_interval.is_none() {
            issues.push(issue(
                "recurringInterval",
                "Não identifiquei a frequência da recorrência.",
                "Diga a frequência: \"todo mês\", \"toda semana\" ou \"a cada 2 meses\".",
            ));
        }
        issues
    }
}

pub struct SellProductNameRule;

impl ValidationRule for SellProductNameRule {
    fn name(&self) -> &'static str {
        "sell_product_name"
    }

    fn check(&self, command: &ParsedCommand) -> Vec<ValidationIssue> {
        if command.intent != Intent::SellProduct {
            return Vec::new();
        }

        let has_name = command
            .entities
            .product_name
            .as_deref()
            .map(|name| !name.trim().is_empty())
            .unwrap_or(false);
        if has_name {
            return Vec::new();
        }

        vec![issue(
            "productName",
            "Não identifiquei qual produto foi vendido.",
            "Diga o produto, como \"vendi o colar de pérolas\".",
        )]
    }
}

/// Installment and recurrence in one command are not a supported state.
/// Handlers still prefer installments if this rule is ever bypassed.
pub struct ScheduleConflictRule;

impl ValidationRule for ScheduleConflictRule {
    fn name(&self) -> &'static str {
        "schedule_conflict"
    }

    fn check(&self, command: &ParsedCommand) -> Vec<ValidationIssue> {
        let e = &command.entities;
        if e.is_installment && e.is_recurring {
            vec![issue(
                "isRecurring",
                "Não é possível parcelar e repetir o mesmo lançamento.",
                "Escolha um: \"em 3x\" ou \"todo mês\".",
            )]
        } else {
            Vec::new()
        }
    }
}

/// Create a validator with the standard rules
pub fn create_default_validator() -> CommandValidator {
    let mut validator = CommandValidator::new();
    validator.add_rule(Box::new(UnknownIntentRule));
    validator.add_rule(Box::new(DateSanityRule));
    validator.add_rule(Box::new(AmountBoundsRule));
    validator.add_rule(Box::new(InstallmentCountRule));
    validator.add_rule(Box::new(RecurringRule));
    validator.add_rule(Box::new(SellProductNameRule));
    validator.add_rule(Box::new(ScheduleConflictRule));
    validator
}

//
// ================= Tests =================
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entities, RecurringInterval};

    fn command(intent: Intent, entities: Entities) -> ParsedCommand {
        ParsedCommand {
            intent,
            confidence: 0.9,
            entities,
            raw_text: String::new(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    #[test]
    fn test_unknown_intent_is_error_with_examples() {
        let result = create_default_validator().validate(&command(Intent::Unknown, Entities::default()));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "intent");
        assert!(!result.suggestions.is_empty());
    }

    #[test]
    fn test_expense_without_amount_is_not_blocked() {
        let entities = Entities {
            date: Some(today()),
            description: Some("luz".to_string()),
            ..Default::default()
        };
        let result = create_default_validator().validate(&command(Intent::RegisterExpense, entities));
        assert!(result.is_valid);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_amount_bounds() {
        let entities = Entities {
            amount: Some(2_000_000.0),
            ..Default::default()
        };
        let result = create_default_validator().validate(&command(Intent::RegisterIncome, entities));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "amount");
    }

    #[test]
    fn test_installment_count_minimum() {
        let entities = Entities {
            amount: Some(100.0),
            is_installment: true,
            installment_count: Some(1),
            ..Default::default()
        };
        let result = create_default_validator().validate(&command(Intent::RegisterExpense, entities));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "installmentCount");
    }

    #[test]
    fn test_all_errors_are_reported_together() {
        let entities = Entities {
            date: Some(today()),
            payment_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            is_installment: true,
            installment_count: Some(3),
            is_recurring: true,
            recurring_interval: None,
            ..Default::default()
        };
        let result = create_default_validator().validate(&command(Intent::SellProduct, entities));
        assert!(!result.is_valid);

        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"paymentDate"));
        assert!(fields.contains(&"amount"));
        assert!(fields.contains(&"recurringInterval"));
        assert!(fields.contains(&"productName"));
        assert!(fields.contains(&"isRecurring"));
        assert!(result.errors.iter().all(|e| !e.suggestion.is_empty()));
    }

    #[test]
    fn test_valid_recurring_expense() {
        let entities = Entities {
            amount: Some(1500.0),
            date: Some(today()),
            is_recurring: true,
            recurring_interval: Some(RecurringInterval::Monthly),
            recurring_end_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            ..Default::default()
        };
        assert!(create_default_validator()
            .validate(&command(Intent::RegisterExpense, entities))
            .is_valid);
    }

    #[test]
    fn test_recurring_expense_without_amount_is_deferred() {
        let entities = Entities {
            date: Some(today()),
            is_recurring: true,
            recurring_interval: Some(RecurringInterval::Monthly),
            ..Default::default()
        };
        assert!(create_default_validator()
            .validate(&command(Intent::RegisterExpense, entities.clone()))
            .is_valid);

        // sales still need the value up front
        let result = create_default_validator().validate(&command(
            Intent::SellProduct,
            Entities {
                product_name: Some("colar".into()),
                ..entities
            },
        ));
        assert!(result.errors.iter().any(|e| e.field == "amount"));
    }

    #[test]
    fn test_out_of_range_year() {
        let entities = Entities {
            amount: Some(10.0),
            date: NaiveDate::from_ymd_opt(1999, 12, 31),
            ..Default::default()
        };
        let result = create_default_validator().validate(&command(Intent::RegisterExpense, entities));
        assert_eq!(result.errors[0].field, "date");
    }
}
