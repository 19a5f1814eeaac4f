//! Expense and income proposals

use super::{describe_plan, payment_plan, CommandHandler, HandlerOutcome, HandlerRequest, HandlerServices};
use crate::context::PendingState;
use crate::extraction::format_brl;
use crate::models::{round_cents, BotResponse, FinancialAction, Intent, PendingAction};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_CATEGORY: &str = "outros";

pub struct FinanceHandler {
    services: Arc<HandlerServices>,
}

impl FinanceHandler {
    pub fn new(services: Arc<HandlerServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for FinanceHandler {
    fn name(&self) -> &'static str {
        "finance"
    }

    fn intents(&self) -> &'static [Intent] {
        &[Intent::RegisterExpense, Intent::RegisterIncome]
    }

    async fn handle(&self, request: &HandlerRequest<'_>) -> Result<HandlerOutcome> {
        let command = request.command;
        let entities = request.entities();
        let is_expense = command.intent == Intent::RegisterExpense;
        let (noun, label) = if is_expense {
            ("despesa", "Despesa")
        } else {
            ("receita", "Receita")
        };

        let Some(amount) = entities.amount.map(round_cents) else {
            let question = match entities.description.as_deref() {
                Some(description) => format!("Qual foi o valor da {} com {}?", noun, description),
                None => format!("Qual foi o valor da {}?", noun),
            };
            return Ok(HandlerOutcome::awaiting(
                BotResponse::question(question),
                PendingState::AskAmount {
                    intent: command.intent,
                    raw_text: command.raw_text.clone(),
                    entities: entities.clone(),
                },
            ));
        };

        let category = entities
            .category
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let description = entities
            .description
            .clone()
            .unwrap_or_else(|| label.to_string());

        let plan = payment_plan(entities, amount, request.today);
        let action = FinancialAction {
            amount,
            description: description.clone(),
            category: category.clone(),
            date: entities.date.unwrap_or(request.today),
            plan,
        };

        let message = format!(
            "Confirma a {} de {} ({}, categoria {})?{}",
            noun,
            format_brl(amount),
            description,
            category,
            describe_plan(&action.plan)
        );
        let data = json!({
            "type": if is_expense { "expense" } else { "income" },
            "amount": amount,
            "description": description,
            "category": category,
            "date": action.date,
            "plan": action.plan,
        });

        let pending = if is_expense {
            PendingAction::Expense(action)
        } else {
            PendingAction::Income(action)
        };
        Ok(self.services.propose(request, pending, message, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::ConfirmationSigner;
    use crate::config::InterpreterConfig;
    use crate::context::ContextUpdate;
    use crate::extraction::EntityExtractor;
    use crate::models::{ParsedCommand, PaymentPlan, ResponseType};
    use crate::store::InMemoryLedgerStore;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    async fn run(text: &str, intent: Intent) -> HandlerOutcome {
        let handler = FinanceHandler::new(Arc::new(HandlerServices {
            store: Arc::new(InMemoryLedgerStore::new()),
            signer: ConfirmationSigner::new(None),
            config: InterpreterConfig::default(),
        }));
        let command = ParsedCommand {
            intent,
            confidence: 0.9,
            entities: EntityExtractor::default().extract(text, intent, today()),
            raw_text: text.to_string(),
        };
        let request = HandlerRequest::new(Uuid::new_v4(), &command, &[], today(), Utc::now());
        handler.handle(&request).await.unwrap()
    }

    #[tokio::test]
    async fn test_expense_goes_straight_to_confirmation() {
        let outcome = run("gastei 50 reais com transporte", Intent::RegisterExpense).await;
        let response = outcome.response;

        assert!(response.is_type(ResponseType::Confirmation));
        let data = response.data.unwrap();
        assert_eq!(data["amount"], 50.0);
        assert_eq!(data["description"], "transporte");
    }

    #[tokio::test]
    async fn test_missing_amount_asks_and_keeps_entities() {
        let outcome = run("paguei a conta de luz", Intent::RegisterExpense).await;
        assert!(outcome.response.is_type(ResponseType::Question));
        assert_eq!(outcome.response.requires_input, Some(true));

        match outcome.update {
            ContextUpdate::Set(PendingState::AskAmount { intent, entities, .. }) => {
                assert_eq!(intent, Intent::RegisterExpense);
                assert_eq!(entities.category.as_deref(), Some("energia"));
            }
            other => panic!("unexpected update {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_future_income_is_scheduled() {
        let outcome = run("vou receber 500 mês que vem", Intent::RegisterIncome).await;
        let confirmation = outcome.response.confirmation_data.unwrap();

        match confirmation.action {
            PendingAction::Income(action) => {
                assert_eq!(action.amount, 500.0);
                assert!(matches!(action.plan, PaymentPlan::Single { scheduled: true, .. }));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recurring_expense_plan() {
        let outcome = run("paguei 1500 de aluguel todo mês", Intent::RegisterExpense).await;
        let confirmation = outcome.response.confirmation_data.unwrap();

        match confirmation.action {
            PendingAction::Expense(action) => {
                assert_eq!(action.category, "aluguel");
                assert!(matches!(action.plan, PaymentPlan::Recurring { .. }));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }
}
