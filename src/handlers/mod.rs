//! Command handlers and registry
//!
//! One handler per family of intents. A handler never writes to the ledger:
//! mutating intents return a signed proposal, read-only intents answer
//! directly. Each outcome also says how the session's pending context
//! changes.

pub mod analytics;
pub mod finance;
pub mod help;
pub mod inventory;
pub mod sale;
pub mod tasks;

use crate::audit::ConfirmationSigner;
use crate::config::InterpreterConfig;
use crate::context::{ContextUpdate, PendingState};
use crate::extraction::split_installments;
use crate::models::{
    BotResponse, Entities, InstallmentInterval, Intent, ParsedCommand, PaymentPlan, PendingAction,
    Product,
};
use crate::store::LedgerStore;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Everything a handler may look at for one turn
pub struct HandlerRequest<'a> {
    pub user_id: Uuid,
    pub command: &'a ParsedCommand,
    pub products: &'a [Product],
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
    /// Product already chosen in a follow-up turn; skips matching
    pub resolved_product: Option<&'a Product>,
    /// Card fee answered in a follow-up turn; `Some(0.0)` means no fee
    pub fee_override: Option<f64>,
}

impl<'a> HandlerRequest<'a> {
    pub fn new(
        user_id: Uuid,
        command: &'a ParsedCommand,
        products: &'a [Product],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            command,
            products,
            today,
            now,
            resolved_product: None,
            fee_override: None,
        }
    }

    pub fn with_product(mut self, product: &'a Product) -> Self {
        self.resolved_product = Some(product);
        self
    }

    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee_override = Some(fee);
        self
    }

    pub fn entities(&self) -> &Entities {
        &self.command.entities
    }
}

#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    pub response: BotResponse,
    pub update: ContextUpdate,
}

impl HandlerOutcome {
    /// Final answer; any pending context is dropped
    pub fn reply(response: BotResponse) -> Self {
        Self {
            response,
            update: ContextUpdate::Clear,
        }
    }

    /// Answer that waits for the user's next message
    pub fn awaiting(response: BotResponse, state: PendingState) -> Self {
        Self {
            response,
            update: ContextUpdate::Set(state),
        }
    }
}

/// Shared collaborators handed to every handler
pub struct HandlerServices {
    pub store: Arc<dyn LedgerStore>,
    pub signer: ConfirmationSigner,
    pub config: InterpreterConfig,
}

impl HandlerServices {
    /// Sign an action and turn it into a confirmation request
    pub fn propose(
        &self,
        request: &HandlerRequest<'_>,
        action: PendingAction,
        message: String,
        data: serde_json::Value,
    ) -> HandlerOutcome {
        let confirmation = self.signer.seal(request.user_id, action, request.now);
        let response = BotResponse::confirmation(message, confirmation.clone())
            .with_data(data)
            .with_suggestions(vec!["sim", "não"]);

        HandlerOutcome::awaiting(response, PendingState::ConfirmAction { confirmation })
    }
}

/// Trait for a command handler
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Intents routed to this handler
    fn intents(&self) -> &'static [Intent];

    async fn handle(&self, request: &HandlerRequest<'_>) -> Result<HandlerOutcome>;
}

/// Intent → handler lookup
pub struct HandlerRegistry {
    handlers: HashMap<Intent, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        for intent in handler.intents() {
            self.handlers.insert(*intent, handler.clone());
        }
    }

    pub fn get(&self, intent: Intent) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&intent).cloned()
    }

    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.values().map(|h| h.name()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with every built-in handler
pub fn create_default_registry(services: Arc<HandlerServices>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    registry.register(Arc::new(sale::SaleHandler::new(services.clone())));
    registry.register(Arc::new(finance::FinanceHandler::new(services.clone())));
    registry.register(Arc::new(inventory::RestockHandler::new(services.clone())));
    registry.register(Arc::new(inventory::StockHandler::new(services.clone())));
    registry.register(Arc::new(inventory::CatalogHandler::new(services.clone())));
    registry.register(Arc::new(analytics::AnalyticsHandler::new(services.clone())));
    registry.register(Arc::new(tasks::TaskHandler::new(services)));
    registry.register(Arc::new(help::HelpHandler));

    registry
}

/// Pick the write pattern for a financial command. Installments win over
/// recurrence, recurrence over a scheduled single payment.
pub fn payment_plan(entities: &Entities, total: f64, today: NaiveDate) -> PaymentPlan {
    if entities.is_installment {
        if let Some(count) = entities.installment_count.filter(|c| *c >= 2) {
            return PaymentPlan::Installments {
                count,
                interval: entities
                    .installment_interval
                    .unwrap_or(InstallmentInterval::Monthly),
                base_date: entities.date.unwrap_or(today),
                amounts: split_installments(total, count),
            };
        }
    }

    if entities.is_recurring {
        if let Some(interval) = entities.recurring_interval {
            return PaymentPlan::Recurring {
                interval,
                end_date: entities.recurring_end_date,
            };
        }
    }

    PaymentPlan::Single {
        scheduled: entities.payment_scheduled,
        payment_date: entities.payment_date,
    }
}

/// Human description of a plan for confirmation prompts
pub fn describe_plan(plan: &PaymentPlan) -> String {
    use crate::extraction::format_brl;

    match plan {
        PaymentPlan::Single {
            scheduled: true,
            payment_date: Some(date),
        } => format!(" Pagamento previsto para {}.", date.format("%d/%m/%Y")),
        PaymentPlan::Single { .. } => String::new(),
        PaymentPlan::Installments {
            count,
            interval,
            amounts,
            ..
        } => {
            let first = amounts.first().copied().unwrap_or_default();
            format!(" Em {}x {} de {}.", count, interval.label(), format_brl(first))
        }
        PaymentPlan::Recurring { interval, end_date } => match end_date {
            Some(end) => format!(
                " Recorrência {} até {}.",
                interval.label(),
                end.format("%d/%m/%Y")
            ),
            None => format!(" Recorrência {}.", interval.label()),
        },
    }
}

/// Numbered product list ("1. Colar - R$ 50,00")
pub fn numbered_products(products: &[&Product]) -> String {
    use crate::extraction::format_brl;

    products
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {} - {}", i + 1, p.name, format_brl(p.price)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Disambiguation question for several matching products
pub fn select_product(candidates: Vec<&Product>, command: &ParsedCommand) -> HandlerOutcome {
    let list = numbered_products(&candidates);
    let suggestions: Vec<String> = (1..=candidates.len()).map(|n| n.to_string()).collect();
    let response = BotResponse::question(format!(
        "Encontrei mais de um produto. Qual deles?\n{}",
        list
    ))
    .with_suggestions(suggestions);

    HandlerOutcome::awaiting(
        response,
        PendingState::SelectProduct {
            candidates: candidates.into_iter().cloned().collect(),
            command: command.clone(),
        },
    )
}

/// Offer the catalog when nothing matched
pub fn offer_catalog(fragment: &str) -> HandlerOutcome {
    let response = BotResponse::question(format!(
        "Não encontrei \"{}\" nos seus produtos. Quer ver a lista de produtos?",
        fragment
    ))
    .with_suggestions(vec!["sim", "não"]);

    HandlerOutcome::awaiting(response, PendingState::ListProducts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecurringInterval;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    #[test]
    fn test_installments_take_precedence_over_recurrence() {
        let entities = Entities {
            is_installment: true,
            installment_count: Some(3),
            is_recurring: true,
            recurring_interval: Some(RecurringInterval::Monthly),
            ..Default::default()
        };

        match payment_plan(&entities, 100.0, today()) {
            PaymentPlan::Installments { count, amounts, .. } => {
                assert_eq!(count, 3);
                assert_eq!(amounts, vec![33.33, 33.33, 33.34]);
            }
            other => panic!("expected installments, got {:?}", other),
        }
    }

    #[test]
    fn test_scheduled_single_plan() {
        let due = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let entities = Entities {
            payment_scheduled: true,
            payment_date: Some(due),
            ..Default::default()
        };
        let plan = payment_plan(&entities, 60.0, today());
        assert_eq!(
            plan,
            PaymentPlan::Single {
                scheduled: true,
                payment_date: Some(due)
            }
        );
        assert!(describe_plan(&plan).contains("20/03/2025"));
    }

    #[test]
    fn test_registry_routes_every_known_intent() {
        let services = Arc::new(HandlerServices {
            store: Arc::new(crate::store::InMemoryLedgerStore::new()),
            signer: ConfirmationSigner::new(None),
            config: InterpreterConfig::default(),
        });
        let registry = create_default_registry(services);

        for intent in [
            Intent::SellProduct,
            Intent::BuyProduct,
            Intent::RegisterExpense,
            Intent::RegisterIncome,
            Intent::CheckStock,
            Intent::RestockProduct,
            Intent::ListProducts,
            Intent::SearchProduct,
            Intent::CalculateProfit,
            Intent::GenerateInsights,
            Intent::AnalyzeProducts,
            Intent::CheckRevenue,
            Intent::CheckExpenses,
            Intent::CreateTask,
            Intent::Help,
        ] {
            assert!(registry.get(intent).is_some(), "{}", intent);
        }
        assert!(registry.get(Intent::Unknown).is_none());
    }
}
