//! Sale proposals

use super::{
    describe_plan, offer_catalog, payment_plan, select_product, CommandHandler, HandlerOutcome,
    HandlerRequest, HandlerServices,
};
use crate::context::PendingState;
use crate::extraction::format_brl;
use crate::matcher::{MatchOutcome, ProductMatcher};
use crate::models::{round_cents, BotResponse, Intent, PendingAction, Product, SaleAction};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub struct SaleHandler {
    services: Arc<HandlerServices>,
}

impl SaleHandler {
    pub fn new(services: Arc<HandlerServices>) -> Self {
        Self { services }
    }

    fn propose_sale(&self, request: &HandlerRequest<'_>, product: &Product) -> HandlerOutcome {
        let command = request.command;
        let entities = request.entities();
        let quantity = entities.quantity.unwrap_or(1).max(1);

        if product.stock_quantity < i64::from(quantity) {
            return HandlerOutcome::reply(BotResponse::error(format!(
                "Estoque insuficiente de {}: você tem {} unidade(s) e a venda pede {}.",
                product.name, product.stock_quantity, quantity
            )));
        }

        let total = round_cents(
            entities
                .amount
                .unwrap_or(product.price * f64::from(quantity)),
        );
        if total <= 0.0 {
            let response = BotResponse::question(format!(
                "Qual foi o valor da venda de {}?",
                product.name
            ));
            return HandlerOutcome::awaiting(
                response,
                PendingState::AskAmount {
                    intent: Intent::SellProduct,
                    raw_text: command.raw_text.clone(),
                    entities: entities.clone(),
                },
            );
        }

        let fee = request.fee_override.or(entities.fee_percentage);
        let paid_by_card = entities.payment_method.map(|m| m.is_card()).unwrap_or(false);
        if paid_by_card && fee.is_none() {
            let response = BotResponse::question(
                "A venda foi no cartão. A maquininha cobrou alguma taxa?",
            )
            .with_suggestions(vec!["sim", "não"]);
            return HandlerOutcome::awaiting(
                response,
                PendingState::FeeQuestion {
                    command: command.clone(),
                    product: product.clone(),
                },
            );
        }

        let today = request.today;
        let plan = payment_plan(entities, total, today);
        let sale = SaleAction {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: round_cents(total / f64::from(quantity)),
            total_amount: total,
            date: entities.date.unwrap_or(today),
            plan,
            payment_method: entities.payment_method,
            fee_percentage: fee,
            description: format!("Venda: {}", product.name),
            category: "vendas".to_string(),
        };

        let mut message = format!(
            "Confirma a venda de {}x {} por {}?",
            quantity,
            product.name,
            format_brl(total)
        );
        if sale.has_card_fee() {
            message.push_str(&format!(
                " Com a taxa de {}% você recebe {}.",
                fee.unwrap_or_default(),
                format_brl(sale.net_amount())
            ));
        } else {
            message.push_str(&describe_plan(&sale.plan));
        }

        let data = json!({
            "productId": product.id,
            "productName": product.name,
            "quantity": quantity,
            "unitPrice": sale.unit_price,
            "totalAmount": total,
            "netAmount": sale.net_amount(),
            "plan": sale.plan,
        });

        debug!(product = %product.name, quantity, total, "sale proposed");
        self.services
            .propose(request, PendingAction::Sale(sale), message, data)
    }
}

#[async_trait]
impl CommandHandler for SaleHandler {
    fn name(&self) -> &'static str {
        "sale"
    }

    fn intents(&self) -> &'static [Intent] {
        &[Intent::SellProduct]
    }

    async fn handle(&self, request: &HandlerRequest<'_>) -> Result<HandlerOutcome> {
        if let Some(product) = request.resolved_product {
            return Ok(self.propose_sale(request, product));
        }

        let fragment = request
            .entities()
            .product_name
            .clone()
            .unwrap_or_default();

        let outcome = match ProductMatcher::resolve(request.products, &fragment) {
            MatchOutcome::NotFound => offer_catalog(&fragment),
            MatchOutcome::Unique(product) => self.propose_sale(request, product),
            MatchOutcome::Ambiguous(candidates) => select_product(candidates, request.command),
        };
        Ok(outcome)
    }
}
