//! Stock entries, stock queries and catalog listings

use super::{
    numbered_products, offer_catalog, select_product, CommandHandler, HandlerOutcome,
    HandlerRequest, HandlerServices,
};
use crate::context::PendingState;
use crate::extraction::format_brl;
use crate::matcher::{MatchOutcome, ProductMatcher};
use crate::models::{BotResponse, Intent, PendingAction, Product, RestockAction};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

//
// ================= Restock / Buy =================
//

/// "comprei 10 unidades do colar", "repor 5 anéis"
pub struct RestockHandler {
    services: Arc<HandlerServices>,
}

impl RestockHandler {
    pub fn new(services: Arc<HandlerServices>) -> Self {
        Self { services }
    }

    fn propose_restock(&self, request: &HandlerRequest<'_>, product: &Product) -> HandlerOutcome {
        let Some(quantity) = request.entities().quantity.filter(|q| *q > 0) else {
            return HandlerOutcome::awaiting(
                BotResponse::question(format!(
                    "Quantas unidades de {} entraram no estoque?",
                    product.name
                ))
                .with_suggestions(vec!["5", "10", "20"]),
                PendingState::AskQuantity {
                    command: request.command.clone(),
                    product: product.clone(),
                },
            );
        };

        let new_stock = product.stock_quantity + i64::from(quantity);
        let message = format!(
            "Confirma a entrada de {} unidade(s) de {}? O estoque passará de {} para {}.",
            quantity, product.name, product.stock_quantity, new_stock
        );
        let data = json!({
            "productId": product.id,
            "productName": product.name,
            "quantity": quantity,
            "currentStock": product.stock_quantity,
            "newStock": new_stock,
        });

        let action = PendingAction::Restock(RestockAction {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
        });
        self.services.propose(request, action, message, data)
    }
}

#[async_trait]
impl CommandHandler for RestockHandler {
    fn name(&self) -> &'static str {
        "restock"
    }

    fn intents(&self) -> &'static [Intent] {
        &[Intent::BuyProduct, Intent::RestockProduct]
    }

    async fn handle(&self, request: &HandlerRequest<'_>) -> Result<HandlerOutcome> {
        if let Some(product) = request.resolved_product {
            return Ok(self.propose_restock(request, product));
        }

        let Some(fragment) = request.entities().product_name.clone() else {
            let intent = request.command.intent;
            let (question, lead) = if intent == Intent::BuyProduct {
                (
                    "O que você comprou? Se foi produto para revender, diga a quantidade \
                     (\"10 unidades do colar\"). Se foi uma despesa, diga o valor \
                     (\"200 reais de material\").",
                    "comprei",
                )
            } else {
                (
                    "Qual produto você quer repor? Exemplo: \"10 unidades do colar\".",
                    "repor",
                )
            };
            return Ok(HandlerOutcome::awaiting(
                BotResponse::question(question),
                PendingState::AskDetail {
                    intent,
                    lead: lead.to_string(),
                },
            ));
        };

        let outcome = match ProductMatcher::resolve(request.products, &fragment) {
            MatchOutcome::NotFound => offer_catalog(&fragment),
            MatchOutcome::Unique(product) => self.propose_restock(request, product),
            MatchOutcome::Ambiguous(candidates) => select_product(candidates, request.command),
        };
        Ok(outcome)
    }
}

//
// ================= Stock queries =================
//

/// "quantos colares eu tenho?", "como está o estoque"
pub struct StockHandler {
    services: Arc<HandlerServices>,
}

impl StockHandler {
    pub fn new(services: Arc<HandlerServices>) -> Self {
        Self { services }
    }

    fn summary(&self, products: &[Product]) -> BotResponse {
        if products.is_empty() {
            return BotResponse::info("Você ainda não tem produtos cadastrados.");
        }

        let threshold = self.services.config.low_stock_threshold;
        let total_units: i64 = products.iter().map(|p| p.stock_quantity.max(0)).sum();
        let stock_value: f64 = products
            .iter()
            .map(|p| p.price * p.stock_quantity.max(0) as f64)
            .sum();
        let low: Vec<&Product> = products
            .iter()
            .filter(|p| p.stock_quantity <= threshold)
            .collect();

        let mut message = format!(
            "Você tem {} produto(s) e {} unidade(s) em estoque, somando {} em preço de venda.",
            products.len(),
            total_units,
            format_brl(stock_value)
        );
        if !low.is_empty() {
            let names: Vec<String> = low
                .iter()
                .map(|p| format!("{} ({})", p.name, p.stock_quantity))
                .collect();
            message.push_str(&format!("\nEstoque baixo: {}.", names.join(", ")));
        }

        BotResponse::info(message).with_data(json!({
            "productCount": products.len(),
            "totalUnits": total_units,
            "stockValue": stock_value,
            "lowStock": low.iter().map(|p| &p.name).collect::<Vec<_>>(),
        }))
    }
}

#[async_trait]
impl CommandHandler for StockHandler {
    fn name(&self) -> &'static str {
        "stock"
    }

    fn intents(&self) -> &'static [Intent] {
        &[Intent::CheckStock]
    }

    async fn handle(&self, request: &HandlerRequest<'_>) -> Result<HandlerOutcome> {
        let Some(fragment) = request.entities().product_name.clone() else {
            return Ok(HandlerOutcome::reply(self.summary(request.products)));
        };

        let matches = ProductMatcher::find_matches(request.products, &fragment);
        if matches.is_empty() {
            return Ok(offer_catalog(&fragment));
        }

        let lines: Vec<String> = matches
            .iter()
            .map(|p| format!("{}: {} unidade(s)", p.name, p.stock_quantity))
            .collect();
        let data = json!({
            "products": matches
                .iter()
                .map(|p| json!({ "id": p.id, "name": p.name, "stockQuantity": p.stock_quantity }))
                .collect::<Vec<_>>(),
        });

        Ok(HandlerOutcome::reply(
            BotResponse::info(lines.join("\n")).with_data(data),
        ))
    }
}

//
// ================= Catalog =================
//

/// "listar produtos", "buscar anel"
pub struct CatalogHandler {
    services: Arc<HandlerServices>,
}

impl CatalogHandler {
    pub fn new(services: Arc<HandlerServices>) -> Self {
        Self { services }
    }

    /// Catalog listing, shared with the "quer ver a lista?" follow-up
    pub fn list(&self, products: &[Product]) -> BotResponse {
        if products.is_empty() {
            return BotResponse::info("Você ainda não tem produtos cadastrados.");
        }

        let limit = self.services.config.max_listed_products;
        let shown: Vec<&Product> = products.iter().take(limit).collect();
        let mut message = format!("Seus produtos:\n{}", listing(&shown));
        if products.len() > limit {
            message.push_str(&format!("\n... e mais {} produto(s).", products.len() - limit));
        }

        BotResponse::info(message).with_data(json!({ "total": products.len() }))
    }
}

fn listing(products: &[&Product]) -> String {
    products
        .iter()
        .map(|p| {
            format!(
                "- {} - {} ({} em estoque)",
                p.name,
                format_brl(p.price),
                p.stock_quantity
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl CommandHandler for CatalogHandler {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn intents(&self) -> &'static [Intent] {
        &[Intent::ListProducts, Intent::SearchProduct]
    }

    async fn handle(&self, request: &HandlerRequest<'_>) -> Result<HandlerOutcome> {
        if request.command.intent == Intent::ListProducts {
            return Ok(HandlerOutcome::reply(self.list(request.products)));
        }

        let Some(fragment) = request.entities().product_name.clone() else {
            return Ok(HandlerOutcome::awaiting(
                BotResponse::question("Qual produto você procura? Exemplo: \"anel\"."),
                PendingState::AskDetail {
                    intent: Intent::SearchProduct,
                    lead: "buscar".to_string(),
                },
            ));
        };

        let found = ProductMatcher::find_matches(request.products, &fragment);
        let response = if found.is_empty() {
            BotResponse::info(format!("Nenhum produto encontrado para \"{}\".", fragment))
                .with_suggestions(vec!["listar produtos"])
        } else {
            BotResponse::info(format!(
                "Encontrei {} produto(s):\n{}",
                found.len(),
                numbered_products(&found)
            ))
            .with_data(json!({ "count": found.len() }))
        };
        Ok(HandlerOutcome::reply(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::ConfirmationSigner;
    use crate::config::InterpreterConfig;
    use crate::context::ContextUpdate;
    use crate::extraction::EntityExtractor;
    use crate::models::{ParsedCommand, ResponseType};
    use crate::store::InMemoryLedgerStore;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn services() -> Arc<HandlerServices> {
        Arc::new(HandlerServices {
            store: Arc::new(InMemoryLedgerStore::new()),
            signer: ConfirmationSigner::new(None),
            config: InterpreterConfig::default(),
        })
    }

    fn catalog() -> Vec<Product> {
        vec![
            Product::new("Colar de Pérolas", 120.0, 500),
            Product::new("Anel de Prata", 60.0, 2),
        ]
    }

    async fn run(handler: &dyn CommandHandler, text: &str, intent: Intent) -> HandlerOutcome {
        let command = ParsedCommand {
            intent,
            confidence: 0.9,
            entities: EntityExtractor::default().extract(text, intent, today()),
            raw_text: text.to_string(),
        };
        let products = catalog();
        let request = HandlerRequest::new(Uuid::new_v4(), &command, &products, today(), Utc::now());
        handler.handle(&request).await.unwrap()
    }

    #[tokio::test]
    async fn test_bare_purchase_asks_what_was_bought() {
        let handler = RestockHandler::new(services());
        let outcome = run(&handler, "comprei", Intent::BuyProduct).await;
        assert!(outcome.response.is_type(ResponseType::Question));
        assert_eq!(
            outcome.update,
            ContextUpdate::Set(PendingState::AskDetail {
                intent: Intent::BuyProduct,
                lead: "comprei".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_restock_proposal() {
        let handler = RestockHandler::new(services());
        let outcome = run(&handler, "repor 10 unidades do anel", Intent::RestockProduct).await;
        assert!(outcome.response.is_type(ResponseType::Confirmation));
        assert_eq!(outcome.response.data.unwrap()["newStock"], 12);
    }

    #[tokio::test]
    async fn test_restock_without_quantity_asks() {
        let handler = RestockHandler::new(services());
        let outcome = run(&handler, "repor o anel", Intent::RestockProduct).await;
        assert!(outcome.response.is_type(ResponseType::Question));
        assert!(matches!(
            outcome.update,
            ContextUpdate::Set(PendingState::AskQuantity { ref product, .. }) if product.name == "Anel de Prata"
        ));
    }

    #[tokio::test]
    async fn test_stock_for_named_product() {
        let handler = StockHandler::new(services());
        let outcome = run(&handler, "quantos anéis eu tenho?", Intent::CheckStock).await;
        assert!(outcome.response.is_type(ResponseType::Info));
        assert!(outcome.response.message.contains("Anel de Prata: 2"));
    }

    #[tokio::test]
    async fn test_stock_summary_flags_low_stock() {
        let handler = StockHandler::new(services());
        let outcome = run(&handler, "como está o estoque", Intent::CheckStock).await;
        assert!(outcome.response.message.contains("Estoque baixo: Anel de Prata (2)"));
    }

    #[tokio::test]
    async fn test_unknown_stock_product_offers_list() {
        let handler = StockHandler::new(services());
        let outcome = run(&handler, "quantas bolsas eu tenho", Intent::CheckStock).await;
        assert_eq!(outcome.update, ContextUpdate::Set(PendingState::ListProducts));
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let handler = CatalogHandler::new(services());
        let listed = run(&handler, "listar produtos", Intent::ListProducts).await;
        assert!(listed.response.message.contains("Colar de Pérolas"));

        let searched = run(&handler, "buscar anel", Intent::SearchProduct).await;
        assert!(searched.response.message.contains("1. Anel de Prata"));
    }
}
