//! Revenue, expense, profit and product analytics
//!
//! Read-only: each intent resolves a date window from the sentence, pulls
//! the window's transactions from the ledger and summarizes them.

use super::{CommandHandler, HandlerOutcome, HandlerRequest, HandlerServices};
use crate::extraction::dates::month_end;
use crate::extraction::format_brl;
use crate::models::{round_cents, BotResponse, DateRange, Intent, Product, StoredTransaction, TransactionKind};
use crate::patterns::{
    normalize, PERIOD_LAST_MONTH, PERIOD_LAST_WEEK, PERIOD_TODAY, PERIOD_WEEK, PERIOD_YEAR,
    PERIOD_YESTERDAY,
};
use crate::Result;
use async_trait::async_trait;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const TOP_PRODUCTS: usize = 5;

/// Date window named in the sentence; the current month by default
pub fn resolve_period(text: &str, today: NaiveDate) -> DateRange {
    let text = normalize(text);
    let range = |start: NaiveDate, end: NaiveDate, label: &str| DateRange {
        start,
        end,
        label: label.to_string(),
    };
    let week_start = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
    let month_start = today.with_day(1).unwrap_or(today);

    if PERIOD_TODAY.is_match(&text) {
        return range(today, today, "hoje");
    }
    if PERIOD_YESTERDAY.is_match(&text) {
        let yesterday = today - Days::new(1);
        return range(yesterday, yesterday, "ontem");
    }
    if PERIOD_LAST_WEEK.is_match(&text) {
        let start = week_start - Days::new(7);
        return range(start, week_start - Days::new(1), "na semana passada");
    }
    if PERIOD_WEEK.is_match(&text) {
        return range(week_start, today, "nesta semana");
    }
    if PERIOD_LAST_MONTH.is_match(&text) {
        let start = month_start.checked_sub_months(Months::new(1)).unwrap_or(month_start);
        let end = month_start - Days::new(1);
        return range(start, end, "no mês passado");
    }
    if PERIOD_YEAR.is_match(&text) {
        let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
        return range(start, today, "neste ano");
    }

    let end = month_end(today.year(), today.month()).unwrap_or(today);
    range(month_start, end, "neste mês")
}

/// Paid and pending totals of one transaction kind
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Totals {
    paid: f64,
    pending: f64,
    count: usize,
}

impl Totals {
    fn of(transactions: &[StoredTransaction], kind: TransactionKind) -> Self {
        transactions
            .iter()
            .filter(|t| t.record.kind == kind)
            .fold(Totals::default(), |mut acc, t| {
                if t.record.is_paid {
                    acc.paid += t.record.amount;
                } else {
                    acc.pending += t.record.amount;
                }
                acc.count += 1;
                acc
            })
    }

    fn total(&self) -> f64 {
        round_cents(self.paid + self.pending)
    }
}

fn by_category(transactions: &[StoredTransaction], kind: TransactionKind) -> Vec<(String, f64)> {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for t in transactions.iter().filter(|t| t.record.kind == kind) {
        *sums.entry(t.record.category.as_str()).or_default() += t.record.amount;
    }

    let mut ranked: Vec<(String, f64)> = sums
        .into_iter()
        .map(|(category, sum)| (category.to_string(), round_cents(sum)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

pub struct AnalyticsHandler {
    services: Arc<HandlerServices>,
}

impl AnalyticsHandler {
    pub fn new(services: Arc<HandlerServices>) -> Self {
        Self { services }
    }

    async fn load(&self, user_id: Uuid, range: &DateRange) -> Result<Vec<StoredTransaction>> {
        let transactions = self.services.store.list_transactions(user_id, range).await?;
        debug!(%user_id, count = transactions.len(), period = %range.label, "analytics window loaded");
        Ok(transactions)
    }

    fn revenue(&self, range: &DateRange, transactions: &[StoredTransaction]) -> BotResponse {
        let income = Totals::of(transactions, TransactionKind::Income);
        let mut message = format!(
            "Faturamento {}: {} em {} lançamento(s).",
            range.label,
            format_brl(income.paid),
            income.count
        );
        if income.pending > 0.0 {
            message.push_str(&format!(" A receber: {}.", format_brl(income.pending)));
        }

        BotResponse::info(message).with_data(json!({
            "period": range,
            "received": round_cents(income.paid),
            "pending": round_cents(income.pending),
            "count": income.count,
        }))
    }

    fn expenses(&self, range: &DateRange, transactions: &[StoredTransaction]) -> BotResponse {
        let expense = Totals::of(transactions, TransactionKind::Expense);
        let categories = by_category(transactions, TransactionKind::Expense);

        let mut message = format!("Despesas {}: {}.", range.label, format_brl(expense.total()));
        if expense.pending > 0.0 {
            message.push_str(&format!(" Ainda a pagar: {}.", format_brl(expense.pending)));
        }
        if let Some((category, sum)) = categories.first() {
            message.push_str(&format!(" Maior gasto: {} ({}).", category, format_brl(*sum)));
        }

        BotResponse::info(message).with_data(json!({
            "period": range,
            "total": expense.total(),
            "pending": round_cents(expense.pending),
            "byCategory": categories,
        }))
    }

    fn profit(&self, range: &DateRange, transactions: &[StoredTransaction]) -> BotResponse {
        let income = Totals::of(transactions, TransactionKind::Income).total();
        let expense = Totals::of(transactions, TransactionKind::Expense).total();
        let profit = round_cents(income - expense);

        let mut message = format!(
            "Lucro {}: {} (receitas {} - despesas {}).",
            range.label,
            format_brl(profit),
            format_brl(income),
            format_brl(expense)
        );
        let margin = if income > 0.0 {
            let margin = round_cents(profit / income * 100.0);
            message.push_str(&format!(" Margem de {}%.", margin));
            Some(margin)
        } else {
            None
        };

        BotResponse::info(message).with_data(json!({
            "period": range,
            "income": income,
            "expenses": expense,
            "profit": profit,
            "margin": margin,
        }))
    }

    fn low_stock<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let threshold = self.services.config.low_stock_threshold;
        products
            .iter()
            .filter(|p| p.stock_quantity <= threshold)
            .collect()
    }

    fn insights(
        &self,
        range: &DateRange,
        transactions: &[StoredTransaction],
        products: &[Product],
    ) -> BotResponse {
        let income = Totals::of(transactions, TransactionKind::Income);
        let expense = Totals::of(transactions, TransactionKind::Expense);
        let profit = income.total() - expense.total();
        let mut tips = Vec::new();

        if transactions.is_empty() {
            tips.push("Ainda não há lançamentos neste período. Registre suas vendas e despesas para eu acompanhar o seu caixa.".to_string());
        } else if profit < 0.0 {
            tips.push(format!(
                "Suas despesas superaram as receitas em {}. Revise os maiores gastos.",
                format_brl(-profit)
            ));
        } else {
            tips.push(format!("Você está no positivo em {}.", format_brl(profit)));
        }

        if let Some((category, sum)) = by_category(transactions, TransactionKind::Expense).first() {
            if expense.total() > 0.0 && *sum / expense.total() > 0.4 {
                tips.push(format!(
                    "A categoria {} concentra {} das despesas.",
                    category,
                    format_brl(*sum)
                ));
            }
        }

        if income.pending > 0.0 {
            tips.push(format!(
                "Há {} a receber. Lembre os clientes das datas de pagamento.",
                format_brl(income.pending)
            ));
        }

        let low = self.low_stock(products);
        if !low.is_empty() {
            let names: Vec<&str> = low.iter().map(|p| p.name.as_str()).collect();
            tips.push(format!("Reponha o estoque de: {}.", names.join(", ")));
        }

        let message = format!(
            "Dicas para o seu negócio ({}):\n{}",
            range.label,
            tips.iter()
                .map(|t| format!("- {}", t))
                .collect::<Vec<_>>()
                .join("\n")
        );
        BotResponse::info(message).with_data(json!({ "period": range, "tips": tips }))
    }

    fn products(
        &self,
        range: &DateRange,
        transactions: &[StoredTransaction],
        products: &[Product],
    ) -> BotResponse {
        let mut sold: HashMap<Uuid, (u32, f64)> = HashMap::new();
        for t in transactions
            .iter()
            .filter(|t| t.record.kind == TransactionKind::Income)
        {
            let Some(product_id) = t.record.product_id else {
                continue;
            };
            let entry = sold.entry(product_id).or_default();
            // Installment parcels repeat the quantity; count it once
            if t.record.installment_number.unwrap_or(1) == 1 {
                entry.0 += t.record.quantity.unwrap_or(1);
            }
            entry.1 += t.record.amount;
        }

        let mut ranked: Vec<(&str, u32, f64)> = sold
            .iter()
            .map(|(id, (units, revenue))| {
                let name = products
                    .iter()
                    .find(|p| p.id == *id)
                    .map(|p| p.name.as_str())
                    .unwrap_or("produto removido");
                (name, *units, round_cents(*revenue))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal)));
        ranked.truncate(TOP_PRODUCTS);

        let mut message = if ranked.is_empty() {
            format!("Nenhuma venda de produto registrada {}.", range.label)
        } else {
            let lines: Vec<String> = ranked
                .iter()
                .enumerate()
                .map(|(i, (name, units, revenue))| {
                    format!("{}. {} - {} unidade(s), {}", i + 1, name, units, format_brl(*revenue))
                })
                .collect();
            format!("Produtos mais vendidos {}:\n{}", range.label, lines.join("\n"))
        };

        let low = self.low_stock(products);
        if !low.is_empty() {
            let names: Vec<String> = low
                .iter()
                .map(|p| format!("{} ({})", p.name, p.stock_quantity))
                .collect();
            message.push_str(&format!("\nAcabando: {}.", names.join(", ")));
        }

        BotResponse::info(message).with_data(json!({
            "period": range,
            "topProducts": ranked
                .iter()
                .map(|(name, units, revenue)| json!({ "name": name, "units": units, "revenue": revenue }))
                .collect::<Vec<_>>(),
            "lowStock": low.iter().map(|p| &p.name).collect::<Vec<_>>(),
        }))
    }
}

#[async_trait]
impl CommandHandler for AnalyticsHandler {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn intents(&self) -> &'static [Intent] {
        &[
            Intent::CheckRevenue,
            Intent::CheckExpenses,
            Intent::CalculateProfit,
            Intent::GenerateInsights,
            Intent::AnalyzeProducts,
        ]
    }

    async fn handle(&self, request: &HandlerRequest<'_>) -> Result<HandlerOutcome> {
        let range = resolve_period(&request.command.raw_text, request.today);
        let transactions = self.load(request.user_id, &range).await?;

        let response = match request.command.intent {
            Intent::CheckRevenue => self.revenue(&range, &transactions),
            Intent::CheckExpenses => self.expenses(&range, &transactions),
            Intent::CalculateProfit => self.profit(&range, &transactions),
            Intent::GenerateInsights => self.insights(&range, &transactions, request.products),
            _ => self.products(&range, &transactions, request.products),
        };
        Ok(HandlerOutcome::reply(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::ConfirmationSigner;
    use crate::config::InterpreterConfig;
    use crate::models::{NewTransaction, ParsedCommand, Entities};
    use crate::store::{InMemoryLedgerStore, LedgerStore};
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_periods() {
        let week = resolve_period("quanto vendi esta semana", today());
        assert_eq!(week.start, day(3, 10));
        assert_eq!(week.end, today());

        let last_month = resolve_period("lucro do mês passado", today());
        assert_eq!(last_month.start, day(2, 1));
        assert_eq!(last_month.end, day(2, 28));

        let last_week = resolve_period("despesas da semana passada", today());
        assert_eq!(last_week.start, day(3, 3));
        assert_eq!(last_week.end, day(3, 9));

        let default = resolve_period("qual meu lucro", today());
        assert_eq!(default.start, day(3, 1));
        assert_eq!(default.end, day(3, 31));
    }

    async fn seeded() -> (Arc<InMemoryLedgerStore>, Uuid, Product) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let user = Uuid::new_v4();
        let colar = Product::new("Colar", 100.0, 2);
        store.seed_product(user, colar.clone()).await;

        let mut sale = NewTransaction::new(user, TransactionKind::Income, 300.0, day(3, 5), "Venda: Colar", "vendas");
        sale.product_id = Some(colar.id);
        sale.quantity = Some(3);
        store.create_transaction(sale).await.unwrap();

        let mut pending = NewTransaction::new(user, TransactionKind::Income, 100.0, day(3, 20), "Venda", "vendas");
        pending.is_paid = false;
        store.create_transaction(pending).await.unwrap();

        let rent = NewTransaction::new(user, TransactionKind::Expense, 150.0, day(3, 1), "aluguel", "aluguel");
        store.create_transaction(rent).await.unwrap();

        let old = NewTransaction::new(user, TransactionKind::Expense, 999.0, day(2, 10), "antigo", "outros");
        store.create_transaction(old).await.unwrap();

        (store, user, colar)
    }

    async fn ask(store: Arc<InMemoryLedgerStore>, user: Uuid, products: &[Product], text: &str, intent: Intent) -> BotResponse {
        let handler = AnalyticsHandler::new(Arc::new(HandlerServices {
            store,
            signer: ConfirmationSigner::new(None),
            config: InterpreterConfig::default(),
        }));
        let command = ParsedCommand {
            intent,
            confidence: 0.9,
            entities: Entities::default(),
            raw_text: text.to_string(),
        };
        let request = HandlerRequest::new(user, &command, products, today(), Utc::now());
        handler.handle(&request).await.unwrap().response
    }

    #[tokio::test]
    async fn test_revenue_splits_received_and_pending() {
        let (store, user, colar) = seeded().await;
        let response = ask(store, user, &[colar], "faturamento do mês", Intent::CheckRevenue).await;
        let data = response.data.unwrap();
        assert_eq!(data["received"], 300.0);
        assert_eq!(data["pending"], 100.0);
    }

    #[tokio::test]
    async fn test_profit_for_current_month() {
        let (store, user, colar) = seeded().await;
        let response = ask(store, user, &[colar], "qual meu lucro este mês?", Intent::CalculateProfit).await;
        let data = response.data.unwrap();
        assert_eq!(data["profit"], 250.0);
        assert!(response.message.contains("R$ 250,00"));
    }

    #[tokio::test]
    async fn test_product_ranking_and_low_stock() {
        let (store, user, colar) = seeded().await;
        let response = ask(store, user, &[colar], "produtos mais vendidos", Intent::AnalyzeProducts).await;
        assert!(response.message.contains("1. Colar - 3 unidade(s)"));
        assert!(response.message.contains("Acabando: Colar (2)"));
    }

    #[tokio::test]
    async fn test_insights_mention_receivables() {
        let (store, user, colar) = seeded().await;
        let response = ask(store, user, &[colar], "me dê dicas", Intent::GenerateInsights).await;
        assert!(response.message.contains("a receber"));
    }

    #[tokio::test]
    async fn test_expenses_without_data() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let response = ask(store, Uuid::new_v4(), &[], "quanto gastei hoje", Intent::CheckExpenses).await;
        assert!(response.message.starts_with("Despesas hoje: R$ 0,00"));
    }
}
