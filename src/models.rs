//! Core data models for the command interpreter

use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SellProduct,
    BuyProduct,
    RegisterExpense,
    RegisterIncome,
    CheckStock,
    RestockProduct,
    ListProducts,
    SearchProduct,
    CalculateProfit,
    GenerateInsights,
    AnalyzeProducts,
    CheckRevenue,
    CheckExpenses,
    CreateTask,
    Help,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::SellProduct => "sell_product",
            Intent::BuyProduct => "buy_product",
            Intent::RegisterExpense => "register_expense",
            Intent::RegisterIncome => "register_income",
            Intent::CheckStock => "check_stock",
            Intent::RestockProduct => "restock_product",
            Intent::ListProducts => "list_products",
            Intent::SearchProduct => "search_product",
            Intent::CalculateProfit => "calculate_profit",
            Intent::GenerateInsights => "generate_insights",
            Intent::AnalyzeProducts => "analyze_products",
            Intent::CheckRevenue => "check_revenue",
            Intent::CheckExpenses => "check_expenses",
            Intent::CreateTask => "create_task",
            Intent::Help => "help",
            Intent::Unknown => "unknown",
        }
    }

    /// Intents whose sentences carry dates and product references
    pub fn is_transactional(&self) -> bool {
        matches!(
            self,
            Intent::SellProduct
                | Intent::BuyProduct
                | Intent::RegisterExpense
                | Intent::RegisterIncome
                | Intent::RestockProduct
        )
    }

    /// Intents where a bare number in the sentence is likely money
    pub fn is_financial(&self) -> bool {
        matches!(
            self,
            Intent::SellProduct
                | Intent::BuyProduct
                | Intent::RegisterExpense
                | Intent::RegisterIncome
        )
    }

    /// Intents that may be paid or received at a later date
    pub fn schedules_payment(&self) -> bool {
        matches!(
            self,
            Intent::SellProduct | Intent::RegisterExpense | Intent::RegisterIncome
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Schedules =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentInterval {
    Weekly,
    Monthly,
    Quarterly,
}

impl InstallmentInterval {
    pub fn label(&self) -> &'static str {
        match self {
            InstallmentInterval::Weekly => "semanal",
            InstallmentInterval::Monthly => "mensal",
            InstallmentInterval::Quarterly => "trimestral",
        }
    }

    /// Date of the `n`-th step after `base` (n = 0 is `base` itself)
    pub fn advance(&self, base: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            InstallmentInterval::Weekly => base.checked_add_days(Days::new(7 * n as u64)),
            InstallmentInterval::Monthly => base.checked_add_months(Months::new(n)),
            InstallmentInterval::Quarterly => base.checked_add_months(Months::new(3 * n)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "every", rename_all = "snake_case")]
pub enum RecurringInterval {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    EveryWeeks(u32),
    EveryMonths(u32),
}

impl RecurringInterval {
    pub fn from_weeks(n: u32) -> Self {
        match n {
            1 => RecurringInterval::Weekly,
            _ => RecurringInterval::EveryWeeks(n),
        }
    }

    pub fn from_months(n: u32) -> Self {
        match n {
            1 => RecurringInterval::Monthly,
            3 => RecurringInterval::Quarterly,
            12 => RecurringInterval::Yearly,
            _ => RecurringInterval::EveryMonths(n),
        }
    }

    pub fn label(&self) -> String {
        match self {
            RecurringInterval::Weekly => "semanal".to_string(),
            RecurringInterval::Monthly => "mensal".to_string(),
            RecurringInterval::Quarterly => "trimestral".to_string(),
            RecurringInterval::Yearly => "anual".to_string(),
            RecurringInterval::EveryWeeks(n) => format!("a cada {} semanas", n),
            RecurringInterval::EveryMonths(n) => format!("a cada {} meses", n),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Dinheiro,
    Pix,
    Debito,
    Credito,
    Cartao,
}

impl PaymentMethod {
    pub fn is_card(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Debito | PaymentMethod::Credito | PaymentMethod::Cartao
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Dinheiro => "dinheiro",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Debito => "cartão de débito",
            PaymentMethod::Credito => "cartão de crédito",
            PaymentMethod::Cartao => "cartão",
        }
    }
}

//
// ================= Parsed Command =================
//

/// Everything the extractor pulled out of one utterance.
///
/// Built once per command and never written back by handlers; follow-up
/// turns derive a new record (see [`Entities::with_amount`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Total value of the command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub payment_scheduled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_installment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_interval: Option<InstallmentInterval>,
    /// Per-parcel value when the phrase was "Nx de V"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_value: Option<f64>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_interval: Option<RecurringInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_percentage: Option<f64>,
}

impl Entities {
    /// New record with the amount filled in by a follow-up answer
    pub fn with_amount(&self, amount: f64) -> Self {
        Self {
            amount: Some(amount),
            ..self.clone()
        }
    }

    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity: Some(quantity),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCommand {
    pub intent: Intent,
    pub confidence: f32,
    pub entities: Entities,
    pub raw_text: String,
}

impl ParsedCommand {
    pub fn with_entities(&self, entities: Entities) -> Self {
        Self {
            intent: self.intent,
            confidence: self.confidence,
            entities,
            raw_text: self.raw_text.clone(),
        }
    }
}

//
// ================= Validation =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
}

//
// ================= Catalog =================
//

/// Product snapshot supplied by the caller on every turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub stock_quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(name: &str, price: f64, stock_quantity: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            stock_quantity,
            category: None,
            description: None,
            cost_price: None,
            sku: None,
            updated_at: None,
        }
    }
}

//
// ================= Ledger Records =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// Financial transaction as sent to the persistence service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTransaction {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    pub is_paid: bool,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub installment_group_id: Option<Uuid>,
    #[serde(default)]
    pub installment_number: Option<u32>,
    #[serde(default)]
    pub installment_count: Option<u32>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_interval: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl NewTransaction {
    pub fn new(
        user_id: Uuid,
        kind: TransactionKind,
        amount: f64,
        date: NaiveDate,
        description: &str,
        category: &str,
    ) -> Self {
        Self {
            user_id,
            kind,
            amount,
            date,
            description: description.to_string(),
            category: category.to_string(),
            is_paid: true,
            scheduled_date: None,
            installment_group_id: None,
            installment_number: None,
            installment_count: None,
            is_recurring: false,
            recurring_interval: None,
            notes: None,
            product_id: None,
            quantity: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredTransaction {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: NewTransaction,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTask {
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub due_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredTask {
    pub id: Uuid,
    #[serde(flatten)]
    pub task: NewTask,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Inclusive date window used by the analytics handlers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

//
// ================= Confirmation =================
//

/// Opaque bundle handed from the propose phase to the execute phase.
///
/// The caller returns it verbatim; `fingerprint` covers
/// `confirmation_id`, `user_id` and `action`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationData {
    pub confirmation_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub action: PendingAction,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    Sale(SaleAction),
    Expense(FinancialAction),
    Income(FinancialAction),
    Restock(RestockAction),
    CreateTask(TaskAction),
}

impl PendingAction {
    pub fn kind(&self) -> &'static str {
        match self {
            PendingAction::Sale(_) => "sale",
            PendingAction::Expense(_) => "expense",
            PendingAction::Income(_) => "income",
            PendingAction::Restock(_) => "restock",
            PendingAction::CreateTask(_) => "create_task",
        }
    }
}

/// How a financial action is written to the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PaymentPlan {
    Single {
        scheduled: bool,
        payment_date: Option<NaiveDate>,
    },
    Installments {
        count: u32,
        interval: InstallmentInterval,
        base_date: NaiveDate,
        amounts: Vec<f64>,
    },
    Recurring {
        interval: RecurringInterval,
        end_date: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleAction {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_amount: f64,
    pub date: NaiveDate,
    pub plan: PaymentPlan,
    pub payment_method: Option<PaymentMethod>,
    pub fee_percentage: Option<f64>,
    pub description: String,
    pub category: String,
}

impl SaleAction {
    /// Card-processor sale with a positive fee
    pub fn has_card_fee(&self) -> bool {
        let by_card = self.payment_method.map(|m| m.is_card()).unwrap_or(false);
        by_card && self.fee_percentage.map(|fee| fee > 0.0).unwrap_or(false)
    }

    /// What the seller keeps; only card fees are deducted
    pub fn net_amount(&self) -> f64 {
        match self.fee_percentage {
            Some(fee) if self.has_card_fee() => round_cents(self.total_amount * (1.0 - fee / 100.0)),
            _ => self.total_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialAction {
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    pub plan: PaymentPlan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestockAction {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskAction {
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub due_time: Option<NaiveTime>,
}

//
// ================= Bot Response =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Success,
    Error,
    Info,
    Question,
    Confirmation,
}

/// Everything the presentation layer receives for one turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotResponse {
    pub message: String,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_confirmation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_data: Option<ConfirmationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_input: Option<bool>,
}

impl BotResponse {
    fn with_type(message: impl Into<String>, response_type: ResponseType) -> Self {
        Self {
            message: message.into(),
            response_type,
            data: None,
            suggestions: None,
            requires_confirmation: None,
            confirmation_data: None,
            requires_input: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with_type(message, ResponseType::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_type(message, ResponseType::Error)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_type(message, ResponseType::Info)
    }

    pub fn question(message: impl Into<String>) -> Self {
        let mut response = Self::with_type(message, ResponseType::Question);
        response.requires_input = Some(true);
        response
    }

    pub fn confirmation(message: impl Into<String>, confirmation: ConfirmationData) -> Self {
        let mut response = Self::with_type(message, ResponseType::Confirmation);
        response.requires_confirmation = Some(true);
        response.confirmation_data = Some(confirmation);
        response
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_suggestions<S: Into<String>>(mut self, suggestions: Vec<S>) -> Self {
        if !suggestions.is_empty() {
            self.suggestions = Some(suggestions.into_iter().map(Into::into).collect());
        }
        self
    }

    pub fn is_type(&self, response_type: ResponseType) -> bool {
        self.response_type == response_type
    }
}

/// Round a monetary value to cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_serializes_snake_case() {
        let json = serde_json::to_string(&Intent::RegisterExpense).unwrap();
        assert_eq!(json, "\"register_expense\"");
        assert_eq!(Intent::SellProduct.to_string(), "sell_product");
    }

    #[test]
    fn test_monthly_advance_clamps_month_end() {
        let base = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let next = InstallmentInterval::Monthly.advance(base, 1).unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn test_card_fee_net_amount() {
        let sale = SaleAction {
            product_id: Uuid::new_v4(),
            product_name: "Colar".to_string(),
            quantity: 1,
            unit_price: 200.0,
            total_amount: 200.0,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            plan: PaymentPlan::Single {
                scheduled: false,
                payment_date: None,
            },
            payment_method: Some(PaymentMethod::Credito),
            fee_percentage: Some(3.5),
            description: "Venda".to_string(),
            category: "vendas".to_string(),
        };

        assert!(sale.has_card_fee());
        assert_eq!(sale.net_amount(), 193.0);
    }

    #[test]
    fn test_bot_response_wire_shape() {
        let response = BotResponse::question("Qual o valor?");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "question");
        assert_eq!(json["requiresInput"], true);
        assert!(json.get("confirmationData").is_none());
    }
}
