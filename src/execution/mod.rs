//! Confirmation executor
//!
//! Second half of the propose/confirm protocol. Nothing here parses text;
//! every value comes from the signed [`ConfirmationData`]. Writes happen
//! sequentially and stop at the first failure. Records already written stay
//! written and the reply says so.

use crate::audit::{ConfirmationSigner, ExecutionLog};
use crate::config::Clock;
use crate::error::InterpreterError;
use crate::extraction::format_brl;
use crate::models::{
    BotResponse, ConfirmationData, FinancialAction, NewTask, NewTransaction, PaymentPlan,
    PendingAction, RestockAction, SaleAction, StoredTransaction, TaskAction, TransactionKind,
};
use crate::store::LedgerStore;
use crate::Result;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Ledger entries to write for one financial action
struct LedgerEntry<'a> {
    user_id: Uuid,
    kind: TransactionKind,
    amount: f64,
    date: NaiveDate,
    description: &'a str,
    category: &'a str,
    product_id: Option<Uuid>,
    quantity: Option<u32>,
}

impl LedgerEntry<'_> {
    fn base(&self) -> NewTransaction {
        let mut tx = NewTransaction::new(
            self.user_id,
            self.kind,
            self.amount,
            self.date,
            self.description,
            self.category,
        );
        tx.product_id = self.product_id;
        tx.quantity = self.quantity;
        tx
    }
}

/// Result of a sequential write run
struct WriteReport {
    written: Vec<StoredTransaction>,
    expected: usize,
    failure: Option<InterpreterError>,
}

impl WriteReport {
    fn is_partial(&self) -> bool {
        self.failure.is_some() && !self.written.is_empty()
    }

    fn ids(&self) -> Vec<Uuid> {
        self.written.iter().map(|t| t.id).collect()
    }
}

pub struct ConfirmationExecutor {
    store: Arc<dyn LedgerStore>,
    signer: ConfirmationSigner,
    log: ExecutionLog,
    clock: Arc<dyn Clock>,
}

impl ConfirmationExecutor {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        signer: ConfirmationSigner,
        clock: Arc<dyn Clock>,
        confirmation_ttl_secs: i64,
    ) -> Self {
        Self {
            store,
            signer,
            log: ExecutionLog::new(confirmation_ttl_secs),
            clock,
        }
    }

    /// Verify, claim and run a confirmation. Failures become error replies.
    pub async fn execute(&self, data: &ConfirmationData, user_id: Uuid) -> BotResponse {
        match self.try_execute(data, user_id).await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    confirmation_id = %data.confirmation_id,
                    %user_id,
                    %error,
                    "Confirmation rejected"
                );
                BotResponse::error(user_message(&error))
            }
        }
    }

    async fn try_execute(&self, data: &ConfirmationData, user_id: Uuid) -> Result<BotResponse> {
        self.signer.verify(data, user_id)?;
        self.log.claim(data, self.clock.now()).await?;

        debug!(
            confirmation_id = %data.confirmation_id,
            action = data.action.kind(),
            "Executing confirmation"
        );

        let outcome = match &data.action {
            PendingAction::Sale(sale) => self.execute_sale(user_id, sale).await,
            PendingAction::Expense(action) => {
                self.execute_financial(user_id, TransactionKind::Expense, action).await
            }
            PendingAction::Income(action) => {
                self.execute_financial(user_id, TransactionKind::Income, action).await
            }
            PendingAction::Restock(restock) => self.execute_restock(user_id, restock).await,
            PendingAction::CreateTask(task) => self.execute_task(user_id, task).await,
        };

        match outcome {
            Ok(response) => {
                self.log
                    .finish(data.confirmation_id, response_label(&response))
                    .await;
                info!(
                    confirmation_id = %data.confirmation_id,
                    action = data.action.kind(),
                    outcome = response_label(&response),
                    "Confirmation executed"
                );
                Ok(response.with_data_field("confirmationId", json!(data.confirmation_id)))
            }
            Err(error) => {
                // Only reached before the first write
                self.log.release(data.confirmation_id).await;
                Err(error)
            }
        }
    }

    //
    // ================= Sale =================
    //

    async fn execute_sale(&self, user_id: Uuid, sale: &SaleAction) -> Result<BotResponse> {
        let product = self
            .store
            .get_product(user_id, sale.product_id)
            .await?
            .ok_or_else(|| InterpreterError::ProductNotFound(sale.product_name.clone()))?;

        let requested = i64::from(sale.quantity);
        if product.stock_quantity < requested {
            return Err(InterpreterError::InsufficientStock {
                product: product.name,
                available: product.stock_quantity,
                requested,
            });
        }

        let entry = LedgerEntry {
            user_id,
            kind: TransactionKind::Income,
            amount: sale.total_amount,
            date: sale.date,
            description: &sale.description,
            category: &sale.category,
            product_id: Some(sale.product_id),
            quantity: Some(sale.quantity),
        };

        let report = if sale.has_card_fee() {
            // Card-processor sale: one settled record at the net amount
            let mut tx = entry.base();
            tx.amount = sale.net_amount();
            tx.notes = sale.fee_percentage.map(|fee| {
                format!("taxa do cartão {}% sobre {}", fee, format_brl(sale.total_amount))
            });
            self.write_sequence(vec![tx]).await
        } else {
            self.write_plan(&entry, &sale.plan).await?
        };

        if report.written.is_empty() {
            return Err(report
                .failure
                .unwrap_or_else(|| InterpreterError::ExecutionError("nothing written".to_string())));
        }

        let new_stock = product.stock_quantity - requested;
        if let Err(error) = self
            .store
            .update_stock(user_id, sale.product_id, new_stock)
            .await
        {
            warn!(product_id = %sale.product_id, %error, "Stock update failed after sale writes");
            return Ok(BotResponse::error(format!(
                "A venda foi registrada, mas não consegui atualizar o estoque de {} ({}).",
                sale.product_name, error
            ))
            .with_data(json!({ "transactionIds": report.ids() })));
        }

        let data = json!({
            "action": "sale",
            "productName": sale.product_name,
            "quantity": sale.quantity,
            "totalAmount": sale.total_amount,
            "netAmount": sale.net_amount(),
            "newStock": new_stock,
            "transactionIds": report.ids(),
        });

        if report.is_partial() {
            return Ok(partial_response(&report).with_data(data));
        }

        let mut message = format!(
            "Venda registrada: {}x {} por {}.",
            sale.quantity,
            sale.product_name,
            format_brl(sale.total_amount)
        );
        if sale.has_card_fee() {
            message.push_str(&format!(" Valor líquido: {}.", format_brl(sale.net_amount())));
        } else {
            message.push_str(&plan_summary(&sale.plan));
        }
        message.push_str(&format!(" Estoque atual: {}.", new_stock));

        Ok(BotResponse::success(message).with_data(data))
    }

    //
    // ================= Expense / Income =================
    //

    async fn execute_financial(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        action: &FinancialAction,
    ) -> Result<BotResponse> {
        let entry = LedgerEntry {
            user_id,
            kind,
            amount: action.amount,
            date: action.date,
            description: &action.description,
            category: &action.category,
            product_id: None,
            quantity: None,
        };

        let report = self.write_plan(&entry, &action.plan).await?;
        if report.written.is_empty() {
            return Err(report
                .failure
                .unwrap_or_else(|| InterpreterError::ExecutionError("nothing written".to_string())));
        }

        let data = json!({
            "action": match kind {
                TransactionKind::Expense => "expense",
                TransactionKind::Income => "income",
            },
            "amount": action.amount,
            "description": action.description,
            "category": action.category,
            "transactionIds": report.ids(),
        });

        if report.is_partial() {
            return Ok(partial_response(&report).with_data(data));
        }

        let label = match kind {
            TransactionKind::Expense => "Despesa registrada",
            TransactionKind::Income => "Receita registrada",
        };
        let message = format!(
            "{}: {} ({}).{}",
            label,
            format_brl(action.amount),
            action.description,
            plan_summary(&action.plan)
        );

        Ok(BotResponse::success(message).with_data(data))
    }

    //
    // ================= Restock / Task =================
    //

    async fn execute_restock(&self, user_id: Uuid, restock: &RestockAction) -> Result<BotResponse> {
        let product = self
            .store
            .get_product(user_id, restock.product_id)
            .await?
            .ok_or_else(|| InterpreterError::ProductNotFound(restock.product_name.clone()))?;

        let new_stock = product.stock_quantity + i64::from(restock.quantity);
        self.store
            .update_stock(user_id, restock.product_id, new_stock)
            .await?;

        let message = format!(
            "Estoque de {} atualizado: {} unidades (+{}).",
            product.name, new_stock, restock.quantity
        );
        let data = json!({
            "action": "restock",
            "productName": product.name,
            "quantity": restock.quantity,
            "newStock": new_stock,
        });

        Ok(BotResponse::success(message).with_data(data))
    }

    async fn execute_task(&self, user_id: Uuid, task: &TaskAction) -> Result<BotResponse> {
        let stored = self
            .store
            .create_task(NewTask {
                user_id,
                title: task.title.clone(),
                description: task.description.clone(),
                due_date: task.due_date,
                due_time: task.due_time,
            })
            .await?;

        let when = match task.due_time {
            Some(time) => format!("{} às {}", task.due_date.format("%d/%m/%Y"), time.format("%H:%M")),
            None => task.due_date.format("%d/%m/%Y").to_string(),
        };
        let message = format!("Tarefa criada: \"{}\" para {}.", task.title, when);
        let data = json!({ "action": "create_task", "taskId": stored.id });

        Ok(BotResponse::success(message).with_data(data))
    }

    //
    // ================= Writes =================
    //

    async fn write_plan(&self, entry: &LedgerEntry<'_>, plan: &PaymentPlan) -> Result<WriteReport> {
        let records = match plan {
            PaymentPlan::Single {
                scheduled,
                payment_date,
            } => {
                let mut tx = entry.base();
                if *scheduled {
                    tx.is_paid = false;
                    tx.scheduled_date = payment_date.or(Some(entry.date));
                }
                vec![tx]
            }
            PaymentPlan::Installments {
                count,
                interval,
                base_date,
                amounts,
            } => {
                let group_id = Uuid::new_v4();
                let mut records = Vec::with_capacity(amounts.len());
                for (i, amount) in amounts.iter().enumerate() {
                    let n = i as u32;
                    let date = interval.advance(*base_date, n).ok_or_else(|| {
                        InterpreterError::ExecutionError(format!(
                            "parcel {} falls outside the calendar",
                            n + 1
                        ))
                    })?;

                    let mut tx = entry.base();
                    tx.amount = *amount;
                    tx.date = date;
                    tx.description = format!("{} ({}/{})", entry.description, n + 1, count);
                    tx.installment_group_id = Some(group_id);
                    tx.installment_number = Some(n + 1);
                    tx.installment_count = Some(*count);
                    if n > 0 {
                        tx.is_paid = false;
                        tx.scheduled_date = Some(date);
                    }
                    records.push(tx);
                }
                records
            }
            PaymentPlan::Recurring { interval, end_date } => {
                let mut tx = entry.base();
                tx.is_paid = false;
                tx.scheduled_date = Some(entry.date);
                tx.is_recurring = true;
                tx.recurring_interval = Some(interval.label());
                let mut note = format!("recorrente: {}", interval.label());
                if let Some(end) = end_date {
                    note.push_str(&format!("; até {}", end.format("%d/%m/%Y")));
                }
                tx.notes = Some(note);
                vec![tx]
            }
        };

        Ok(self.write_sequence(records).await)
    }

    async fn write_sequence(&self, records: Vec<NewTransaction>) -> WriteReport {
        let expected = records.len();
        let mut written = Vec::with_capacity(expected);

        for (i, record) in records.into_iter().enumerate() {
            match self.store.create_transaction(record).await {
                Ok(stored) => written.push(stored),
                Err(error) => {
                    warn!(step = i + 1, expected, %error, "Transaction write failed");
                    return WriteReport {
                        written,
                        expected,
                        failure: Some(error),
                    };
                }
            }
        }

        WriteReport {
            written,
            expected,
            failure: None,
        }
    }
}

fn plan_summary(plan: &PaymentPlan) -> String {
    match plan {
        PaymentPlan::Single {
            scheduled: true,
            payment_date,
        } => match payment_date {
            Some(date) => format!(" Pagamento agendado para {}.", date.format("%d/%m/%Y")),
            None => " Pagamento agendado.".to_string(),
        },
        PaymentPlan::Single { .. } => String::new(),
        PaymentPlan::Installments {
            count, interval, ..
        } => format!(" Parcelado em {}x ({}).", count, interval.label()),
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

fn partial_response(report: &WriteReport) -> BotResponse {
    let reason = report
        .failure
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_default();
    BotResponse::error(format!(
        "Registrei apenas {} de {} lançamentos antes de uma falha ({}). Os lançamentos já gravados foram mantidos.",
        report.written.len(),
        report.expected,
        reason
    ))
}

fn response_label(response: &BotResponse) -> &'static str {
    match response.response_type {
        crate::models::ResponseType::Success => "success",
        _ => "partial",
    }
}

fn user_message(error: &InterpreterError) -> String {
    match error {
        InterpreterError::InsufficientStock {
            product,
            available,
            requested,
        } => format!(
            "Estoque insuficiente de {}: disponível {}, solicitado {}. Nada foi registrado.",
            product, available, requested
        ),
        InterpreterError::ProductNotFound(name) => {
            format!("Não encontrei o produto {} no seu estoque.", name)
        }
        InterpreterError::ConfirmationTampered(_) => {
            "Esta confirmação não é válida. Envie o comando novamente.".to_string()
        }
        InterpreterError::ConfirmationReplayed(_) => {
            "Esta ação já foi confirmada e registrada.".to_string()
        }
        InterpreterError::ConfirmationExpired(_) => {
            "Esta confirmação expirou. Envie o comando novamente.".to_string()
        }
        other => format!("Não consegui concluir a ação: {}", other),
    }
}

trait WithDataField {
    fn with_data_field(self, key: &str, value: serde_json::Value) -> Self;
}

impl WithDataField for BotResponse {
    fn with_data_field(mut self, key: &str, value: serde_json::Value) -> Self {
        match self.data.as_mut().and_then(|d| d.as_object_mut()) {
            Some(object) => {
                object.insert(key.to_string(), value);
            }
            None => {
                let mut object = serde_json::Map::new();
                object.insert(key.to_string(), value);
                self.data = Some(serde_json::Value::Object(object));
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixedClock;
    use crate::models::{InstallmentInterval, PaymentMethod, Product, RecurringInterval, ResponseType};
    use crate::store::InMemoryLedgerStore;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryLedgerStore>,
        executor: ConfirmationExecutor,
        signer: ConfirmationSigner,
        user: Uuid,
        product: Product,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryLedgerStore::new());
        let user = Uuid::new_v4();
        let product = Product::new("Colar de Pérolas", 120.0, 500);
        store.seed_product(user, product.clone()).await;

        let signer = ConfirmationSigner::new(Some("test"));
        let executor = ConfirmationExecutor::new(
            store.clone(),
            signer.clone(),
            Arc::new(FixedClock::new(today())),
            3600,
        );
        Fixture {
            store,
            executor,
            signer,
            user,
            product,
        }
    }

    fn sale(product: &Product, quantity: u32, total: f64, plan: PaymentPlan) -> SaleAction {
        SaleAction {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            total_amount: total,
            date: today(),
            plan,
            payment_method: None,
            fee_percentage: None,
            description: format!("Venda: {}", product.name),
            category: "vendas".to_string(),
        }
    }

    fn single() -> PaymentPlan {
        PaymentPlan::Single {
            scheduled: false,
            payment_date: None,
        }
    }

    #[tokio::test]
    async fn test_simple_sale_decrements_stock_once() {
        let f = fixture().await;
        let data = f.signer.seal(
            f.user,
            PendingAction::Sale(sale(&f.product, 1, 120.0, single())),
            Utc::now(),
        );

        let response = f.executor.execute(&data, f.user).await;
        assert!(response.is_type(ResponseType::Success), "{}", response.message);

        let stored = f.store.get_product(f.user, f.product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 499);

        let txs = f.store.transactions_for(f.user).await;
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].record.kind, TransactionKind::Income);
        assert_eq!(txs[0].record.amount, 120.0);
        assert!(txs[0].record.is_paid);
    }

    #[tokio::test]
    async fn test_installment_sale_writes_group() {
        let f = fixture().await;
        let plan = PaymentPlan::Installments {
            count: 3,
            interval: InstallmentInterval::Monthly,
            base_date: today(),
            amounts: vec![50.0, 50.0, 50.0],
        };
        let data = f.signer.seal(
            f.user,
            PendingAction::Sale(sale(&f.product, 1, 150.0, plan)),
            Utc::now(),
        );

        let response = f.executor.execute(&data, f.user).await;
        assert!(response.is_type(ResponseType::Success));

        let txs = f.store.transactions_for(f.user).await;
        assert_eq!(txs.len(), 3);
        let group = txs[0].record.installment_group_id;
        assert!(group.is_some());
        assert!(txs.iter().all(|t| t.record.installment_group_id == group));
        assert!(txs[0].record.is_paid);
        assert!(!txs[1].record.is_paid && !txs[2].record.is_paid);
        assert_eq!(txs[2].record.date, NaiveDate::from_ymd_opt(2025, 5, 12).unwrap());
        assert_eq!(txs.iter().map(|t| t.record.amount).sum::<f64>(), 150.0);

        let stored = f.store.get_product(f.user, f.product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 499);
    }

    #[tokio::test]
    async fn test_card_fee_collapses_installments() {
        let f = fixture().await;
        let plan = PaymentPlan::Installments {
            count: 2,
            interval: InstallmentInterval::Monthly,
            base_date: today(),
            amounts: vec![100.0, 100.0],
        };
        let mut action = sale(&f.product, 1, 200.0, plan);
        action.payment_method = Some(PaymentMethod::Credito);
        action.fee_percentage = Some(5.0);
        let data = f.signer.seal(f.user, PendingAction::Sale(action), Utc::now());

        f.executor.execute(&data, f.user).await;

        let txs = f.store.transactions_for(f.user).await;
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].record.amount, 190.0);
        assert!(txs[0].record.is_paid);
    }

    #[tokio::test]
    async fn test_fee_without_card_keeps_installments() {
        let f = fixture().await;
        let plan = PaymentPlan::Installments {
            count: 2,
            interval: InstallmentInterval::Monthly,
            base_date: today(),
            amounts: vec![100.0, 100.0],
        };
        let mut action = sale(&f.product, 1, 200.0, plan);
        action.payment_method = Some(PaymentMethod::Pix);
        action.fee_percentage = Some(5.0);
        assert!(!action.has_card_fee());
        assert_eq!(action.net_amount(), 200.0);

        let data = f.signer.seal(f.user, PendingAction::Sale(action), Utc::now());
        f.executor.execute(&data, f.user).await;

        let txs = f.store.transactions_for(f.user).await;
        assert_eq!(txs.len(), 2);
        assert!(txs.iter().all(|t| t.record.amount == 100.0));
    }

    #[tokio::test]
    async fn test_insufficient_stock_fails_whole_action() {
        let f = fixture().await;
        let data = f.signer.seal(
            f.user,
            PendingAction::Sale(sale(&f.product, 600, 600.0, single())),
            Utc::now(),
        );

        let response = f.executor.execute(&data, f.user).await;
        assert!(response.is_type(ResponseType::Error));
        assert!(response.message.contains("Estoque insuficiente"));
        assert!(f.store.transactions_for(f.user).await.is_empty());
    }

    #[tokio::test]
    async fn test_replay_and_tamper_are_rejected() {
        let f = fixture().await;
        let data = f.signer.seal(
            f.user,
            PendingAction::Sale(sale(&f.product, 1, 120.0, single())),
            Utc::now(),
        );

        assert!(f.executor.execute(&data, f.user).await.is_type(ResponseType::Success));
        let replay = f.executor.execute(&data, f.user).await;
        assert!(replay.is_type(ResponseType::Error));
        assert_eq!(f.store.transactions_for(f.user).await.len(), 1);

        let mut tampered = f.signer.seal(
            f.user,
            PendingAction::Sale(sale(&f.product, 1, 120.0, single())),
            Utc::now(),
        );
        if let PendingAction::Sale(ref mut s) = tampered.action {
            s.total_amount = 1.0;
        }
        assert!(f.executor.execute(&tampered, f.user).await.is_type(ResponseType::Error));
    }

    #[tokio::test]
    async fn test_stale_confirmation_is_refused() {
        let f = fixture().await;
        let data = f.signer.seal(
            f.user,
            PendingAction::Sale(sale(&f.product, 1, 120.0, single())),
            Utc::now() - chrono::Duration::hours(3),
        );

        let response = f.executor.execute(&data, f.user).await;
        assert!(response.message.contains("expirou"));
        assert!(f.store.transactions_for(f.user).await.is_empty());
    }

    #[tokio::test]
    async fn test_partial_installments_are_reported_and_kept() {
        let f = fixture().await;
        f.store.fail_transactions_after(2);
        let action = FinancialAction {
            amount: 600.0,
            description: "fornecedor".to_string(),
            category: "fornecedores".to_string(),
            date: today(),
            plan: PaymentPlan::Installments {
                count: 6,
                interval: InstallmentInterval::Monthly,
                base_date: today(),
                amounts: vec![100.0; 6],
            },
        };
        let data = f.signer.seal(f.user, PendingAction::Expense(action), Utc::now());

        let response = f.executor.execute(&data, f.user).await;
        assert!(response.is_type(ResponseType::Error));
        assert!(response.message.contains("2 de 6"));
        assert_eq!(f.store.transactions_for(f.user).await.len(), 2);
    }

    #[tokio::test]
    async fn test_recurring_expense_single_pending_record() {
        let f = fixture().await;
        let action = FinancialAction {
            amount: 1500.0,
            description: "aluguel".to_string(),
            category: "aluguel".to_string(),
            date: today(),
            plan: PaymentPlan::Recurring {
                interval: RecurringInterval::Monthly,
                end_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            },
        };
        let data = f.signer.seal(f.user, PendingAction::Expense(action), Utc::now());

        assert!(f.executor.execute(&data, f.user).await.is_type(ResponseType::Success));
        let txs = f.store.transactions_for(f.user).await;
        assert_eq!(txs.len(), 1);
        assert!(!txs[0].record.is_paid);
        assert!(txs[0].record.is_recurring);
        assert_eq!(
            txs[0].record.notes.as_deref(),
            Some("recorrente: mensal; até 31/12/2025")
        );
    }

    #[tokio::test]
    async fn test_restock_and_task() {
        let f = fixture().await;
        let restock = f.signer.seal(
            f.user,
            PendingAction::Restock(RestockAction {
                product_id: f.product.id,
                product_name: f.product.name.clone(),
                quantity: 10,
            }),
            Utc::now(),
        );
        assert!(f.executor.execute(&restock, f.user).await.is_type(ResponseType::Success));
        let stored = f.store.get_product(f.user, f.product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 510);

        let task = f.signer.seal(
            f.user,
            PendingAction::CreateTask(TaskAction {
                title: "pagar o fornecedor".to_string(),
                description: None,
                due_date: today(),
                due_time: None,
            }),
            Utc::now(),
        );
        assert!(f.executor.execute(&task, f.user).await.is_type(ResponseType::Success));
        assert_eq!(f.store.tasks_for(f.user).await.len(), 1);
    }
}
