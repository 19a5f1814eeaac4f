//! Local REPL: type messages as the business owner would send them.
//! Confirmations are answered in the same chat ("sim" / "não").

use bookkeeping_command_interpreter::{
    config::{system_clock, InterpreterConfig},
    context::Session,
    dispatcher::Interpreter,
    models::Product,
    store::InMemoryLedgerStore,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let user_id = Uuid::new_v4();
    let store = Arc::new(InMemoryLedgerStore::new());
    for product in demo_catalog() {
        store.seed_product(user_id, product).await;
    }

    let config = InterpreterConfig::from_env()?;
    let mut session = Session::with_history_limit(user_id, config.context_history_limit);
    let interpreter = Interpreter::new(store.clone(), config, system_clock());

    info!(%user_id, "Interpreter REPL starting");
    println!("Digite uma mensagem (\"ajuda\" para exemplos, Ctrl+D para sair).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let products = store.products_for(user_id).await;
        let response = interpreter.process(&mut session, &line, &products).await;

        println!("\n[{:?}] {}", response.response_type, response.message);
        if let Some(suggestions) = &response.suggestions {
            for suggestion in suggestions {
                println!("  > {}", suggestion);
            }
        }
        println!();
    }

    let recorded = store.transactions_for(user_id).await;
    println!("{} lançamento(s) registrado(s) nesta sessão.", recorded.len());

    Ok(())
}

fn demo_catalog() -> Vec<Product> {
    vec![
        Product::new("Colar de Pérolas", 120.0, 15),
        Product::new("Colar Dourado", 89.9, 8),
        Product::new("Anel de Prata", 60.0, 30),
        Product::new("Brinco de Argola", 45.0, 4),
        Product::new("Pulseira de Couro", 35.0, 12),
    ]
}
