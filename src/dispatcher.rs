//! Interpreter - the per-turn loop
//!
//! UTTERANCE → PENDING CONTEXT? → CLASSIFY → EXTRACT → VALIDATE → HANDLE → RESPOND
//!
//! The caller owns the [`Session`] and must not run two turns for the same
//! session at once.

use crate::audit::ConfirmationSigner;
use crate::classifier::{confidence_for, IntentClassifier};
use crate::config::{Clock, InterpreterConfig, SystemClock};
use crate::context::{ConversationContext, PendingState, Session};
use crate::error::InterpreterError;
use crate::execution::ConfirmationExecutor;
use crate::extraction::{parse_bare_money, parse_money_value, EntityExtractor};
use crate::handlers::{create_default_registry, HandlerRegistry, HandlerRequest, HandlerServices};
use crate::matcher::{MatchOutcome, ProductMatcher};
use crate::models::{
    BotResponse, ConfirmationData, Entities, Intent, ParsedCommand, Product, ValidationResult,
};
use crate::patterns::{
    has_action_verb, is_affirmative, is_bare_yes_no, is_cancel, is_negative, normalize,
    parse_selection, FEE_REPLY,
};
use crate::validation::{create_default_validator, suggestions::general_examples, CommandValidator};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a pending context did with a reply
enum PendingReply {
    /// Reply handled; the response is final for this turn
    Handled(BotResponse),
    /// Not an answer to this context; process as a fresh command
    Pass,
}

pub struct Interpreter {
    extractor: EntityExtractor,
    validator: CommandValidator,
    registry: HandlerRegistry,
    executor: ConfirmationExecutor,
    clock: Arc<dyn Clock>,
    config: InterpreterConfig,
}

impl Interpreter {
    pub fn new(
        store: Arc<dyn crate::store::LedgerStore>,
        config: InterpreterConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let signer = ConfirmationSigner::new(config.confirmation_secret.as_deref());
        let services = Arc::new(HandlerServices {
            store: store.clone(),
            signer: signer.clone(),
            config: config.clone(),
        });

        Self {
            extractor: EntityExtractor::new(&config),
            validator: create_default_validator(),
            registry: create_default_registry(services),
            executor: ConfirmationExecutor::new(
                store,
                signer,
                clock.clone(),
                config.confirmation_ttl_secs,
            ),
            clock,
            config,
        }
    }

    /// Default config and the system clock
    pub fn with_store(store: Arc<dyn crate::store::LedgerStore>) -> Self {
        Self::new(store, InterpreterConfig::default(), Arc::new(SystemClock))
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Handle one utterance. Never fails: errors become `type: error` replies.
    pub async fn process(&self, session: &mut Session, utterance: &str, products: &[Product]) -> BotResponse {
        match self.try_process(session, utterance, products).await {
            Ok(response) => response,
            Err(error) => {
                warn!(user_id = %session.user_id, %error, "Turn failed");
                session.clear();
                BotResponse::error(format!("Não consegui processar o comando: {}", error))
            }
        }
    }

    /// Execute a proposal the caller hands back verbatim
    pub async fn confirm_and_execute(&self, confirmation: &ConfirmationData, user_id: Uuid) -> BotResponse {
        self.executor.execute(confirmation, user_id).await
    }

    async fn try_process(&self, session: &mut Session, utterance: &str, products: &[Product]) -> Result<BotResponse> {
        let text = normalize(utterance);
        let now = self.clock.now();
        let ttl = self.config.context_ttl_secs;

        if text.is_empty() {
            return Ok(BotResponse::info("O que você quer registrar?").with_suggestions(general_examples()));
        }

        if is_cancel(&text) {
            let had_pending = session.has_active(now, ttl);
            session.clear();
            let message = if had_pending {
                "Tudo bem, cancelei. Nada foi registrado."
            } else {
                "Não há nada pendente para cancelar."
            };
            return Ok(BotResponse::info(message));
        }

        if let Some(context) = session.active(now, ttl).cloned() {
            debug!(user_id = %session.user_id, pending = context.state.kind(), "Checking pending context");
            if let PendingReply::Handled(response) = self
                .resolve_pending(session, &context, &text, products)
                .await?
            {
                return Ok(response);
            }
        }

        let looks_like_answer = parse_selection(&text).is_some() || parse_bare_money(&text).is_some();
        if looks_like_answer {
            if let Some(context) = session.recoverable(now, ttl).cloned() {
                debug!(user_id = %session.user_id, recovered = context.state.kind(), "Recovering context from history");
                if let PendingReply::Handled(response) = self
                    .resolve_pending(session, &context, &text, products)
                    .await?
                {
                    return Ok(response);
                }
            }
        }

        if is_bare_yes_no(&text) {
            session.clear();
            return Ok(BotResponse::info(
                "Não há nada pendente no momento. Diga o que você quer registrar.",
            )
            .with_suggestions(general_examples()));
        }

        let (intent, confidence) = IntentClassifier::classify(&text);
        let entities = self.extractor.extract(&text, intent, self.clock.today());
        info!(
            user_id = %session.user_id,
            intent = %intent,
            confidence,
            "Processing command"
        );

        let command = ParsedCommand {
            intent,
            confidence,
            entities,
            raw_text: utterance.to_string(),
        };
        self.run_command(session, &command, products, None, None).await
    }

    /// Validate, route to the handler and apply its context update
    async fn run_command(
        &self,
        session: &mut Session,
        command: &ParsedCommand,
        products: &[Product],
        product: Option<&Product>,
        fee: Option<f64>,
    ) -> Result<BotResponse> {
        let validation = self.validator.validate(command);
        if !validation.is_valid {
            debug!(intent = %command.intent, errors = validation.errors.len(), "Command rejected");
            session.clear();
            return Ok(validation_response(validation));
        }

        let handler = self
            .registry
            .get(command.intent)
            .ok_or_else(|| InterpreterError::HandlerNotFound(command.intent.to_string()))?;

        let mut request = HandlerRequest::new(
            session.user_id,
            command,
            products,
            self.clock.today(),
            self.clock.now(),
        );
        if let Some(product) = product {
            request = request.with_product(product);
        }
        if let Some(fee) = fee {
            request = request.with_fee(fee);
        }

        let outcome = handler.handle(&request).await?;
        debug!(handler = handler.name(), update = ?outcome.update, "Handler finished");
        session.apply(outcome.update, self.clock.now());
        Ok(outcome.response)
    }

    async fn run_with_quantity(
        &self,
        session: &mut Session,
        command: &ParsedCommand,
        quantity: u32,
        products: &[Product],
        product: &Product,
    ) -> Result<BotResponse> {
        let command = ParsedCommand {
            entities: command.entities.with_quantity(quantity),
            ..command.clone()
        };
        self.run_command(session, &command, products, Some(product), None)
            .await
    }

    /// A new self-sufficient command replaces whatever was pending
    fn supersedes(&self, text: &str, pending_intent: Option<Intent>) -> bool {
        if has_action_verb(text) {
            return true;
        }
        let intent = IntentClassifier::classify_normalized(text);
        intent != Intent::Unknown && Some(intent) != pending_intent
    }

    //
    // ================= Pending contexts =================
    //

    async fn resolve_pending(
        &self,
        session: &mut Session,
        context: &ConversationContext,
        text: &str,
        products: &[Product],
    ) -> Result<PendingReply> {
        match &context.state {
            PendingState::ConfirmAction { confirmation } => {
                if is_affirmative(text) && is_bare_yes_no(text) {
                    session.forget(context.id);
                    let response = self.executor.execute(confirmation, session.user_id).await;
                    return Ok(PendingReply::Handled(response));
                }
                if is_negative(text) && is_bare_yes_no(text) {
                    session.forget(context.id);
                    return Ok(PendingReply::Handled(BotResponse::info(
                        "Ok, não registrei nada.",
                    )));
                }
                session.suspend();
                Ok(PendingReply::Pass)
            }

            PendingState::ListProducts => {
                session.forget(context.id);
                if is_affirmative(text) && is_bare_yes_no(text) {
                    let command = ParsedCommand {
                        intent: Intent::ListProducts,
                        confidence: confidence_for(Intent::ListProducts),
                        entities: Entities::default(),
                        raw_text: text.to_string(),
                    };
                    let response = self.run_command(session, &command, products, None, None).await?;
                    return Ok(PendingReply::Handled(response));
                }
                if is_negative(text) && is_bare_yes_no(text) {
                    return Ok(PendingReply::Handled(BotResponse::info(
                        "Tudo bem. Se precisar, é só pedir \"listar produtos\".",
                    )));
                }
                Ok(PendingReply::Pass)
            }

            PendingState::SelectProduct {
                candidates,
                command,
            } => {
                if let Some(choice) = parse_selection(text) {
                    let Some(product) = choice.checked_sub(1).and_then(|i| candidates.get(i)) else {
                        let response = BotResponse::question(format!(
                            "Opção inválida. Escolha um número de 1 a {}.",
                            candidates.len()
                        ))
                        .with_suggestions((1..=candidates.len()).map(|n| n.to_string()).collect());
                        return Ok(PendingReply::Handled(response));
                    };

                    session.forget(context.id);
                    let response = self
                        .run_command(session, command, products, Some(product), None)
                        .await?;
                    return Ok(PendingReply::Handled(response));
                }

                if self.supersedes(text, Some(command.intent)) {
                    session.suspend();
                    return Ok(PendingReply::Pass);
                }

                // "o de pérolas": narrow the candidate list by name
                if let MatchOutcome::Unique(product) = ProductMatcher::resolve(candidates, text) {
                    let product = product.clone();
                    session.forget(context.id);
                    let response = self
                        .run_command(session, command, products, Some(&product), None)
                        .await?;
                    return Ok(PendingReply::Handled(response));
                }

                session.suspend();
                Ok(PendingReply::Pass)
            }

            PendingState::AskAmount {
                intent,
                raw_text,
                entities,
            } => {
                if let Some(amount) = parse_bare_money(text) {
                    session.forget(context.id);
                    let command = ParsedCommand {
                        intent: *intent,
                        confidence: confidence_for(*intent),
                        entities: entities.with_amount(amount),
                        raw_text: raw_text.clone(),
                    };
                    let response = self.run_command(session, &command, products, None, None).await?;
                    return Ok(PendingReply::Handled(response));
                }

                if is_negative(text) && is_bare_yes_no(text) {
                    session.forget(context.id);
                    return Ok(PendingReply::Handled(BotResponse::info(
                        "Tudo bem, deixei de lado. Quando souber o valor é só me dizer.",
                    )));
                }

                if self.supersedes(text, None) {
                    session.suspend();
                    return Ok(PendingReply::Pass);
                }

                Ok(PendingReply::Handled(BotResponse::question(
                    "Não entendi o valor. Quanto foi? Exemplo: 50 ou R$ 80,39.",
                )))
            }

            PendingState::AskQuantity { command, product } => {
                let quantity = parse_selection(text)
                    .and_then(|n| u32::try_from(n).ok())
                    .filter(|q| *q > 0);
                if let Some(quantity) = quantity {
                    session.forget(context.id);
                    let response = self
                        .run_with_quantity(session, command, quantity, products, product)
                        .await?;
                    return Ok(PendingReply::Handled(response));
                }

                if is_negative(text) && is_bare_yes_no(text) {
                    session.forget(context.id);
                    return Ok(PendingReply::Handled(BotResponse::info(
                        "Tudo bem, não mexi no estoque.",
                    )));
                }

                if self.supersedes(text, None) {
                    session.suspend();
                    return Ok(PendingReply::Pass);
                }

                // "10 unidades", "umas 5 peças"
                let extracted = self
                    .extractor
                    .extract(text, command.intent, self.clock.today())
                    .quantity
                    .filter(|q| *q > 0);
                if let Some(quantity) = extracted {
                    session.forget(context.id);
                    let response = self
                        .run_with_quantity(session, command, quantity, products, product)
                        .await?;
                    return Ok(PendingReply::Handled(response));
                }

                Ok(PendingReply::Handled(
                    BotResponse::question("Quantas unidades? Responda com um número, por exemplo 10.")
                        .with_suggestions(vec!["5", "10", "20"]),
                ))
            }

            PendingState::AskDetail { intent, lead } => {
                if is_negative(text) && is_bare_yes_no(text) {
                    session.forget(context.id);
                    return Ok(PendingReply::Handled(BotResponse::info("Tudo bem, deixei de lado.")));
                }

                if has_action_verb(text) {
                    session.suspend();
                    return Ok(PendingReply::Pass);
                }

                session.forget(context.id);
                let combined = format!("{} {}", lead, text);
                let intent = match IntentClassifier::classify(&combined).0 {
                    Intent::Unknown => *intent,
                    classified => classified,
                };
                debug!(intent = %intent, "Completing command from detail reply");

                let command = ParsedCommand {
                    intent,
                    confidence: confidence_for(intent),
                    entities: self.extractor.extract(&combined, intent, self.clock.today()),
                    raw_text: combined,
                };
                let response = self.run_command(session, &command, products, None, None).await?;
                Ok(PendingReply::Handled(response))
            }

            PendingState::FeeQuestion { command, product } | PendingState::FeeAmount { command, product } => {
                let asked_amount = matches!(context.state, PendingState::FeeAmount { .. });

                if let Some(fee) = parse_fee_reply(text) {
                    session.forget(context.id);
                    let response = self
                        .run_command(session, command, products, Some(product), Some(fee))
                        .await?;
                    return Ok(PendingReply::Handled(response));
                }

                if is_negative(text) && is_bare_yes_no(text) {
                    session.forget(context.id);
                    let response = self
                        .run_command(session, command, products, Some(product), Some(0.0))
                        .await?;
                    return Ok(PendingReply::Handled(response));
                }

                if !asked_amount && is_affirmative(text) {
                    session.forget(context.id);
                    session.set(
                        PendingState::FeeAmount {
                            command: command.clone(),
                            product: product.clone(),
                        },
                        self.clock.now(),
                    );
                    return Ok(PendingReply::Handled(BotResponse::question(
                        "Qual foi a taxa cobrada, em porcentagem?",
                    )));
                }

                if self.supersedes(text, None) {
                    session.suspend();
                    return Ok(PendingReply::Pass);
                }

                let prompt = if asked_amount {
                    "Informe a taxa em porcentagem, por exemplo 3,5%."
                } else {
                    "A maquininha cobrou taxa? Responda \"não\" ou informe a taxa, por exemplo 3,5%."
                };
                Ok(PendingReply::Handled(BotResponse::question(prompt)))
            }
        }
    }
}

/// "3,5%", "sim, 4%", "taxa de 2.99"
fn parse_fee_reply(text: &str) -> Option<f64> {
    let caps = FEE_REPLY.captures(text.trim())?;
    parse_money_value(caps.get(1)?.as_str()).filter(|fee| *fee >= 0.0 && *fee < 100.0)
}

fn validation_response(validation: ValidationResult) -> BotResponse {
    let lines: Vec<String> = validation
        .errors
        .iter()
        .map(|e| format!("- {} {}", e.message, e.suggestion))
        .collect();

    BotResponse::error(format!("Não consegui registrar:\n{}", lines.join("\n")))
        .with_data(serde_json::json!({ "errors": validation.errors }))
        .with_suggestions(validation.suggestions)
}
