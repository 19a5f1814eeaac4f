//! Task and reminder proposals

use super::{CommandHandler, HandlerOutcome, HandlerRequest, HandlerServices};
use crate::context::PendingState;
use crate::models::{BotResponse, Intent, PendingAction, TaskAction};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct TaskHandler {
    services: Arc<HandlerServices>,
}

impl TaskHandler {
    pub fn new(services: Arc<HandlerServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for TaskHandler {
    fn name(&self) -> &'static str {
        "tasks"
    }

    fn intents(&self) -> &'static [Intent] {
        &[Intent::CreateTask]
    }

    async fn handle(&self, request: &HandlerRequest<'_>) -> Result<HandlerOutcome> {
        let entities = request.entities();
        let Some(title) = entities.title.clone().filter(|t| !t.trim().is_empty()) else {
            return Ok(HandlerOutcome::awaiting(
                BotResponse::question("Do que você quer que eu te lembre?")
                    .with_suggestions(vec!["pagar o fornecedor amanhã às 10h"]),
                PendingState::AskDetail {
                    intent: Intent::CreateTask,
                    lead: "me lembra de".to_string(),
                },
            ));
        };

        let due_date = entities.date.unwrap_or(request.today);
        let when = match entities.time {
            Some(time) => format!("{} às {}", due_date.format("%d/%m/%Y"), time.format("%H:%M")),
            None => due_date.format("%d/%m/%Y").to_string(),
        };

        let message = format!("Confirma a tarefa \"{}\" para {}?", title, when);
        let data = json!({
            "title": title,
            "dueDate": due_date,
            "dueTime": entities.time,
        });
        let action = PendingAction::CreateTask(TaskAction {
            title,
            description: entities.description.clone(),
            due_date,
            due_time: entities.time,
        });

        Ok(self.services.propose(request, action, message, data))
    }
}
