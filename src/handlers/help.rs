use super::{CommandHandler, HandlerOutcome, HandlerRequest};
use crate::models::{BotResponse, Intent};
use crate::validation::suggestions::general_examples;
use crate::Result;
use async_trait::async_trait;

const HELP_TEXT: &str = "Posso registrar e consultar o seu negócio por mensagem:\n\
- Vendas: \"vendi 2 colares por 100 reais\", \"vendi o anel em 3x de 50\"\n\
- Despesas: \"gastei 50 reais com transporte\", \"paguei 1500 de aluguel todo mês\"\n\
- Receitas: \"recebi 300 do cliente\"\n\
- Estoque: \"quantos anéis eu tenho?\", \"repor 10 unidades do colar\"\n\
- Produtos: \"listar produtos\", \"buscar colar\"\n\
- Relatórios: \"quanto vendi este mês?\", \"qual meu lucro?\", \"me dê dicas\"\n\
- Tarefas: \"me lembra de pagar o fornecedor amanhã às 10h\"\n\
Antes de gravar qualquer coisa eu peço a sua confirmação. Diga \"cancelar\" para desistir.";

pub struct HelpHandler;

#[async_trait]
impl CommandHandler for HelpHandler {
    fn name(&self) -> &'static str {
        "help"
    }

    fn intents(&self) -> &'static [Intent] {
        &[Intent::Help]
    }

    async fn handle(&self, _request: &HandlerRequest<'_>) -> Result<HandlerOutcome> {
        Ok(HandlerOutcome::reply(
            BotResponse::info(HELP_TEXT).with_suggestions(general_examples()),
        ))
    }
}
