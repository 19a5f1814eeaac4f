//! Example commands shown next to errors and in help replies

use crate::models::Intent;

const GENERAL: &[&str] = &[
    "vendi 2 colares por 100 reais",
    "gastei 50 reais com transporte",
    "recebi 300 do cliente",
    "quantos anéis eu tenho?",
    "quanto vendi este mês?",
];

pub fn examples_for(intent: Intent) -> Vec<&'static str> {
    let examples: &[&str] = match intent {
        Intent::SellProduct => &[
            "vendi o colar de pérolas",
            "vendi 2 brincos por 80 reais",
            "vendi o anel em 3x de 50 reais",
            "vendi a pulseira por 60, o cliente vai pagar dia 20",
        ],
        Intent::BuyProduct => &[
            "comprei 10 unidades do colar",
            "comprei 200 reais de material",
        ],
        Intent::RegisterExpense => &[
            "gastei 50 reais com transporte",
            "paguei 1500 de aluguel todo mês",
            "paguei 600 de fornecedor em 3x",
        ],
        Intent::RegisterIncome => &[
            "recebi 300 do cliente",
            "recebi 1200 de consultoria",
            "vou receber 500 mês que vem",
        ],
        Intent::CheckStock => &["quantos colares eu tenho?", "estoque do anel"],
        Intent::RestockProduct => &["repor 10 unidades do colar", "chegaram 20 caixas de sabonete"],
        Intent::ListProducts => &["listar produtos", "meus produtos"],
        Intent::SearchProduct => &["buscar anel", "procurar colar"],
        Intent::CalculateProfit => &["qual meu lucro este mês?", "lucro da semana"],
        Intent::GenerateInsights => &["me dê dicas", "como posso melhorar?"],
        Intent::AnalyzeProducts => &["produtos mais vendidos", "quais produtos estão acabando?"],
        Intent::CheckRevenue => &["quanto vendi hoje?", "faturamento do mês"],
        Intent::CheckExpenses => &["quanto gastei este mês?", "despesas da semana"],
        Intent::CreateTask => &["me lembra de pagar o fornecedor amanhã às 10h", "criar tarefa ligar para o cliente"],
        Intent::Help | Intent::Unknown => GENERAL,
    };
    examples.to_vec()
}

pub fn general_examples() -> Vec<&'static str> {
    GENERAL.to_vec()
}
