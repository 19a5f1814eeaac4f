//! Pattern Library
//!
//! Ordered, declarative surface-form tables for intents and entities.
//! Everything here is compiled once and matched against normalized text
//! (lower-case, collapsed whitespace). No state, no allocation beyond the
//! statics themselves.

use crate::models::Intent;
use lazy_static::lazy_static;
use regex::Regex;

/// Money literal in either decimal convention, with or without thousands
/// separators. Alternation order matters: grouped forms first.
pub const NUM: &str = r"\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:[.,]\d{1,2})?";

pub const MONTH_NAMES: &str =
    r"janeiro|fevereiro|mar[çc]o|abril|maio|junho|julho|agosto|setembro|outubro|novembro|dezembro";

const WEEKDAYS: &str = r"segunda|ter[çc]a|quarta|quinta|sexta|s[áa]bado|domingo";

const NUMBER_WORDS: &str =
    r"um|uma|dois|duas|tr[êe]s|quatro|cinco|seis|sete|oito|nove|dez|onze|doze|quinze|vinte|trinta|cinquenta|cem";

const UNIT_WORDS: &str = r"unidades?|un|p[çc]s|pe[çc]as?|itens?|caixas?|pacotes?|kits?|pares?|d[úu]zias?";

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern must compile")
}

lazy_static! {
    // =============================
    // Intent table (first match wins)
    // =============================

    pub static ref INTENT_TABLE: Vec<(Intent, Vec<Regex>)> = vec![
        (Intent::Help, vec![
            re(r"^(?:ajuda|help|socorro|menu|comandos?)\b"),
            re(r"\b(?:o que (?:voc[êe] )?(?:pode|sabe|consegue) fazer|como (?:funciona|usar|uso)|preciso de ajuda|me ajud[ae])\b"),
        ]),
        (Intent::CalculateProfit, vec![
            re(r"\b(?:lucros?|lucrei|lucramos|margem de lucro|resultado do m[êe]s|quanto (?:eu )?ganhei)\b"),
        ]),
        (Intent::CheckRevenue, vec![
            re(r"\b(?:faturamento|quanto (?:eu )?(?:vendi|vendemos|faturei|recebi|entrou)|total (?:de|das) (?:vendas|receitas|entradas)|minhas (?:vendas|receitas))\b"),
            re(r"\b(?:vendas|receitas?) (?:de )?(?:hoje|ontem|da semana|desta semana|do m[êe]s|deste m[êe]s|do ano)\b"),
        ]),
        (Intent::CheckExpenses, vec![
            re(r"\b(?:quanto (?:eu )?(?:gastei|paguei|gastamos)|total (?:de|das) (?:despesas|gastos|sa[íi]das)|minhas despesas|meus gastos)\b"),
            re(r"\b(?:despesas|gastos) (?:de )?(?:hoje|ontem|da semana|desta semana|do m[êe]s|deste m[êe]s|do ano)\b"),
        ]),
        (Intent::GenerateInsights, vec![
            re(r"\b(?:insights?|dicas?|sugest(?:ões|oes|ão|ao)|como (?:posso )?(?:melhorar|aumentar)|an[áa]lise do (?:neg[óo]cio|m[êe]s))\b"),
        ]),
        (Intent::AnalyzeProducts, vec![
            re(r"\b(?:mais vendid[oa]s?|menos vendid[oa]s?|produtos? (?:mais|menos) (?:vendid|lucrativ)\w*|analis(?:ar|e|a) (?:os |meus )?produtos|an[áa]lise (?:de|dos) produtos|ranking|estoque baixo|acabando)\b"),
        ]),
        (Intent::CreateTask, vec![
            re(r"\b(?:criar?|crie|adicionar?|adicione|nova|novo|anotar?|anote)\s+(?:uma\s+|um\s+)?(?:tarefa|lembrete)\b"),
            re(r"(?:\bme lembr[ae]\b|\blembre-me\b|\blembrar de\b|^tarefa\b|^lembrete\b)"),
        ]),
        (Intent::ListProducts, vec![
            re(r"\b(?:list(?:ar|e|a)|mostr(?:ar|e|a)|ver|exib(?:ir|a|e)|quais s[ãa]o)\s+(?:todos\s+)?(?:os\s+)?(?:meus\s+)?produtos\b"),
            re(r"\b(?:meus produtos|cat[áa]logo|todos os produtos|lista de produtos)\b"),
        ]),
        (Intent::SearchProduct, vec![
            re(r"\b(?:buscar?|busque|procurar?|procure|pesquisar?|pesquise|encontrar|encontre)\b"),
        ]),
        (Intent::SellProduct, vec![
            re(r"\b(?:vendi|vendemos|vendeu|venderam|vender|vendido|vendida|venda)\b"),
        ]),
        (Intent::RegisterIncome, vec![
            re(r"\b(?:recebi|recebemos|receber|ganhei|ganhamos|faturei|entrou|entrada de|receita de|registrar receita|nova receita|renda de)\b"),
        ]),
        (Intent::RegisterExpense, vec![
            re(r"\b(?:gastei|gastamos|paguei|pagamos|despesa|gasto|gastos com|conta de|pagar|pago)\b"),
        ]),
        (Intent::RestockProduct, vec![
            re(r"\b(?:repor|reponha|repus|reabastecer|reabaste[çc]a|reabasteci|adicionar estoque|adicionei|chegaram|chegou|entrada de estoque)\b"),
            re(r"\b(?:adicionar|adicione|coloque|colocar)\s+\d+"),
        ]),
        (Intent::BuyProduct, vec![
            re(r"\b(?:comprei|compramos|comprou|comprar|compra)\b"),
        ]),
        (Intent::CheckStock, vec![
            re(r"\b(?:estoque|quant[oa]s|quanto (?:eu )?(?:tem|tenho|temos|resta|sobrou)|ainda tem|tem (?:algum|alguma|ainda)|dispon[íi]ve(?:l|is))\b"),
            re(r"^(?:tem|temos|h[áa])\s+.+\?$"),
        ]),
    ];

    // =============================
    // Priority override: purchase + money
    // =============================

    pub static ref PURCHASE_VERB: Regex = re(r"\b(?:comprei|compramos|comprou|comprar|compra)\b");
    pub static ref CURRENCY_TAGGED: Regex = re(&format!(r"r\$\s*(?:{num})|(?:{num})\s*(?:reais|real)\b", num = NUM));
    pub static ref UNIT_WORD: Regex = re(&format!(r"^(?:{})\b", UNIT_WORDS));

    // =============================
    // Money
    // =============================

    pub static ref MONEY_PREFIXED: Regex = re(&format!(r"r\$\s*({})", NUM));
    pub static ref MONEY_LED: Regex = re(&format!(
        r"\b(no valor de|valor de|total de|por|de|custou|custa|custando|vale|gastei|gastamos|paguei|pagamos|pago|recebi|recebemos|ganhei|faturei)\s+(?:r\$\s*)?({})\b",
        NUM
    ));
    pub static ref MONEY_BARE: Regex = re(&format!(r"\b({})\b", NUM));
    pub static ref MONEY_SUFFIX: Regex = re(&format!(r"\b({})\s*(?:reais|real|conto|contos|pila)\b", NUM));
    pub static ref PAYMENT_CONTEXT: Regex = re(r"\b(?:reais|real|pag\w*|compr\w*|gast\w*|cust\w*|valor|pre[çc]o|total|receb\w*)\b");
    pub static ref INSTALLMENT_MARKER_AFTER: Regex = re(r"^\s*(?:x\b|vezes\b|parcelas?\b|presta[çc](?:ões|oes|ão|ao)\b)");
    pub static ref PERCENT_SPAN: Regex = re(r"\d{1,3}(?:[.,]\d{1,2})?\s*(?:%|por cento)");

    // =============================
    // Installments and recurrence
    // =============================

    pub static ref INSTALLMENT_NX: Regex = re(&format!(
        r"(?:\bem\s+)?\b(\d{{1,3}})\s*x\b(?:\s+(?:de|parcelas de)\s+(?:r\$\s*)?({num})(?:\s*(?:reais|real))?)?",
        num = NUM
    ));
    pub static ref INSTALLMENT_WORDS: Regex = re(&format!(
        r"(?:\bem\s+)?\b(\d{{1,3}})\s+(?:vezes|parcelas|presta[çc](?:ões|oes))(?:\s+(?:mensais|semanais|trimestrais))?(?:\s+de\s+(?:r\$\s*)?({num})(?:\s*(?:reais|real))?)?",
        num = NUM
    ));
    pub static ref INSTALLMENT_PARCELADO: Regex = re(r"\bparcelad[oa]s?\s+em\s+(\d{1,3})(?:\s*x\b|\s+vezes\b|\s+parcelas\b)?");
    pub static ref INSTALLMENT_WEEKLY: Regex = re(r"\b(?:semanais|semanalmente|por semana|toda semana)\b");
    pub static ref INSTALLMENT_QUARTERLY: Regex = re(r"\b(?:trimestrais|trimestralmente|a cada 3 meses)\b");

    pub static ref RECUR_EVERY_N: Regex = re(r"\ba cada (\d{1,2}) (semanas?|m[eê]s(?:es)?)\b");
    pub static ref RECUR_WEEKLY: Regex = re(r"\b(?:toda semana|todas as semanas|semanalmente|semanal|por semana)\b");
    pub static ref RECUR_MONTHLY: Regex = re(r"\b(?:todo m[eê]s|todos os meses|mensalmente|mensal|por m[eê]s|ao m[eê]s)\b");
    pub static ref RECUR_QUARTERLY: Regex = re(r"\b(?:todo trimestre|trimestralmente|trimestral)\b");
    pub static ref RECUR_YEARLY: Regex = re(r"\b(?:todo ano|todos os anos|anualmente|anual|por ano|ao ano)\b");
    pub static ref RECUR_MARKER: Regex = re(r"\b(?:fix[oa]s?|recorrentes?)\b");
    pub static ref RECUR_END_NUMERIC: Regex = re(r"\bat[ée]\s+(?:o\s+)?(?:dia\s+)?(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b");
    pub static ref RECUR_END_NAMED: Regex = re(&format!(
        r"\bat[ée]\s+(?:o\s+)?(?:dia\s+)?(\d{{1,2}})\s+de\s+({months})(?:\s+de\s+(\d{{4}}))?\b",
        months = MONTH_NAMES
    ));
    pub static ref RECUR_END_MONTH: Regex = re(&format!(
        r"\bat[ée]\s+(?:o\s+m[eê]s\s+de\s+)?({months})(?:\s+de\s+(\d{{4}}))?\b",
        months = MONTH_NAMES
    ));

    // =============================
    // Dates
    // =============================

    pub static ref DATE_NUMERIC: Regex = re(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b");
    pub static ref DATE_NAMED: Regex = re(&format!(
        r"\b(\d{{1,2}})\s+de\s+({months})(?:\s+de\s+(\d{{4}}))?\b",
        months = MONTH_NAMES
    ));
    pub static ref DATE_DAY_ONLY: Regex = re(r"\bdia\s+(\d{1,2})\b");
    pub static ref DATE_DAY_AFTER_TOMORROW: Regex = re(r"\bdepois de amanh[ãa]\b");
    pub static ref DATE_DAY_BEFORE_YESTERDAY: Regex = re(r"\banteontem\b");
    pub static ref DATE_YESTERDAY: Regex = re(r"\bontem\b");
    pub static ref DATE_TOMORROW: Regex = re(r"\bamanh[ãa]\b");
    pub static ref DATE_TODAY: Regex = re(r"\bhoje\b");
    pub static ref DATE_NEXT_WEEK: Regex = re(r"\b(?:pr[óo]xima semana|semana que vem)\b");
    pub static ref DATE_LAST_WEEK: Regex = re(r"\bsemana passada\b");
    pub static ref DATE_NEXT_MONTH: Regex = re(r"\b(?:pr[óo]ximo m[êe]s|m[êe]s que vem)\b");
    pub static ref DATE_LAST_MONTH: Regex = re(r"\bm[êe]s passado\b");
    pub static ref DATE_WEEKDAY: Regex = re(&format!(
        r"\b(?:(na|no|nesta|neste|nessa|nesse|pr[óo]xim[oa])\s+)?({days})(-feira)?(?:\s+(que vem|passad[oa]))?\b",
        days = WEEKDAYS
    ));

    pub static ref FUTURE_PAYMENT: Regex = re(r"\b(?:vai pagar|v[ãa]o pagar|vou pagar|ser[áa] pag[oa]|ser[ãa]o pag[oa]s|a pagar|pagar depois|vai receber|vou receber|a receber|receber depois|ser[áa] recebid[oa]|m[êe]s que vem|pr[óo]ximo m[êe]s|semana que vem|pr[óo]xima semana|fiado|na conta|vence|vencimento)\b");

    // =============================
    // Quantities, payment method, fee, time
    // =============================

    pub static ref QTY_UNITS: Regex = re(&format!(r"\b(\d{{1,5}}|{words})\s*(?:{units})\b", words = NUMBER_WORDS, units = UNIT_WORDS));
    pub static ref QTY_AFTER_VERB: Regex = re(&format!(
        r"\b(?:vendi|vendemos|vendeu|comprei|compramos|comprou|repor|repus|reponha|reabastecer|reabasteci|adicionar|adicionei|adicione|chegaram|chegou|coloquei|colocar|coloque)\s+(?:mais\s+)?(\d{{1,5}}|{words})\b",
        words = NUMBER_WORDS
    ));
    pub static ref QTY_NOT_FOLLOWED: Regex = re(r"^\s*(?:reais|real|r\$|x\b|%|vezes|parcelas|conto|contos)");

    pub static ref PAYMENT_METHOD: Regex = re(r"\b(pix|dinheiro|esp[ée]cie|d[ée]bito|cr[ée]dito|cart[ãa]o|maquininha)\b");
    pub static ref FEE_PERCENT: Regex = re(r"\btaxa\s+(?:de\s+)?(\d{1,2}(?:[.,]\d{1,2})?)\s*(?:%|por cento)|(\d{1,2}(?:[.,]\d{1,2})?)\s*(?:%|por cento)\s+(?:de\s+)?taxa\b");
    pub static ref TIME_OF_DAY: Regex = re(r"\b(?:[àa]s\s+)?(\d{1,2})(?:(?::|h)(\d{2})|h)(?:\s*horas)?\b|\b[àa]s\s+(\d{1,2})(?:\s*horas)?\b");

    // =============================
    // Product names and descriptions
    // =============================

    pub static ref SELL_TEMPLATE: Regex = re(r"\b(?:vendi|vendemos|vendeu|venderam|vender|venda d[eoa]s?|venda)\b");
    pub static ref BUY_TEMPLATE: Regex = re(r"\b(?:comprei|compramos|comprou|comprar|compra d[eoa]s?|compra)\b");
    pub static ref RESTOCK_TEMPLATE: Regex = re(r"\b(?:repor|reponha|repus|reabastecer|reabaste[çc]a|reabasteci|adicionar|adicionei|adicione|coloque|colocar|chegaram|chegou|entrada de estoque)\b(?:\s+(?:o\s+)?estoque)?");
    pub static ref CHECK_STOCK_TEMPLATES: Vec<Regex> = vec![
        re(r"\bestoque\s+(?:d[oae]s?|para|pro|pra)\s+(.+)"),
        re(r"\bquant[oa]s\s+(.+?)\s+(?:eu\s+)?(?:tenho|tem|temos|h[áa]|restam|sobraram|sobrou|ainda)\b"),
        re(r"\bquant[oa]s?\s+(?:eu\s+)?(?:tenho|tem|temos|h[áa]|restam|resta|sobrou|sobraram)\s+(?:de\s+|d[oa]s?\s+)?(.+)"),
        re(r"\b(?:ainda tem|tem ainda|tem|temos|h[áa])\s+(.+?)(?:\s+(?:em|no)\s+estoque)?\s*\??$"),
    ];
    pub static ref SEARCH_TEMPLATE: Regex = re(r"\b(?:buscar?|busque|procurar?|procure|pesquisar?|pesquise|encontrar|encontre)\s+(?:por\s+)?(?:produtos?\s+)?(.+)");
    pub static ref LEADING_FILLER: Regex = re(&format!(
        r"^(?:(?:mais|fiado|\d{{1,5}}|{words}|o|a|os|as|uns|umas|de|do|da|dos|das|meu|minha|meus|minhas)\s+)*(?:(?:{units})\s+(?:de|d[oa]s?)\s+)?(?:(?:o|a|os|as)\s+)?",
        words = NUMBER_WORDS,
        units = UNIT_WORDS
    ));
    pub static ref TRAILING_CLAUSE: Regex = re(concat!(
        r"\s+(?:(?:por|pra|para|pelo|pela|no valor|hoje|ontem|anteontem|amanh[ãa]|[àa] vista|semana|m[êe]s|toda|todo|a cada|que vem)\b",
        r"|em\s+\d|parcelad|com\s+(?:taxa|desconto|juros)\b",
        r"|no\s+(?:cart[ãa]o|pix|dinheiro|d[ée]bito|cr[ée]dito|boleto)\b|na\s+(?:maquininha|m[áa]quina)\b",
        r"|no\s+dia\b|dia\s+\d|na\s+(?:segunda|ter[çc]a|quarta|quinta|sexta)\b|no\s+(?:s[áa]bado|domingo)\b",
        r"|r\$|\d|at[ée]\s|e\s+(?:recebi|ganhei|paguei)\b)",
        r"|\s+de\s+(?:r\$\s*)?\d|[,;!?]|\.\s"
    ));
    pub static ref DESCRIPTION_VERB: Regex = re(r"^.*?\b(?:gastei|gastamos|paguei|pagamos|pagar|pago|despesa|gasto|gastos|recebi|recebemos|ganhei|ganhamos|faturei|entrou|entrada|receita|renda|comprei|compramos|comprou|compra)\b");
    pub static ref LEADING_PREPOSITION: Regex = re(r"^(?:(?:com|de|em|no|na|nos|nas|pelo|pela|para|pra|pro|do|da|dos|das|o|a|os|as|um|uma)\s+)+");
    pub static ref TASK_TITLE: Vec<Regex> = vec![
        re(r"\b(?:tarefa|lembrete)\s*(?::|de|para|pra)?\s+(.+)"),
        re(r"\b(?:me lembr[ae]|lembre-me|lembrar)\s+(?:de\s+|que\s+)?(.+)"),
    ];

    // =============================
    // Dialogue replies
    // =============================

    pub static ref AFFIRMATIVE: Regex = re(r"^(?:sim|s|isso|pode|confirmo|confirmar?|ok|okay|claro|com certeza|yes|quero|beleza|certo|exato|correto|bora|positivo|manda)\b");
    pub static ref NEGATIVE: Regex = re(r"^(?:n[ãa]o|n|nope|negativo|nada|nem|agora n[ãa]o)\b");
    pub static ref CANCEL: Regex = re(r"^(?:cancela|cancelar|cancele|esquece|esque[çc]a|deixa pra l[áa]|desistir|desisto|sair)\b");
    pub static ref BARE_MONEY: Regex = re(&format!(r"^(?:[ée]\s+|foi\s+|valor\s+(?:de\s+)?)?(?:r\$\s*)?({})\s*(?:reais|real)?[.!]?$", NUM));
    pub static ref SELECTION_NUMBER: Regex = re(r"^(?:o\s+|a\s+|op[çc][ãa]o\s+|n[úu]mero\s+|produto\s+|item\s+)?(\d{1,3})\s*(?:º|°|ª|o)?[.!]?$");
    pub static ref SELECTION_WORD: Regex = re(r"^(?:o\s+|a\s+)?(primeir[oa]|segund[oa]|terceir[oa]|quart[oa]|quint[oa]|sext[oa]|s[ée]tim[oa]|oitav[oa]|non[oa]|d[ée]cim[oa]|um|uma|dois|duas|tr[êe]s|quatro|cinco|seis|sete|oito|nove|dez)(?:\s+op[çc][ãa]o)?[.!]?$");
    pub static ref FEE_REPLY: Regex = re(r"^(?:sim,?\s*)?(?:[ée]\s+|foi\s+|de\s+|taxa\s+(?:de\s+)?)?(\d{1,2}(?:[.,]\d{1,2})?)\s*(?:%|por cento)?[.!]?$");
    pub static ref ACTION_VERBS: Regex = re(r"\b(?:vendi|vendemos|vendeu|comprei|compramos|comprou|gastei|gastamos|paguei|pagamos|recebi|recebemos|ganhei|faturei|repor|reponha|repus|reabastecer|reabasteci|adicionei)\b");

    // =============================
    // Analytics periods
    // =============================

    pub static ref PERIOD_TODAY: Regex = re(r"\bhoje\b");
    pub static ref PERIOD_YESTERDAY: Regex = re(r"\bontem\b");
    pub static ref PERIOD_LAST_WEEK: Regex = re(r"\bsemana passada\b");
    pub static ref PERIOD_WEEK: Regex = re(r"\bsemana\b");
    pub static ref PERIOD_LAST_MONTH: Regex = re(r"\bm[êe]s passado\b");
    pub static ref PERIOD_YEAR: Regex = re(r"\bano\b");

    pub static ref CURRENCY_WORD: Regex = re(r"r\$|\b(?:reais|real|conto|contos)\b");
}

/// Expense category keyword map, checked in order
pub const EXPENSE_CATEGORIES: &[(&str, &[&str])] = &[
    ("transporte", &["transporte", "uber", "99", "táxi", "taxi", "ônibus", "onibus", "gasolina", "combustível", "combustivel", "estacionamento", "pedágio", "pedagio", "frete"]),
    ("alimentação", &["alimentação", "alimentacao", "almoço", "almoco", "jantar", "lanche", "comida", "restaurante", "mercado", "café", "cafe"]),
    ("aluguel", &["aluguel", "condomínio", "condominio"]),
    ("energia", &["luz", "energia", "conta de luz"]),
    ("água", &["água", "agua", "conta de água", "conta de agua"]),
    ("internet", &["internet", "wi-fi", "wifi", "telefone", "celular"]),
    ("fornecedores", &["fornecedor", "fornecedores", "material", "materiais", "matéria-prima", "materia prima", "mercadoria", "mercadorias", "insumos", "embalagem", "embalagens"]),
    ("marketing", &["marketing", "anúncio", "anuncio", "anúncios", "propaganda", "instagram", "facebook", "ads", "impulsionamento", "panfleto"]),
    ("salários", &["salário", "salario", "salários", "funcionário", "funcionario", "funcionária", "diarista", "ajudante"]),
    ("impostos", &["imposto", "impostos", "das", "mei", "inss", "tributo", "tributos"]),
    ("manutenção", &["manutenção", "manutencao", "conserto", "reparo"]),
    ("equipamentos", &["equipamento", "equipamentos", "máquina", "maquina", "computador", "ferramenta", "ferramentas"]),
];

/// Income category keyword map, checked in order
pub const INCOME_CATEGORIES: &[(&str, &[&str])] = &[
    ("vendas", &["venda", "vendas", "cliente", "clientes", "encomenda"]),
    ("serviços", &["serviço", "servico", "serviços", "consultoria", "trabalho", "freela", "freelance", "conserto"]),
    ("investimentos", &["rendimento", "rendimentos", "investimento", "juros", "dividendos"]),
];

/// Lower-case and collapse whitespace
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_affirmative(text: &str) -> bool {
    AFFIRMATIVE.is_match(text)
}

pub fn is_negative(text: &str) -> bool {
    NEGATIVE.is_match(text) && !AFFIRMATIVE.is_match(text)
}

pub fn is_cancel(text: &str) -> bool {
    CANCEL.is_match(text)
}

/// Reply that is only a yes/no with nothing else to act on
pub fn is_bare_yes_no(text: &str) -> bool {
    let trimmed = text.trim_end_matches(|c: char| c == '.' || c == '!');
    (is_affirmative(trimmed) || is_negative(trimmed)) && trimmed.split_whitespace().count() <= 3
}

/// Sentence contains an explicit transactional verb ("vendi", "paguei", ...)
pub fn has_action_verb(text: &str) -> bool {
    ACTION_VERBS.is_match(text)
}

/// 1-based menu choice from "2", "o 2", "opção 2", "segundo", "dois"
pub fn parse_selection(text: &str) -> Option<usize> {
    if let Some(caps) = SELECTION_NUMBER.captures(text) {
        return caps.get(1)?.as_str().parse::<usize>().ok();
    }

    let caps = SELECTION_WORD.captures(text)?;
    let word = caps.get(1)?.as_str();
    ordinal_value(word).or_else(|| number_word_value(word).map(|n| n as usize))
}

fn ordinal_value(word: &str) -> Option<usize> {
    let stem = word.trim_end_matches(|c| c == 'o' || c == 'a');
    let value = match stem {
        "primeir" => 1,
        "segund" => 2,
        "terceir" => 3,
        "quart" => 4,
        "quint" => 5,
        "sext" => 6,
        "sétim" | "setim" => 7,
        "oitav" => 8,
        "non" => 9,
        "décim" | "decim" => 10,
        _ => return None,
    };
    Some(value)
}

/// Portuguese cardinal words used for quantities
pub fn number_word_value(word: &str) -> Option<u32> {
    let value = match word {
        "um" | "uma" => 1,
        "dois" | "duas" => 2,
        "três" | "tres" => 3,
        "quatro" => 4,
        "cinco" => 5,
        "seis" => 6,
        "sete" => 7,
        "oito" => 8,
        "nove" => 9,
        "dez" => 10,
        "onze" => 11,
        "doze" => 12,
        "quinze" => 15,
        "vinte" => 20,
        "trinta" => 30,
        "cinquenta" => 50,
        "cem" => 100,
        _ => return None,
    };
    Some(value)
}

pub fn month_from_name(name: &str) -> Option<u32> {
    let month = match name {
        "janeiro" => 1,
        "fevereiro" => 2,
        "março" | "marco" => 3,
        "abril" => 4,
        "maio" => 5,
        "junho" => 6,
        "julho" => 7,
        "agosto" => 8,
        "setembro" => 9,
        "outubro" => 10,
        "novembro" => 11,
        "dezembro" => 12,
        _ => return None,
    };
    Some(month)
}

/// chrono weekday number (Monday = 0) for a Portuguese weekday name
pub fn weekday_from_name(name: &str) -> Option<u32> {
    let day = match name {
        "segunda" => 0,
        "terça" | "terca" => 1,
        "quarta" => 2,
        "quinta" => 3,
        "sexta" => 4,
        "sábado" | "sabado" => 5,
        "domingo" => 6,
        _ => return None,
    };
    Some(day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_and_lowercases() {
        assert_eq!(normalize("  Vendi   o COLAR\n de Pérolas "), "vendi o colar de pérolas");
    }

    #[test]
    fn test_yes_no_detection() {
        assert!(is_affirmative("sim"));
        assert!(is_affirmative("pode sim"));
        assert!(is_negative("não"));
        assert!(is_negative("nao quero"));
        assert!(!is_negative("sim"));
        assert!(is_bare_yes_no("sim!"));
        assert!(!is_bare_yes_no("sim quero vender o colar de pérolas hoje"));
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!(parse_selection("2"), Some(2));
        assert_eq!(parse_selection("o 3"), Some(3));
        assert_eq!(parse_selection("opção 1"), Some(1));
        assert_eq!(parse_selection("segundo"), Some(2));
        assert_eq!(parse_selection("a terceira"), Some(3));
        assert_eq!(parse_selection("dois"), Some(2));
        assert_eq!(parse_selection("vendi 2 colares"), None);
    }

    #[test]
    fn test_intent_table_is_ordered_specific_first() {
        let position = |intent: Intent| INTENT_TABLE.iter().position(|(i, _)| *i == intent).unwrap();
        assert!(position(Intent::CheckRevenue) < position(Intent::SellProduct));
        assert!(position(Intent::CheckExpenses) < position(Intent::RegisterExpense));
        assert!(position(Intent::RegisterExpense) < position(Intent::BuyProduct));
        assert_eq!(INTENT_TABLE.last().map(|(i, _)| *i), Some(Intent::CheckStock));
    }

    #[test]
    fn test_action_verbs() {
        assert!(has_action_verb("vendi 2 colares"));
        assert!(has_action_verb("paguei a luz"));
        assert!(!has_action_verb("2"));
    }
}
