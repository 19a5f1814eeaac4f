//! Product-name fragments keyed by intent

use crate::models::Intent;
use crate::patterns::{
    BUY_TEMPLATE, CHECK_STOCK_TEMPLATES, LEADING_FILLER, MONEY_PREFIXED, MONEY_SUFFIX,
    RESTOCK_TEMPLATE, SEARCH_TEMPLATE, SELL_TEMPLATE, TRAILING_CLAUSE,
};

/// Words that never name a product on their own
const NOT_A_PRODUCT: &[&str] = &[
    "estoque", "produto", "produtos", "item", "itens", "algo", "isso", "tudo", "mais", "coisa",
    "coisas", "eu", "nós", "nos", "ainda", "hoje", "agora",
];

pub fn extract_product_name(text: &str, intent: Intent) -> Option<String> {
    match intent {
        Intent::SellProduct => after_template(text, &SELL_TEMPLATE),
        Intent::BuyProduct => after_template(text, &BUY_TEMPLATE),
        Intent::RestockProduct => after_template(text, &RESTOCK_TEMPLATE),
        Intent::SearchProduct => SEARCH_TEMPLATE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| clean_fragment(m.as_str())),
        Intent::CheckStock => CHECK_STOCK_TEMPLATES.iter().find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| clean_fragment(m.as_str()))
        }),
        _ => None,
    }
}

fn after_template(text: &str, template: &regex::Regex) -> Option<String> {
    let verb = template.find(text)?;
    clean_fragment(&text[verb.end()..])
}

/// Strip money, leading articles/quantities and any trailing clause
fn clean_fragment(raw: &str) -> Option<String> {
    let without_money = MONEY_PREFIXED.replace_all(raw, " ");
    let without_money = MONEY_SUFFIX.replace_all(&without_money, " ");
    let collapsed = without_money.split_whitespace().collect::<Vec<_>>().join(" ");

    let stripped = LEADING_FILLER.replace(&collapsed, "");
    let mut fragment = stripped.to_string();

    if let Some(cut) = TRAILING_CLAUSE.find(&fragment) {
        fragment.truncate(cut.start());
    }

    let fragment = fragment
        .trim()
        .trim_end_matches(|c: char| c == '?' || c == '.' || c == '!' || c == ',')
        .trim();

    let fragment = strip_trailing_stopwords(fragment);
    if fragment.is_empty() || NOT_A_PRODUCT.contains(&fragment.as_str()) {
        return None;
    }
    Some(fragment)
}

fn strip_trailing_stopwords(fragment: &str) -> String {
    const TRAILING: &[&str] = &[
        "de", "do", "da", "dos", "das", "o", "a", "os", "as", "e", "em", "no", "na", "com",
        "tenho", "tem", "temos", "estoque",
    ];

    let mut words: Vec<&str> = fragment.split_whitespace().collect();
    while let Some(last) = words.last() {
        if TRAILING.contains(last) {
            words.pop();
        } else {
            break;
        }
    }
    words.join(" ")
}
