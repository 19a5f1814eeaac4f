//! Product Matcher
//!
//! Fuzzy lookup of a product-name fragment in the catalog snapshot the
//! caller sends with each turn. Three tiers, the first non-empty one wins:
//!
//! 1. substring containment in either direction
//! 2. content-word overlap (a word may contain the other)
//! 3. similarity score: 0.9 on containment, else Jaccard over words longer
//!    than two chars; scores above 0.3 kept, best first

use crate::models::Product;

const STOPWORDS: &[&str] = &[
    "o", "a", "os", "as", "um", "uma", "uns", "umas", "de", "do", "da", "dos", "das", "em", "no",
    "na", "nos", "nas", "com", "para", "pra", "por", "e",
];

const CONTAINMENT_SCORE: f64 = 0.9;
const MIN_SIMILARITY: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    NotFound,
    Unique(&'a Product),
    Ambiguous(Vec<&'a Product>),
}

pub struct ProductMatcher;

impl ProductMatcher {
    pub fn resolve<'a>(products: &'a [Product], fragment: &str) -> MatchOutcome<'a> {
        let mut matches = Self::find_matches(products, fragment);
        match matches.len() {
            0 => MatchOutcome::NotFound,
            1 => MatchOutcome::Unique(matches.remove(0)),
            _ => MatchOutcome::Ambiguous(matches),
        }
    }

    pub fn find_matches<'a>(products: &'a [Product], fragment: &str) -> Vec<&'a Product> {
        let needle = fold(fragment.trim());
        if needle.is_empty() {
            return Vec::new();
        }

        let by_substring: Vec<&Product> = products
            .iter()
            .filter(|p| {
                let name = fold(&p.name);
                name.contains(&needle) || needle.contains(&name)
            })
            .collect();
        if !by_substring.is_empty() {
            return by_substring;
        }

        let needle_words: Vec<String> = content_words(&needle, 1).iter().map(|w| singular(w)).collect();
        let by_keyword: Vec<&Product> = products
            .iter()
            .filter(|p| {
                let name_words: Vec<String> = content_words(&fold(&p.name), 1)
                    .iter()
                    .map(|w| singular(w))
                    .collect();
                needle_words.iter().any(|a| {
                    name_words
                        .iter()
                        .any(|b| a == b || a.contains(b.as_str()) || b.contains(a.as_str()))
                })
            })
            .collect();
        if !by_keyword.is_empty() {
            return by_keyword;
        }

        let mut scored: Vec<(f64, &Product)> = products
            .iter()
            .map(|p| (similarity(&needle, &fold(&p.name)), p))
            .filter(|(score, _)| *score > MIN_SIMILARITY)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(_, p)| p).collect()
    }
}

/// 0.9 when one side contains the other, else Jaccard over content words
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.contains(b) || b.contains(a) {
        return CONTAINMENT_SCORE;
    }

    let left = content_words(a, 2);
    let right = content_words(b, 2);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.iter().filter(|w| right.contains(w)).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

fn content_words(text: &str, min_len: usize) -> Vec<String> {
    let mut words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > min_len && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect();
    words.sort_unstable();
    words.dedup();
    words
}

/// Rough singular of a folded Portuguese word ("aneis" -> "anel",
/// "colares" -> "colar", "botoes" -> "botao")
fn singular(word: &str) -> String {
    let rules: [(&str, &str); 5] = [("oes", "ao"), ("aes", "ao"), ("eis", "el"), ("res", "r"), ("zes", "z")];
    for (suffix, replacement) in rules {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.len() >= 2 {
                return format!("{}{}", stem, replacement);
            }
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if stem.len() >= 3 => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Lower-case and drop Portuguese diacritics so "perolas" finds "Pérolas"
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'ê' | 'è' | 'ë' => 'e',
            'í' | 'î' | 'ì' | 'ï' => 'i',
            'ó' | 'ô' | 'õ' | 'ò' | 'ö' => 'o',
            'ú' | 'û' | 'ù' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_words_count_once() {
        assert_eq!(content_words("colar prata colar", 2), vec!["colar", "prata"]);
        assert_eq!(
            similarity("colar prata colar dourado", "prata dourado colar fino"),
            similarity("colar prata dourado", "prata dourado colar fino")
        );
    }

    fn catalog() -> Vec<Product> {
        vec![
            Product::new("Colar de Pérolas", 120.0, 500),
            Product::new("Colar Dourado", 90.0, 12),
            Product::new("Anel de Prata", 60.0, 30),
            Product::new("Brinco Argola", 35.0, 3),
        ]
    }

    #[test]
    fn test_unique_substring_resolves_directly() {
        let products = catalog();
        match ProductMatcher::resolve(&products, "colar de pérolas") {
            MatchOutcome::Unique(p) => assert_eq!(p.name, "Colar de Pérolas"),
            other => panic!("expected unique match, got {:?}", other),
        }

        match ProductMatcher::resolve(&products, "ANEL") {
            MatchOutcome::Unique(p) => assert_eq!(p.name, "Anel de Prata"),
            other => panic!("expected unique match, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_word_is_ambiguous() {
        let products = catalog();
        match ProductMatcher::resolve(&products, "colar") {
            MatchOutcome::Ambiguous(found) => {
                assert_eq!(found.len(), 2);
                assert_eq!(found[0].name, "Colar de Pérolas");
                assert_eq!(found[1].name, "Colar Dourado");
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_keyword_tier_handles_plurals_and_accents() {
        let products = catalog();
        let found = ProductMatcher::find_matches(&products, "brincos");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Brinco Argola");

        let found = ProductMatcher::find_matches(&products, "perolas");
        assert_eq!(found.len(), 1);

        let found = ProductMatcher::find_matches(&products, "anéis");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Anel de Prata");
    }

    #[test]
    fn test_no_match() {
        let products = catalog();
        assert_eq!(ProductMatcher::resolve(&products, "bolsa"), MatchOutcome::NotFound);
        assert_eq!(ProductMatcher::resolve(&products, "  "), MatchOutcome::NotFound);
    }

    #[test]
    fn test_similarity_scores() {
        assert_eq!(similarity("colar", "colar de perolas"), 0.9);
        let score = similarity("anel prata fina", "anel de prata");
        assert!(score > 0.3 && score < 0.9);
        assert_eq!(similarity("bolsa", "anel"), 0.0);
    }
}
