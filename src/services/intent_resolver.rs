use serde::{Deserialize, Serialize};

use crate::utils::{is_valid_address, parse_positive_decimal};

/// Trigger direction of a conditional swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Above,
    Below,
}

impl Comparator {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "above" => Some(Comparator::Above),
            "below" => Some(Comparator::Below),
            _ => None,
        }
    }

    /// Strict comparison: a price equal to the target does not trigger.
    pub fn holds(self, price: f64, target: f64) -> bool {
        match self {
            Comparator::Above => price > target,
            Comparator::Below => price < target,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Above => "above",
            Comparator::Below => "below",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    Transfer {
        amount: String,
        to_address: String,
    },
    Swap {
        amount_in: String,
    },
    ConditionalSwap {
        amount_in: String,
        target_price: f64,
        comparator: Comparator,
    },
    BalanceQuery,
    HistoryQuery,
    Unrecognized,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Literal word, not captured.
    Word(&'static str),
    /// Any of the listed words, not captured.
    AnyOf(&'static [&'static str]),
    /// Any of the listed words, captured lowercased.
    Choice(&'static [&'static str]),
    /// Any token, captured as written.
    Value,
}

// `swap <amount> avax ... when avax is (above|below) <price>`; any words may sit between.
const CONDITIONAL_SWAP_PREFIX: &[Slot] = &[Slot::Word("swap"), Slot::Value, Slot::Word("avax")];

const CONDITIONAL_SWAP_SUFFIX: &[Slot] = &[
    Slot::Word("when"),
    Slot::Word("avax"),
    Slot::Word("is"),
    Slot::Choice(&["above", "below"]),
    Slot::Value,
];

const TRANSFER_RULE: &[Slot] = &[
    Slot::Choice(&["transfer", "send"]),
    Slot::Value,
    Slot::Word("avax"),
    Slot::Word("to"),
    Slot::Value,
];

const SWAP_RULE: &[Slot] = &[
    Slot::Word("swap"),
    Slot::Value,
    Slot::Word("avax"),
    Slot::AnyOf(&["to", "for"]),
    Slot::Word("usdc"),
];

const BALANCE_KEYWORDS: &[&str] = &["balance"];
const HISTORY_KEYWORDS: &[&str] = &["history", "transactions"];

struct Token<'a> {
    raw: &'a str,
    lower: String,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    text.split_whitespace()
        .map(|word| word.trim_end_matches(['.', ',', '!', '?', ';', ':']))
        .filter(|word| !word.is_empty())
        .map(|raw| Token {
            raw,
            lower: raw.to_ascii_lowercase(),
        })
        .collect()
}

fn contains_any_keyword(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

fn match_rule(tokens: &[Token<'_>], rule: &[Slot]) -> Option<Vec<String>> {
    find_rule(tokens, rule).map(|(_, captures)| captures)
}

// First window of tokens matching the rule: its start index and captures in order.
fn find_rule(tokens: &[Token<'_>], rule: &[Slot]) -> Option<(usize, Vec<String>)> {
    if tokens.len() < rule.len() {
        return None;
    }
    'windows: for (start, window) in tokens.windows(rule.len()).enumerate() {
        let mut captures = Vec::new();
        for (token, slot) in window.iter().zip(rule) {
            match slot {
                Slot::Word(word) => {
                    if token.lower != *word {
                        continue 'windows;
                    }
                }
                Slot::AnyOf(words) => {
                    if !words.contains(&token.lower.as_str()) {
                        continue 'windows;
                    }
                }
                Slot::Choice(words) => {
                    if !words.contains(&token.lower.as_str()) {
                        continue 'windows;
                    }
                    captures.push(token.lower.clone());
                }
                Slot::Value => captures.push(token.raw.to_string()),
            }
        }
        return Some((start, captures));
    }
    None
}

fn resolve_conditional_swap(tokens: &[Token<'_>]) -> Option<Intent> {
    let (start, prefix) = find_rule(tokens, CONDITIONAL_SWAP_PREFIX)?;
    let rest = &tokens[start + CONDITIONAL_SWAP_PREFIX.len()..];
    let Some((_, suffix)) = find_rule(rest, CONDITIONAL_SWAP_SUFFIX) else {
        // a price condition we cannot read must never become an immediate swap
        return rest
            .iter()
            .any(|token| token.lower == "when")
            .then_some(Intent::Unrecognized);
    };
    let [amount] = <[String; 1]>::try_from(prefix).ok()?;
    let [comparator, price] = <[String; 2]>::try_from(suffix).ok()?;
    Some(
        conditional_swap_intent(&amount, &comparator, &price).unwrap_or(Intent::Unrecognized),
    )
}

fn conditional_swap_intent(amount: &str, comparator: &str, price: &str) -> Option<Intent> {
    let amount_in = parse_positive_decimal(amount)?;
    let target_price = parse_positive_decimal(price)?.parse::<f64>().ok()?;
    Some(Intent::ConditionalSwap {
        amount_in,
        target_price,
        comparator: Comparator::from_word(comparator)?,
    })
}

fn resolve_transfer(tokens: &[Token<'_>]) -> Option<Intent> {
    let captures = match_rule(tokens, TRANSFER_RULE)?;
    let [_verb, amount, to_address] = <[String; 3]>::try_from(captures).ok()?;
    let intent = match parse_positive_decimal(&amount) {
        Some(amount) if is_valid_address(&to_address) => Intent::Transfer { amount, to_address },
        _ => Intent::Unrecognized,
    };
    Some(intent)
}

fn resolve_swap(tokens: &[Token<'_>]) -> Option<Intent> {
    let captures = match_rule(tokens, SWAP_RULE)?;
    let [amount] = <[String; 1]>::try_from(captures).ok()?;
    Some(match parse_positive_decimal(&amount) {
        Some(amount_in) => Intent::Swap { amount_in },
        None => Intent::Unrecognized,
    })
}

/// Resolves a free-text prompt into a typed intent.
///
/// Rules are tried in a fixed priority order: conditional swap, balance
/// keywords, history keywords, transfer, swap. A rule whose shape matches but
/// whose amount or address is malformed yields `Unrecognized`.
pub fn resolve(prompt: &str) -> Intent {
    let lower = prompt.to_lowercase();
    let tokens = tokenize(prompt);

    if let Some(intent) = resolve_conditional_swap(&tokens) {
        return intent;
    }
    if contains_any_keyword(&lower, BALANCE_KEYWORDS) {
        return Intent::BalanceQuery;
    }
    if contains_any_keyword(&lower, HISTORY_KEYWORDS) {
        return Intent::HistoryQuery;
    }
    if let Some(intent) = resolve_transfer(&tokens) {
        return intent;
    }
    if let Some(intent) = resolve_swap(&tokens) {
        return intent;
    }
    Intent::Unrecognized
}
