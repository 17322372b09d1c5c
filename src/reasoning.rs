//! Reasoning visibility classification.
//!
//! The resolver walks an ordered rule table and reports the first tier any reasoning
//! item satisfies, so one raw trace outranks any number of summaries and a summary
//! outranks encrypted blobs.

use serde::{Deserialize, Serialize};

use crate::types::ReasoningItem;

/// How much of the model's reasoning is observable by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningVisibility {
    /// Full reasoning traces (typical of open weight models).
    Raw,
    /// A sanitized summary of the reasoning.
    Summary,
    /// Reasoning exists but is opaque to the client.
    Encrypted,
    /// No reasoning, or none in a recognizable shape.
    None,
}

impl ReasoningVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningVisibility::Raw => "raw",
            ReasoningVisibility::Summary => "summary",
            ReasoningVisibility::Encrypted => "encrypted",
            ReasoningVisibility::None => "none",
        }
    }
}

/// Result of [`resolve_reasoning_visibility`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningAnalysis<'a> {
    pub level: ReasoningVisibility,
    pub details: &'static str,
    /// Rough token count of the legible reasoning: `len / 4` per item, in bytes.
    ///
    /// This is a heuristic for display purposes only. It is not what the provider
    /// bills, and it is always zero for encrypted or unrecognized reasoning.
    pub estimated_tokens: u64,
    /// The reasoning items the classification was computed from, unmodified.
    pub reasoning_items: Vec<&'a ReasoningItem>,
}

struct VisibilityRule {
    level: ReasoningVisibility,
    details: &'static str,
    matches: fn(&ReasoningItem) -> bool,
    legible: bool,
}

const NO_ITEMS_DETAILS: &str = "no reasoning items found";
const UNKNOWN_FORMAT_DETAILS: &str = "unknown reasoning format";

/// Ordered by preference; the first rule matched by any item wins.
const RULES: &[VisibilityRule] = &[
    VisibilityRule {
        level: ReasoningVisibility::Raw,
        details: "full raw reasoning traces available",
        matches: |item| item.content().is_some() && item.encrypted_content().is_none(),
        legible: true,
    },
    VisibilityRule {
        level: ReasoningVisibility::Summary,
        details: "summarized reasoning available; raw traces not exposed",
        matches: |item| item.summary().is_some(),
        legible: true,
    },
    VisibilityRule {
        level: ReasoningVisibility::Encrypted,
        details: "reasoning is encrypted and not accessible",
        matches: |item| item.encrypted_content().is_some(),
        legible: false,
    },
];

/// Classifies the reasoning tier across a whole set of reasoning items.
///
/// The tier describes the set, not individual items; inspect
/// [`ReasoningAnalysis::reasoning_items`] for per-item detail.
///
/// # Examples
///
/// ```
/// use open_responses::reasoning::{ReasoningVisibility, resolve_reasoning_visibility};
/// use open_responses::types::ReasoningItem;
///
/// let items = vec![
///     ReasoningItem::summarized("checked both totals"),
///     ReasoningItem::raw("15 * 0.8 = 12"),
/// ];
/// let analysis = resolve_reasoning_visibility(&items);
/// assert_eq!(analysis.level, ReasoningVisibility::Raw);
/// assert_eq!(analysis.estimated_tokens, 4 + 3);
/// ```
pub fn resolve_reasoning_visibility<'a, I>(items: I) -> ReasoningAnalysis<'a>
where
    I: IntoIterator<Item = &'a ReasoningItem>,
{
    let reasoning_items: Vec<&ReasoningItem> = items.into_iter().collect();

    if reasoning_items.is_empty() {
        return ReasoningAnalysis {
            level: ReasoningVisibility::None,
            details: NO_ITEMS_DETAILS,
            estimated_tokens: 0,
            reasoning_items,
        };
    }

    let rule = RULES
        .iter()
        .find(|rule| reasoning_items.iter().any(|item| (rule.matches)(*item)));

    match rule {
        Some(rule) => {
            let estimated_tokens = if rule.legible {
                estimate_tokens(&reasoning_items)
            } else {
                0
            };
            ReasoningAnalysis {
                level: rule.level,
                details: rule.details,
                estimated_tokens,
                reasoning_items,
            }
        }
        None => ReasoningAnalysis {
            level: ReasoningVisibility::None,
            details: UNKNOWN_FORMAT_DETAILS,
            estimated_tokens: 0,
            reasoning_items,
        },
    }
}

fn estimate_tokens(items: &[&ReasoningItem]) -> u64 {
    items
        .iter()
        .filter_map(|item| item.legible_text())
        .map(|text| (text.len() / 4) as u64)
        .sum()
}
