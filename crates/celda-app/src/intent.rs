// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

/// The three phrases the console understands, verbatim.
pub const SORT_PHRASE: &str = "Sort the table by sales in descending order";
pub const SCATTER_PHRASE: &str = "Create a scatter plot of sales and costs";
pub const PROFIT_PHRASE: &str = "Insert a column of profits";

pub const GREETING: &str = "Hello! How can I help you today?";
pub const UNRECOGNIZED_REPLY: &str =
    "That command is not supported yet. Pick one of the suggested prompts and try again.";

/// Shortcut labels paired with the exact phrase they inject into the input.
pub const SUGGESTED_PROMPTS: [(&str, &str); 3] = [
    ("sort by sales", SORT_PHRASE),
    ("scatter plot", SCATTER_PHRASE),
    ("profit column", PROFIT_PHRASE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    SortBySales,
    ScatterSalesCosts,
    InsertProfitColumn,
    Unrecognized,
}

impl Intent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SortBySales => "sort_by_sales",
            Self::ScatterSalesCosts => "scatter_sales_costs",
            Self::InsertProfitColumn => "insert_profit_column",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub const fn is_recognized(self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

/// Classify raw user input into an intent.
///
/// Matching is exact and case-sensitive against the canonical phrases; the
/// console is a fixed-command surface, not a language model. Normalization is
/// limited to trimming surrounding whitespace and stripping at most one
/// trailing period.
pub fn classify(raw: &str) -> Intent {
    match normalize(raw) {
        SORT_PHRASE => Intent::SortBySales,
        SCATTER_PHRASE => Intent::ScatterSalesCosts,
        PROFIT_PHRASE => Intent::InsertProfitColumn,
        _ => Intent::Unrecognized,
    }
}

fn normalize(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed)
}
