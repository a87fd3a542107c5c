//! Token usage and cost estimation.
//!
//! Prices are USD per one million tokens, input and output, as published by
//! each provider. The table is static and only used for the running cost
//! estimate shown to the user; a missing model simply costs nothing.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-model price in USD per 1M tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

const PRICE_TABLE: &[(&str, ModelPrice)] = &[
    ("gemini-2.0-flash", price(0.10, 0.40)),
    ("gemini-2.0-flash-lite", price(0.075, 0.30)),
    ("gemini-2.5-flash", price(0.30, 2.50)),
    ("gemini-2.5-pro", price(1.25, 10.00)),
    ("gpt-4.1-nano", price(0.10, 0.40)),
    ("gpt-4.1-mini", price(0.40, 1.60)),
    ("gpt-4.1", price(2.00, 8.00)),
    ("gpt-4o-mini", price(0.15, 0.60)),
    ("gpt-4o", price(2.50, 10.00)),
    ("claude-3-5-haiku-20241022", price(0.80, 4.00)),
    ("claude-sonnet-4-20250514", price(3.00, 15.00)),
    ("claude-opus-4-20250514", price(15.00, 75.00)),
];

const fn price(input_per_million: f64, output_per_million: f64) -> ModelPrice {
    ModelPrice {
        input_per_million,
        output_per_million,
    }
}

/// Look up the price of a model. Exact match only.
pub fn price_for(model: &str) -> Option<ModelPrice> {
    PRICE_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, p)| *p)
}

/// Estimated cost of one call in USD.
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    match price_for(model) {
        Some(p) => {
            (input_tokens as f64 * p.input_per_million
                + output_tokens as f64 * p.output_per_million)
                / 1_000_000.0
        }
        None => {
            debug!("No price entry for model '{}'; cost counted as 0", model);
            0.0
        }
    }
}

/// Token usage of one successful extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
}

impl Usage {
    pub fn for_model(model: &str, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            estimated_cost_usd: estimate_cost(model, input_tokens, output_tokens),
        }
    }
}

/// Usage summed over a run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
}

impl UsageTotals {
    pub fn add(&mut self, usage: &Usage) {
        self.calls += 1;
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.total_tokens += usage.total_tokens;
        self.estimated_cost_usd += usage.estimated_cost_usd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_cost() {
        // 1M in + 1M out on gpt-4.1-mini = 0.40 + 1.60
        let cost = estimate_cost("gpt-4.1-mini", 1_000_000, 1_000_000);
        assert!((cost - 2.0).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn unknown_model_is_free() {
        assert_eq!(estimate_cost("my-local-llama", 5_000, 5_000), 0.0);
        assert!(price_for("my-local-llama").is_none());
    }

    #[test]
    fn totals_accumulate() {
        let mut totals = UsageTotals::default();
        totals.add(&Usage::for_model("gemini-2.0-flash", 2_000, 500));
        totals.add(&Usage::for_model("gemini-2.0-flash", 1_000, 250));
        assert_eq!(totals.calls, 2);
        assert_eq!(totals.input_tokens, 3_000);
        assert_eq!(totals.output_tokens, 750);
        assert_eq!(totals.total_tokens, 3_750);
        let expected = (3_000.0 * 0.10 + 750.0 * 0.40) / 1_000_000.0;
        assert!((totals.estimated_cost_usd - expected).abs() < 1e-12);
    }

    #[test]
    fn usage_serialises_camel_case() {
        let json = serde_json::to_value(Usage::for_model("gpt-4.1", 10, 5)).unwrap();
        assert_eq!(json["totalTokens"], 15);
        assert!(json.get("estimatedCostUsd").is_some());
    }
}
