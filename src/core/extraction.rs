//! Recovery of component values from free-form model answers.
//!
//! Each [`Extractor`] is one independent strategy. [`ExtractionCascade`] runs
//! them in order and keeps the first result that holds only finite, positive
//! values.

use crate::domain::model::{ComponentValues, ExtractionStrategy};
use regex::Regex;
use std::sync::LazyLock;

/// Labels searched for by [`LabeledValues`] by default.
pub const EXPECTED_LABELS: [&str; 4] = ["R1", "R2", "C1", "C2"];

static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?i:json)?\s*(\{[\s\S]*?\})\s*```").expect("fenced block pattern is valid")
});

const NUMBER_PATTERN: &str = r"[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?";

pub trait Extractor: Send + Sync {
    fn strategy(&self) -> ExtractionStrategy;
    fn extract(&self, answer: &str) -> Option<ComponentValues>;
}

fn parse_object(text: &str) -> Option<ComponentValues> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(object)) => {
            let values = ComponentValues::from_json_object(&object);
            (!values.is_empty()).then_some(values)
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("JSON candidate rejected: {}", e);
            None
        }
    }
}

/// A ```` ```json { ... } ``` ```` block anywhere in the answer. Blocks with
/// non-positive or non-finite values are skipped so a later corrected block
/// can still win.
#[derive(Debug, Default, Clone, Copy)]
pub struct FencedJson;

impl Extractor for FencedJson {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::FencedJson
    }

    fn extract(&self, answer: &str) -> Option<ComponentValues> {
        FENCED_OBJECT
            .captures_iter(answer)
            .filter_map(|caps| caps.get(1))
            .find_map(|body| {
                parse_object(body.as_str()).filter(ComponentValues::all_positive_finite)
            })
    }
}

/// The whole answer is a bare JSON object.
#[derive(Debug, Default, Clone, Copy)]
pub struct WholeJson;

impl Extractor for WholeJson {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::WholeJson
    }

    fn extract(&self, answer: &str) -> Option<ComponentValues> {
        parse_object(answer.trim())
    }
}

/// `R1 = 1.5e+3` or `C2: 1e-7` style assignments.
#[derive(Debug, Clone)]
pub struct LabeledValues {
    patterns: Vec<(String, Regex)>,
}

impl LabeledValues {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = labels
            .into_iter()
            .filter_map(|label| {
                let label = label.as_ref();
                let pattern = format!(
                    r"\b{}\s*[=:]\s*({})",
                    regex::escape(label),
                    NUMBER_PATTERN
                );
                match Regex::new(&pattern) {
                    Ok(re) => Some((label.to_string(), re)),
                    Err(e) => {
                        tracing::warn!("Skipping label '{}': {}", label, e);
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }
}

impl Default for LabeledValues {
    fn default() -> Self {
        Self::new(EXPECTED_LABELS)
    }
}

impl Extractor for LabeledValues {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::LabeledValues
    }

    fn extract(&self, answer: &str) -> Option<ComponentValues> {
        let mut values = ComponentValues::new();
        for (label, re) in &self.patterns {
            let number = re
                .captures(answer)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok());
            if let Some(number) = number {
                values.insert(label.clone(), number);
            }
        }
        (!values.is_empty()).then_some(values)
    }
}

pub struct ExtractionCascade {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractionCascade {
    pub fn new(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    /// First strategy whose result is non-empty and physically plausible.
    pub fn run(&self, answer: &str) -> Option<(ExtractionStrategy, ComponentValues)> {
        for extractor in &self.extractors {
            let Some(values) = extractor.extract(answer) else {
                tracing::debug!("No components found via {}", extractor.strategy());
                continue;
            };

            if !values.all_positive_finite() {
                tracing::warn!(
                    "⚠️ Discarding {} result with non-positive or non-finite values: {}",
                    extractor.strategy(),
                    values
                );
                continue;
            }

            tracing::debug!("Components found via {}: {}", extractor.strategy(), values);
            return Some((extractor.strategy(), values));
        }
        None
    }
}

impl Default for ExtractionCascade {
    fn default() -> Self {
        Self::new(vec![
            Box::new(FencedJson),
            Box::new(WholeJson),
            Box::new(LabeledValues::default()),
        ])
    }
}
