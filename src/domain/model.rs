use crate::utils::error::Result;
use crate::utils::validation::{validate_minimum, validate_positive_finite, Validate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered `(label, value)` pairs. Resistor labels are `R<n>` in ohms,
/// capacitor labels are `C<n>` in farads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentValues {
    entries: Vec<(String, f64)>,
}

impl ComponentValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing an existing entry in place.
    pub fn insert(&mut self, label: impl Into<String>, value: f64) {
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, value)| *value)
    }

    pub fn get_or(&self, label: &str, default: f64) -> f64 {
        self.get(label).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(label, value)| (label.as_str(), *value))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(label, _)| label.as_str()).collect()
    }

    /// Collects numeric entries (numbers or numeric strings) of a JSON object.
    /// Anything else is skipped.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut values = Self::new();
        for (label, value) in object {
            let number = match value {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match number {
                Some(number) => values.insert(label.clone(), number),
                None => tracing::debug!("Skipping non-numeric component entry '{}'", label),
            }
        }
        values
    }

    pub fn all_positive_finite(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, value)| value.is_finite() && *value > 0.0)
    }
}

impl<L: Into<String>> FromIterator<(L, f64)> for ComponentValues {
    fn from_iter<I: IntoIterator<Item = (L, f64)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (label, value) in iter {
            values.insert(label, value);
        }
        values
    }
}

impl fmt::Display for ComponentValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(label, value)| format!("{}={}", label, value))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Logarithmic AC sweep bounds for the generated deck.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcSweep {
    pub freq_start: f64,
    pub freq_stop: f64,
    pub points_per_decade: u32,
}

impl AcSweep {
    pub const DEFAULT_POINTS_PER_DECADE: u32 = 100;

    pub fn new(freq_start: f64, freq_stop: f64) -> Self {
        Self {
            freq_start,
            freq_stop,
            points_per_decade: Self::DEFAULT_POINTS_PER_DECADE,
        }
    }

    pub fn with_points_per_decade(mut self, points_per_decade: u32) -> Self {
        self.points_per_decade = points_per_decade;
        self
    }
}

impl Validate for AcSweep {
    fn validate(&self) -> Result<()> {
        validate_positive_finite("sweep.freq_start", self.freq_start)?;
        validate_positive_finite("sweep.freq_stop", self.freq_stop)?;
        validate_minimum("sweep.points_per_decade", self.points_per_decade, 1)?;
        if self.freq_stop <= self.freq_start {
            return Err(crate::utils::error::DesignError::ConfigValidationError {
                field: "sweep.freq_stop".to_string(),
                message: format!(
                    "stop frequency {} must be above start frequency {}",
                    self.freq_stop, self.freq_start
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignRequest {
    /// Hz
    pub center_freq: f64,
    /// Hz, span between the -3dB points
    pub bandwidth: f64,
}

impl DesignRequest {
    pub fn new(center_freq: f64, bandwidth: f64) -> Self {
        Self {
            center_freq,
            bandwidth,
        }
    }

    pub fn quality_factor(&self) -> f64 {
        self.center_freq / self.bandwidth
    }

    /// One decade either side of the center frequency.
    pub fn sweep(&self) -> AcSweep {
        AcSweep::new(self.center_freq / 10.0, self.center_freq * 10.0)
    }
}

impl Validate for DesignRequest {
    fn validate(&self) -> Result<()> {
        validate_positive_finite("center_freq", self.center_freq)?;
        validate_positive_finite("bandwidth", self.bandwidth)?;
        if self.bandwidth >= self.center_freq {
            tracing::warn!(
                "⚠️ Bandwidth {} Hz is not below the center frequency {} Hz; the design will be very broad",
                self.bandwidth,
                self.center_freq
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    FencedJson,
    WholeJson,
    LabeledValues,
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionStrategy::FencedJson => "fenced JSON block",
            ExtractionStrategy::WholeJson => "whole-answer JSON",
            ExtractionStrategy::LabeledValues => "labeled values",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DesignSource {
    Model { strategy: ExtractionStrategy },
    ClosedForm { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesignResult {
    pub components: ComponentValues,
    pub source: DesignSource,
}

impl DesignResult {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, DesignSource::ClosedForm { .. })
    }
}

/// A piece of streamed model output, tagged by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFragment {
    Reasoning(String),
    Answer(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamedAnswer {
    pub reasoning: String,
    pub answer: String,
}

impl StreamedAnswer {
    pub fn push(&mut self, fragment: StreamFragment) {
        match fragment {
            StreamFragment::Reasoning(text) => self.reasoning.push_str(&text),
            StreamFragment::Answer(text) => self.answer.push_str(&text),
        }
    }
}

impl FromIterator<StreamFragment> for StreamedAnswer {
    fn from_iter<I: IntoIterator<Item = StreamFragment>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut acc, fragment| {
            acc.push(fragment);
            acc
        })
    }
}
