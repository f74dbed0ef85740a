use crate::core::extraction::ExtractionCascade;
use crate::core::fallback::closed_form_design;
use crate::core::InferenceService;
use crate::domain::model::{
    ComponentValues, DesignRequest, DesignResult, DesignSource, ExtractionStrategy,
};
use crate::utils::error::{DesignError, Result};

pub fn build_prompt(request: &DesignRequest) -> String {
    format!(
        "Design a passive RC bandpass filter with the following specifications:\n\
         - Center frequency: {} Hz\n\
         - Bandwidth: {} Hz\n\
         \n\
         Please calculate the optimal component values (resistors in ohms and capacitors in farads).\n\
         Provide the exact mathematical calculations and formulas used to determine these values.\n\
         Return only the final component values in a valid JSON format with keys: R1, R2, C1, C2, etc.\n",
        request.center_freq, request.bandwidth
    )
}

/// Asks the model for a design and falls back to the closed form whenever
/// the remote path produces nothing usable.
pub struct DesignAcquirer<S: InferenceService> {
    service: S,
    cascade: ExtractionCascade,
}

impl<S: InferenceService> DesignAcquirer<S> {
    pub fn new(service: S) -> Self {
        Self::with_cascade(service, ExtractionCascade::default())
    }

    pub fn with_cascade(service: S, cascade: ExtractionCascade) -> Self {
        Self { service, cascade }
    }

    /// Never fails: every remote or parsing error yields the closed-form design.
    pub async fn acquire(&self, request: &DesignRequest) -> DesignResult {
        match self.request_design(request).await {
            Ok((strategy, components)) => {
                tracing::info!("🤖 Model design recovered via {}", strategy);
                DesignResult {
                    components,
                    source: DesignSource::Model { strategy },
                }
            }
            Err(e) => {
                tracing::warn!("⚠️ Falling back to closed-form design: {}", e);
                DesignResult {
                    components: closed_form_design(request),
                    source: DesignSource::ClosedForm {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    async fn request_design(
        &self,
        request: &DesignRequest,
    ) -> Result<(ExtractionStrategy, ComponentValues)> {
        let prompt = build_prompt(request);
        tracing::debug!("Prompt:\n{}", prompt);

        let streamed = self.service.stream_completion(&prompt).await?;
        if !streamed.reasoning.is_empty() {
            tracing::debug!("Design reasoning:\n{}", streamed.reasoning);
        }

        self.cascade.run(&streamed.answer).ok_or_else(|| {
            tracing::warn!("Failed to parse component values from model response");
            tracing::warn!("Raw response: {}", streamed.answer);
            DesignError::ExtractionError {
                message: "no component values found in model answer".to_string(),
            }
        })
    }
}
