use crate::config::{RenderSettings, DEFAULT_NETLIST_FILE};
use crate::core::acquirer::DesignAcquirer;
use crate::core::netlist::{persist, render_bandpass};
use crate::core::{InferenceService, Storage};
use crate::domain::model::{DesignRequest, DesignResult};
use crate::utils::error::Result;
use crate::utils::validation::Validate;

#[derive(Debug, Clone)]
pub struct DesignOutcome {
    pub result: DesignResult,
    pub netlist: String,
    pub netlist_path: String,
}

/// Request → design → netlist → storage.
pub struct DesignEngine<S: InferenceService, St: Storage> {
    acquirer: DesignAcquirer<S>,
    storage: St,
    render: RenderSettings,
    file_name: String,
}

impl<S: InferenceService, St: Storage> DesignEngine<S, St> {
    pub fn new(service: S, storage: St) -> Self {
        Self {
            acquirer: DesignAcquirer::new(service),
            storage,
            render: RenderSettings::default(),
            file_name: DEFAULT_NETLIST_FILE.to_string(),
        }
    }

    pub fn with_render_settings(mut self, render: RenderSettings) -> Self {
        self.render = render;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub async fn run(&self, request: &DesignRequest) -> Result<DesignOutcome> {
        request.validate()?;

        tracing::info!(
            "🎛️ Designing RC bandpass filter: center {} Hz, bandwidth {} Hz (Q = {:.3})",
            request.center_freq,
            request.bandwidth,
            request.quality_factor()
        );

        let result = self.acquirer.acquire(request).await;
        for (label, value) in result.components.iter() {
            tracing::info!("  {}: {}", label, value);
        }

        let sweep = request
            .sweep()
            .with_points_per_decade(self.render.points_per_decade);
        sweep.validate()?;
        let netlist = render_bandpass(&result.components, self.render.input_amplitude, &sweep);

        let netlist_path = persist(&self.storage, &self.file_name, &netlist).await?;
        tracing::info!("📁 SPICE netlist saved to: {}", netlist_path);

        Ok(DesignOutcome {
            result,
            netlist,
            netlist_path,
        })
    }
}
