use serde::Serialize;

use crate::error::{ResidencyError, Result};
use crate::prompts::{compare_prompt, insights_prompt, AnalysisMode, SongMetadata};
use crate::runtime::{GenerationRequest, GenerationResult};
use crate::ResidencyManager;

#[derive(Clone, Debug, Serialize)]
pub struct Analysis {
    pub analysis: String,
    pub mode: AnalysisMode,
}

#[derive(Clone, Debug, Serialize)]
pub struct Comparison {
    pub comparison: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Insights {
    pub insights: String,
}

/// Front door for text generation against whatever model is resident.
#[derive(Clone)]
pub struct GenerationDispatcher {
    manager: ResidencyManager,
}

impl GenerationDispatcher {
    pub fn new(manager: ResidencyManager) -> Self {
        Self { manager }
    }

    /// Fails with `InvalidState` when nothing is resident. Malformed
    /// requests are rejected before the slot is touched.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        request.validate().map_err(ResidencyError::InvalidRequest)?;
        self.manager.run_generation(request).await
    }

    pub async fn generate_text(&self, prompt: &str, max_length: u32, temperature: Option<f32>) -> Result<String> {
        let mut request = GenerationRequest::new(prompt, max_length);
        request.temperature = temperature;
        Ok(self.generate(request).await?.text)
    }

    pub async fn analyze(&self, text: &str, mode: &str) -> Result<Analysis> {
        require_text("text", text)?;
        let mode = AnalysisMode::parse(mode);
        let analysis = self.generate_text(&mode.prompt(text), mode.max_length(), None).await?;
        Ok(Analysis { analysis: analysis.trim().to_string(), mode })
    }

    pub async fn compare(&self, a: &str, b: &str) -> Result<Comparison> {
        require_text("a", a)?;
        require_text("b", b)?;
        let (prompt, max_length) = compare_prompt(a, b);
        let comparison = self.generate_text(&prompt, max_length, None).await?;
        Ok(Comparison { comparison: comparison.trim().to_string() })
    }

    pub async fn insights(&self, text: &str, metadata: &SongMetadata) -> Result<Insights> {
        require_text("text", text)?;
        let (prompt, max_length) = insights_prompt(text, metadata);
        let insights = self.generate_text(&prompt, max_length, None).await?;
        Ok(Insights { insights: insights.trim().to_string() })
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ResidencyError::InvalidRequest(format!("{field} is empty")));
    }
    Ok(())
}
