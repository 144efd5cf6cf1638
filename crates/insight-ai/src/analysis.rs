//! Predictive maintenance analysis.

use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use insight_types::Device;

use crate::backends::{Backend, backend_for};
use crate::error::{AiError, Result};
use crate::prompt::analysis_prompt;
use crate::settings::AiSettings;

/// Risk level assigned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// A predictive maintenance report for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub risk_level: RiskLevel,
    pub prediction: String,
    pub recommendations: Vec<String>,
}

/// Parse a model answer into an [`Analysis`].
///
/// Models sometimes wrap the object in prose or a code fence, so when the
/// whole text is not valid JSON the span from the first `{` to the last `}`
/// is tried.
pub fn parse_analysis(text: &str) -> Result<Analysis> {
    if let Ok(analysis) = serde_json::from_str(text.trim()) {
        return Ok(analysis);
    }
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(AiError::malformed("no JSON object in analysis"));
    };
    if end < start {
        return Err(AiError::malformed("no JSON object in analysis"));
    }
    serde_json::from_str(&text[start..=end])
        .map_err(|e| AiError::malformed(format!("invalid analysis JSON: {e}")))
}

/// Ask `backend` for an analysis of `device`'s latest reading.
pub async fn analyze_device(backend: &dyn Backend, device: &Device) -> Result<Analysis> {
    let prompt = analysis_prompt(device);
    let text = backend.analyze(&prompt).await?;
    let analysis = parse_analysis(&text)?;
    info!(
        "{} rated {} as {} risk",
        backend.provider(),
        device.id,
        analysis.risk_level
    );
    Ok(analysis)
}

/// Analysis with the active provider, or `None` after logging any failure.
pub async fn predictive_analysis(
    settings: &AiSettings,
    client: Client,
    device: &Device,
) -> Option<Analysis> {
    let result = match backend_for(settings, client) {
        Ok(backend) => analyze_device(backend.as_ref(), device).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            error!(
                "Error getting predictive analysis from {}: {}",
                settings.provider, e
            );
            None
        }
    }
}
