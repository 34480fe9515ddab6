//! Offline verification and inspection of attestation exports

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::attestation::{AttestationExport, EXPORT_VERSION};
use crate::{GatewayError, Result};

/// Result of verifying an export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportVerification {
    pub valid: bool,
    pub attestation_count: usize,
    pub signer: String,
    pub errors: Vec<String>,
}

/// Verify every attestation in an export
///
/// An attestation fails if its signature does not verify or it was signed by
/// a key other than the export's signer.
pub fn verify_export_json(json: &str) -> ExportVerification {
    let export: AttestationExport = match serde_json::from_str(json) {
        Ok(export) => export,
        Err(e) => {
            return ExportVerification {
                valid: false,
                attestation_count: 0,
                signer: "unknown".to_string(),
                errors: vec![format!("Failed to parse export: {}", e)],
            }
        }
    };

    let mut errors = Vec::new();
    if export.version != EXPORT_VERSION {
        errors.push(format!(
            "Unsupported export version {} (expected {})",
            export.version, EXPORT_VERSION
        ));
    }
    for attestation in &export.attestations {
        if !attestation.signature.is_from(&export.signer_public_key) {
            errors.push(format!("{}: signed by a different key", attestation.id));
        } else if !attestation.verify() {
            errors.push(format!("{}: signature verification failed", attestation.id));
        }
    }

    ExportVerification {
        valid: errors.is_empty(),
        attestation_count: export.attestations.len(),
        signer: export.signer_public_key.key,
        errors,
    }
}

pub fn verify_export_file(path: impl AsRef<Path>) -> Result<ExportVerification> {
    let content = std::fs::read_to_string(path)?;
    Ok(verify_export_json(&content))
}

/// One line of an inspection listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationSummary {
    pub attestation_id: String,
    pub execution_id: String,
    pub risk_tier: String,
    pub outcome: String,
    pub scope_count: usize,
    pub signature_valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInspection {
    pub version: u32,
    pub exported_at: String,
    pub signer_public_key: String,
    pub attestations: Vec<AttestationSummary>,
}

pub fn inspect_export_json(json: &str) -> Result<ExportInspection> {
    let export: AttestationExport =
        serde_json::from_str(json).map_err(|e| GatewayError::InvalidExport(e.to_string()))?;

    Ok(ExportInspection {
        version: export.version,
        exported_at: export.exported_at.to_rfc3339(),
        signer_public_key: export.signer_public_key.key.clone(),
        attestations: export
            .attestations
            .iter()
            .map(|a| AttestationSummary {
                attestation_id: a.id.to_string(),
                execution_id: a.execution_id.to_string(),
                risk_tier: a.risk_tier.as_str().to_string(),
                outcome: a.outcome.as_str().to_string(),
                scope_count: a.approved_scopes.len(),
                signature_valid: a.signature.is_from(&export.signer_public_key) && a.verify(),
            })
            .collect(),
    })
}

pub fn inspect_export_file(path: impl AsRef<Path>) -> Result<ExportInspection> {
    let content = std::fs::read_to_string(path)?;
    inspect_export_json(&content)
}
