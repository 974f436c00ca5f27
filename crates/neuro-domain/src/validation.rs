//! Veredictos del ciclo de validación del informe.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationPhase {
    /// Consistencia del informe maestro contra sus artifacts fuente.
    ContentCheck,
    /// Presencia de los valores cruciales en el documento renderizado.
    RenderedArtifactCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub phase: ValidationPhase,
    pub outcome: ValidationOutcome,
    /// Presente sólo cuando el veredicto es Rejected y se generó una
    /// versión corregida.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub corrected_artifact_ref: Option<String>,
}

impl ValidationVerdict {
    pub fn approved(phase: ValidationPhase) -> Self {
        Self { phase, outcome: ValidationOutcome::Approved, corrected_artifact_ref: None }
    }

    pub fn rejected(phase: ValidationPhase, corrected_artifact_ref: String) -> Self {
        Self { phase,
               outcome: ValidationOutcome::Rejected,
               corrected_artifact_ref: Some(corrected_artifact_ref) }
    }

    pub fn is_approved(&self) -> bool {
        self.outcome == ValidationOutcome::Approved
    }
}
