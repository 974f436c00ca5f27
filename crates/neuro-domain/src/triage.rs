//! Evaluación de urgencia (triaje) del caso.
//!
//! La estimación debe ser derivable de los registros previos; sin datos
//! suficientes el nivel es `indeterminado` con justificación explícita.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Justificación estándar cuando los datos no soportan una estimación.
pub const INSUFFICIENT_INFO: &str = "Información clínica insuficiente para determinar el nivel de prioridad.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Alto,
    Medio,
    Bajo,
    Indeterminado,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Alto => "alto",
            RiskLevel::Medio => "medio",
            RiskLevel::Bajo => "bajo",
            RiskLevel::Indeterminado => "indeterminado",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageAssessment {
    #[serde(rename = "riesgo")]
    pub risk: RiskLevel,
    #[serde(rename = "justificación_triaje")]
    pub justification: String,
}

impl TriageAssessment {
    pub fn new(risk: RiskLevel, justification: String) -> Self {
        Self { risk, justification }
    }

    /// Evaluación conservadora ante información insuficiente.
    pub fn indeterminate() -> Self {
        Self { risk: RiskLevel::Indeterminado,
               justification: INSUFFICIENT_INFO.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_keys_are_spanish() {
        let a = TriageAssessment::new(RiskLevel::Alto, "masa tumoral con p=0.91".into());
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["riesgo"], "alto");
        assert_eq!(json["justificación_triaje"], "masa tumoral con p=0.91");
    }

    #[test]
    fn indeterminate_uses_standard_justification() {
        let a = TriageAssessment::indeterminate();
        assert_eq!(a.risk, RiskLevel::Indeterminado);
        assert_eq!(a.justification, INSUFFICIENT_INFO);
    }
}
