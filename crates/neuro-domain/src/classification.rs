//! Resultado de clasificación tumor/no-tumor por escaneo.
//!
//! Forma del artifact agregado:
//! `{ "patient_identifier": ..., "classifications": [ { "scan_id": ...,
//! "result": { "prediction": ..., "probabilities": {...} } | { "error": ... } } ] }`
//!
//! Un escaneo fallido produce una entrada con `error` en línea; nunca se
//! descarta en silencio.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Mensaje estándar cuando no hay imágenes que clasificar.
pub const NO_IMAGES_FOUND: &str = "No se pudieron encontrar imágenes.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TumorPrediction {
    #[serde(rename = "tumor")]
    Tumor,
    #[serde(rename = "no tumor")]
    NoTumor,
}

impl TumorPrediction {
    /// Predicción binaria a partir de la probabilidad de tumor.
    pub fn from_probability(p_tumor: f64) -> Self {
        if p_tumor >= 0.5 { Self::Tumor } else { Self::NoTumor }
    }
}

/// Distribución de probabilidad por clase, ambas en [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub tumor: f64,
    pub no_tumor: f64,
}

impl ClassProbabilities {
    pub fn from_tumor(p_tumor: f64) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&p_tumor) {
            return Err(DomainError::ValidationError(format!("probabilidad fuera de [0,1]: {p_tumor}")));
        }
        Ok(Self { tumor: p_tumor, no_tumor: 1.0 - p_tumor })
    }
}

/// Resultado por escaneo: clasificación o error en línea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassificationOutcome {
    Classified {
        prediction: TumorPrediction,
        probabilities: ClassProbabilities,
    },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanClassification {
    pub scan_id: String,
    pub result: ClassificationOutcome,
}

/// Artifact agregado de clasificación de un paciente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub patient_identifier: String,
    pub classifications: Vec<ScanClassification>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ClassificationReport {
    /// Valida unicidad de `scan_id` (una entrada por escaneo).
    pub fn new(patient_identifier: String, classifications: Vec<ScanClassification>) -> Result<Self, DomainError> {
        for (i, c) in classifications.iter().enumerate() {
            if classifications[..i].iter().any(|p| p.scan_id == c.scan_id) {
                return Err(DomainError::ValidationError(format!("scan_id duplicado en clasificación: '{}'", c.scan_id)));
            }
        }
        Ok(Self { patient_identifier, classifications, error: None })
    }

    pub fn without_images(patient_identifier: String) -> Self {
        Self { patient_identifier,
               classifications: Vec::new(),
               error: Some(NO_IMAGES_FOUND.to_string()) }
    }

    /// Máxima probabilidad de tumor observada entre los escaneos
    /// clasificados con éxito. `None` si ninguno se clasificó.
    pub fn max_tumor_probability(&self) -> Option<f64> {
        self.classifications
            .iter()
            .filter_map(|c| match &c.result {
                ClassificationOutcome::Classified { probabilities, .. } => Some(probabilities.tumor),
                ClassificationOutcome::Failed { .. } => None,
            })
            .fold(None, |acc, p| Some(acc.map_or(p, |m: f64| m.max(p))))
    }

    /// Probabilidad de tumor de un escaneo concreto (si se clasificó).
    pub fn tumor_probability_for(&self, scan_id: &str) -> Option<f64> {
        self.classifications.iter().find(|c| c.scan_id == scan_id).and_then(|c| match &c.result {
                                                                        ClassificationOutcome::Classified { probabilities, .. } => Some(probabilities.tumor),
                                                                        ClassificationOutcome::Failed { .. } => None,
                                                                    })
    }
}
