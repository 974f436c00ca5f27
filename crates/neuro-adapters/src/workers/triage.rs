//! Triaje: estimación categórica de urgencia a partir de los artifacts
//! previos, sin diagnóstico. Mapeo puro: mismos registros de entrada,
//! misma evaluación. Toda justificación cita los valores de los que
//! deriva; sin datos suficientes la respuesta es conservadora
//! (`indeterminado`).

use async_trait::async_trait;
use indexmap::IndexMap;

use neuro_core::{EngineError, RunContext, TaskResult, Worker, WorkerInput, WorkerKind};
use neuro_domain::{RiskLevel, TriageAssessment};

use crate::sources::SourceArtifacts;

/// Umbral de probabilidad que marca indicios de tumor agresivo.
const HIGH_PROBABILITY: f64 = 0.85;
/// Umbral de hallazgos que requieren seguimiento.
const FOLLOWUP_PROBABILITY: f64 = 0.6;

pub struct TriageWorker;

/// Evaluación determinista del caso. Pública para poder contrastarla en la
/// validación del informe.
pub fn assess(sources: &SourceArtifacts) -> TriageAssessment {
    let Some(classification) = sources.classification.as_ref() else {
        return TriageAssessment::indeterminate();
    };
    let Some(max_p) = classification.max_tumor_probability() else {
        return TriageAssessment::indeterminate();
    };

    let mut citations = vec![format!("probabilidad máxima de tumor {max_p:.2}")];
    if let Some(seg) = sources.segmentation.as_ref().and_then(|s| s.first_segmented()) {
        if let neuro_domain::SegmentationOutcome::Segmented { volumen_cc: Some(v), .. } = &seg.outcome {
            citations.push(format!("volumen estimado {v} cc"));
        }
    }
    if sources.context.as_ref().is_some_and(|c| c.has_context()) {
        citations.push("historial clínico recuperado".to_string());
    }
    let cited = citations.join(", ");

    if max_p > HIGH_PROBABILITY {
        TriageAssessment::new(RiskLevel::Alto,
                              format!("Indicios de masa tumoral: {cited}. Requiere evaluación médica urgente."))
    } else if max_p > FOLLOWUP_PROBABILITY {
        TriageAssessment::new(RiskLevel::Medio,
                              format!("Hallazgos que requieren seguimiento: {cited}."))
    } else {
        TriageAssessment::new(RiskLevel::Bajo,
                              format!("Sin indicios significativos: {cited}."))
    }
}

#[async_trait]
impl Worker for TriageWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Triage
    }

    async fn invoke(&self,
                    _ctx: &RunContext,
                    input: WorkerInput,
                    _params: &IndexMap<String, String>)
                    -> Result<TaskResult, EngineError> {
        let sources = SourceArtifacts::from_dependencies(&input.dependencies);
        let assessment = assess(&sources);
        let doc = serde_json::to_value(&assessment).map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(TaskResult::success("", doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neuro_domain::{ClassProbabilities, ClassificationOutcome, ClassificationReport, RiskLevel,
                       ScanClassification, TumorPrediction, INSUFFICIENT_INFO};

    fn classification(p: f64) -> ClassificationReport {
        ClassificationReport::new("carlos_perez".into(),
                                  vec![ScanClassification { scan_id: "carlos_perez_1".into(),
                                                            result: ClassificationOutcome::Classified {
                                                                prediction: TumorPrediction::from_probability(p),
                                                                probabilities: ClassProbabilities::from_tumor(p).unwrap(),
                                                            } }]).unwrap()
    }

    #[test]
    fn sparse_inputs_are_indeterminate() {
        let assessment = assess(&SourceArtifacts::default());
        assert_eq!(assessment.risk, RiskLevel::Indeterminado);
        assert_eq!(assessment.justification, INSUFFICIENT_INFO);
    }

    #[test]
    fn high_probability_escalates_with_citation() {
        let mut sources = SourceArtifacts::default();
        sources.classification = Some(classification(0.91));
        let assessment = assess(&sources);
        assert_eq!(assessment.risk, RiskLevel::Alto);
        assert!(assessment.justification.contains("0.91"), "la justificación cita el dato");
    }

    #[test]
    fn low_probability_stays_low() {
        let mut sources = SourceArtifacts::default();
        sources.classification = Some(classification(0.2));
        let assessment = assess(&sources);
        assert_eq!(assessment.risk, RiskLevel::Bajo);
    }

    #[test]
    fn same_inputs_same_assessment() {
        let mut sources = SourceArtifacts::default();
        sources.classification = Some(classification(0.7));
        assert_eq!(assess(&sources), assess(&sources));
    }
}
