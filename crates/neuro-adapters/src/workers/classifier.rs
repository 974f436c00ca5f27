//! Clasificación tumor/no-tumor por escaneo.
//!
//! Itera los pares del inventario llamando al servicio de inferencia; el
//! fallo de un escaneo se registra en línea y no aborta a los hermanos.
//! Sólo la ausencia total de imágenes es un fallo de tarea completa.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use neuro_core::{EngineError, RunContext, TaskResult, Worker, WorkerInput, WorkerKind};
use neuro_domain::{ClassProbabilities, ClassificationOutcome, ClassificationReport, ScanClassification,
                   ScanInventory, TumorPrediction, NO_IMAGES_FOUND};

use crate::collaborators::InferenceService;

pub struct ClassificationWorker {
    inference: Arc<dyn InferenceService>,
}

impl ClassificationWorker {
    pub fn new(inference: Arc<dyn InferenceService>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl Worker for ClassificationWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Classifier
    }

    async fn invoke(&self,
                    ctx: &RunContext,
                    input: WorkerInput,
                    _params: &IndexMap<String, String>)
                    -> Result<TaskResult, EngineError> {
        let Some(doc) = input.document.as_ref() else {
            return Ok(TaskResult::error("", NO_IMAGES_FOUND));
        };
        let Ok(inventory) = serde_json::from_value::<ScanInventory>(doc.clone()) else {
            return Ok(TaskResult::error("", NO_IMAGES_FOUND));
        };
        if !inventory.has_scans() {
            return Ok(TaskResult::error("", NO_IMAGES_FOUND));
        }

        let mut classifications = Vec::with_capacity(inventory.scans.len());
        for scan in &inventory.scans {
            let result = match self.inference.classify_pair(&scan.flair_path, &scan.t1ce_path).await {
                Ok(score) => match ClassProbabilities::from_tumor(score.p_tumor) {
                    Ok(probabilities) => ClassificationOutcome::Classified { prediction: TumorPrediction::from_probability(probabilities.tumor),
                                                                             probabilities },
                    Err(e) => ClassificationOutcome::Failed { error: e.to_string() },
                },
                Err(e) => {
                    tracing::warn!(run_id = %ctx.run_id, scan = %scan.scan_id, error = %e,
                                   "clasificación de escaneo fallida");
                    ClassificationOutcome::Failed { error: e.to_string() }
                }
            };
            classifications.push(ScanClassification { scan_id: scan.scan_id.clone(), result });
        }

        let report = match ClassificationReport::new(inventory.patient_identifier, classifications) {
            Ok(report) => report,
            Err(e) => return Ok(TaskResult::error("", e.to_string())),
        };
        let doc = serde_json::to_value(&report).map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(TaskResult::success("", doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use neuro_core::{EngineConfig, InMemoryArtifactStore};
    use serde_json::json;

    use crate::stubs::StubInferenceService;

    fn ctx() -> RunContext {
        RunContext::new(EngineConfig::default(), Arc::new(InMemoryArtifactStore::new()))
    }

    fn inventory(n: usize) -> serde_json::Value {
        let scans: Vec<_> = (1..=n).map(|i| {
                                       json!({
                                           "scan_id": format!("carlos_perez_{i}"),
                                           "flair_path": format!("data/pictures/carlos_perez_{i}_flair.nii"),
                                           "t1ce_path": format!("data/pictures/carlos_perez_{i}_t1ce.nii")
                                       })
                                   })
                                   .collect();
        json!({"patient_identifier": "carlos_perez", "scans": scans})
    }

    #[tokio::test]
    async fn one_entry_per_scan_even_with_failures() {
        let mut stub = StubInferenceService::with_default_score(0.3);
        stub.failing.push("carlos_perez_2".into());
        let worker = ClassificationWorker::new(Arc::new(stub));

        let input = WorkerInput { document: Some(inventory(3)), ..WorkerInput::default() };
        let result = worker.invoke(&ctx(), input, &IndexMap::new()).await.unwrap();

        assert!(!result.is_error());
        let report: ClassificationReport =
            serde_json::from_value(result.payload.as_document().unwrap().clone()).unwrap();
        assert_eq!(report.classifications.len(), 3, "nunca menos entradas que escaneos");
        assert!(matches!(report.classifications[1].result, ClassificationOutcome::Failed { .. }));
        assert!(matches!(report.classifications[0].result, ClassificationOutcome::Classified { .. }));
    }

    #[tokio::test]
    async fn empty_inventory_is_a_whole_task_error() {
        let worker = ClassificationWorker::new(Arc::new(StubInferenceService::default()));
        let input = WorkerInput { document: Some(json!({"patient_identifier": "carlos_perez", "scans": []})),
                                  ..WorkerInput::default() };
        let result = worker.invoke(&ctx(), input, &IndexMap::new()).await.unwrap();
        assert!(result.is_error());
        assert_eq!(result.error_detail.as_deref(), Some(NO_IMAGES_FOUND));
    }
}
