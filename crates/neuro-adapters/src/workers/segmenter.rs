//! Segmentación por escaneo.
//!
//! Mismo patrón de iteración que la clasificación: cada escaneo produce
//! sus tres referencias de archivo o un error en línea. Esta tarea sólo es
//! alcanzable a través de la puerta de ramificación del ejecutor.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use neuro_core::{EngineError, RunContext, TaskResult, Worker, WorkerInput, WorkerKind};
use neuro_domain::{ScanInventory, ScanSegmentation, SegmentationOutcome, SegmentationReport, NO_IMAGES_FOUND};

use crate::collaborators::InferenceService;

pub struct SegmentationWorker {
    inference: Arc<dyn InferenceService>,
}

impl SegmentationWorker {
    pub fn new(inference: Arc<dyn InferenceService>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl Worker for SegmentationWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Segmenter
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

        let mut segmentations = Vec::with_capacity(inventory.scans.len());
        for scan in &inventory.scans {
            let outcome = match self.inference.segment_pair(&scan.flair_path, &scan.t1ce_path).await {
                Ok(out) => SegmentationOutcome::Segmented { slice: out.slice,
                                                            input_slice: out.input_slice,
                                                            mask_file: out.mask_file,
                                                            overlay_file: out.overlay_file,
                                                            volumen_cc: out.volume_cc,
                                                            zona_afectada: out.affected_zone },
                Err(e) => {
                    tracing::warn!(run_id = %ctx.run_id, scan = %scan.scan_id, error = %e,
                                   "segmentación de escaneo fallida");
                    SegmentationOutcome::Failed { error: format!("No se pudo segmentar el par de imágenes: {e}") }
                }
            };
            segmentations.push(ScanSegmentation { scan_id: scan.scan_id.clone(), outcome });
        }

        let report = SegmentationReport { patient_identifier: inventory.patient_identifier,
                                          segmentations };
        let doc = serde_json::to_value(&report).map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(TaskResult::success("", doc))
    }
}
