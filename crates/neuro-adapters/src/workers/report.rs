//! Composición del informe maestro.
//!
//! Fusión estricta de los artifacts disponibles: cada campo del informe
//! procede de una fuente concreta o queda en el centinela `NO DISPONIBLE`.
//! La composición nunca interpola ni infiere valores. La misma función de
//! composición se reutiliza en la validación para reconstruir el informe
//! desde fuentes verificadas.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use neuro_core::{EngineError, RunContext, TaskResult, Worker, WorkerInput, WorkerKind};
use neuro_domain::{format_probability, ClassificationOutcome, MasterReport, ReportScan, SegmentationOutcome,
                   TumorPrediction, NOT_AVAILABLE};

use crate::collaborators::ReportRenderer;
use crate::sources::SourceArtifacts;

/// Mensaje cuando falta el inventario obligatorio.
pub const MISSING_INVENTORY: &str = "No se encontró lister.json";

/// Construye el informe maestro exclusivamente desde las fuentes dadas.
pub fn compose_master_report(sources: &SourceArtifacts, patient_id: &str, reason: Option<&str>) -> MasterReport {
    let mut report = MasterReport::unavailable(patient_id.to_string());
    if let Some(reason) = reason {
        report.consultation_reason = reason.to_string();
    }

    if let Some(classification) = &sources.classification {
        if let Some(max_p) = classification.max_tumor_probability() {
            report.tumor_prob = Some(max_p);
            report.tumor_result = match TumorPrediction::from_probability(max_p) {
                TumorPrediction::Tumor => "tumor",
                TumorPrediction::NoTumor => "no tumor",
            }.to_string();
        }
        let total = classification.classifications.len();
        let ok = classification.classifications
                               .iter()
                               .filter(|c| matches!(c.result, ClassificationOutcome::Classified { .. }))
                               .count();
        report.classifier_comments = format!("{ok} de {total} escaneos clasificados correctamente");
    }

    if let Some(seg) = sources.segmentation.as_ref().and_then(|s| s.first_segmented()) {
        if let SegmentationOutcome::Segmented { slice,
                                               input_slice,
                                               mask_file,
                                               overlay_file,
                                               volumen_cc,
                                               zona_afectada } = &seg.outcome
        {
            report.slice = Some(*slice);
            report.input_slice = input_slice.clone();
            report.mask_file = mask_file.clone();
            report.overlay_file = overlay_file.clone();
            report.volume_cc = *volumen_cc;
            if let Some(zone) = zona_afectada {
                report.affected_zone = zone.clone();
            }
        }
    }

    if let Some(context) = &sources.context {
        if context.has_context() {
            report.history_summary = context.context.clone();
        }
    }

    if let Some(triage) = &sources.triage {
        report.risk = triage.risk.to_string();
        report.triage_justification = triage.justification.clone();
    }

    // Conclusión derivada sólo de valores ya trazados arriba.
    if let Some(p) = report.tumor_prob {
        report.final_comment = if report.risk != NOT_AVAILABLE {
            format!("Caso con probabilidad máxima de tumor {} y riesgo {}.", format_probability(p), report.risk)
        } else {
            format!("Caso con probabilidad máxima de tumor {}.", format_probability(p))
        };
    }

    report.scans = scan_union(sources);
    report
}

/// Unión por `scan_id` de los escaneos vistos en inventario, clasificación
/// y segmentación. Nunca un subconjunto.
fn scan_union(sources: &SourceArtifacts) -> Vec<ReportScan> {
    let na = || NOT_AVAILABLE.to_string();
    let mut scans: BTreeMap<String, ReportScan> = BTreeMap::new();

    if let Some(inventory) = &sources.inventory {
        for pair in &inventory.scans {
            scans.insert(pair.scan_id.clone(),
                         ReportScan { scan_id: pair.scan_id.clone(),
                                      flair_path: pair.flair_path.clone(),
                                      t1ce_path: pair.t1ce_path.clone(),
                                      p_tumor: None,
                                      mask_file: na() });
        }
    }
    if let Some(classification) = &sources.classification {
        for entry in &classification.classifications {
            let scan = scans.entry(entry.scan_id.clone()).or_insert_with(|| ReportScan { scan_id: entry.scan_id.clone(),
                                                                                         flair_path: na(),
                                                                                         t1ce_path: na(),
                                                                                         p_tumor: None,
                                                                                         mask_file: na() });
            if let ClassificationOutcome::Classified { probabilities, .. } = &entry.result {
                scan.p_tumor = Some(probabilities.tumor);
            }
        }
    }
    if let Some(segmentation) = &sources.segmentation {
        for entry in &segmentation.segmentations {
            let scan = scans.entry(entry.scan_id.clone()).or_insert_with(|| ReportScan { scan_id: entry.scan_id.clone(),
                                                                                         flair_path: na(),
                                                                                         t1ce_path: na(),
                                                                                         p_tumor: None,
                                                                                         mask_file: na() });
            if let SegmentationOutcome::Segmented { mask_file, .. } = &entry.outcome {
                scan.mask_file = mask_file.clone();
            }
        }
    }

    scans.into_values().collect()
}

pub struct ReportComposerWorker {
    renderer: Arc<dyn ReportRenderer>,
}

impl ReportComposerWorker {
    pub fn new(renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Worker for ReportComposerWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::ReportComposer
    }

    async fn invoke(&self,
                    ctx: &RunContext,
                    input: WorkerInput,
                    params: &IndexMap<String, String>)
                    -> Result<TaskResult, EngineError> {
        let sources = SourceArtifacts::from_dependencies(&input.dependencies);
        if sources.inventory.is_none() {
            return Ok(TaskResult::error("", MISSING_INVENTORY));
        }
        let Some(patient) = params.get("patient_id")
                                  .map(String::as_str)
                                  .or_else(|| sources.patient_identifier())
        else {
            return Ok(TaskResult::error("", "identificador de paciente ausente"));
        };

        let report = compose_master_report(&sources, patient, params.get("motivo").map(String::as_str));

        // El entregable declarado por el plan se materializa aquí; la
        // validación lo contrastará después.
        if let Some(target) = ctx.final_output() {
            if let Err(e) = self.renderer.render(&report, target).await {
                return Ok(TaskResult::error("", e.to_string()));
            }
        }

        let doc = serde_json::to_value(&report).map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(TaskResult::success("", doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neuro_core::Artifact;
    use serde_json::json;

    fn sources_with(docs: Vec<serde_json::Value>) -> SourceArtifacts {
        let deps: Vec<Artifact> = docs.into_iter()
                                      .enumerate()
                                      .map(|(i, d)| Artifact::new(format!("a{i}"), format!("t{i}"), d))
                                      .collect();
        SourceArtifacts::from_dependencies(&deps)
    }

    #[test]
    fn scans_are_the_union_of_classification_and_segmentation() {
        let sources = sources_with(vec![
            json!({"patient_identifier": "p", "classifications": [
                {"scan_id": "p_1", "result": {"prediction": "tumor", "probabilities": {"tumor": 0.9, "no_tumor": 0.1}}},
                {"scan_id": "p_2", "result": {"error": "fallo"}}
            ]}),
            json!({"patient_identifier": "p", "segmentations": [
                {"scan_id": "p_3", "slice": 95, "input_slice": "i.png", "mask_file": "m.png", "overlay_file": "o.png"}
            ]}),
        ]);
        let report = compose_master_report(&sources, "p", None);
        let ids = report.scan_ids();
        assert_eq!(ids, vec!["p_1", "p_2", "p_3"], "unión completa por scan_id");
        assert_eq!(report.scans[0].p_tumor, Some(0.9));
        assert_eq!(report.scans[2].mask_file, "m.png");
    }

    #[test]
    fn fields_without_source_carry_the_sentinel() {
        let sources = sources_with(vec![json!({"patient_identifier": "p", "scans": [
            {"scan_id": "p_1", "flair_path": "f.nii", "t1ce_path": "t.nii"}
        ]})]);
        let report = compose_master_report(&sources, "p", None);
        assert_eq!(report.risk, NOT_AVAILABLE);
        assert_eq!(report.history_summary, NOT_AVAILABLE);
        assert_eq!(report.tumor_prob, None);
        assert_eq!(report.name, NOT_AVAILABLE);
    }

    #[test]
    fn triage_values_flow_verbatim() {
        let sources = sources_with(vec![
            json!({"patient_identifier": "p", "scans": []}),
            json!({"riesgo": "alto", "justificación_triaje": "masa con p=0.91"}),
        ]);
        let report = compose_master_report(&sources, "p", None);
        assert_eq!(report.risk, "alto");
        assert_eq!(report.triage_justification, "masa con p=0.91");
    }
}
