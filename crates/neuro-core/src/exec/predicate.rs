//! Predicados de ramificación: reglas explícitas y con umbral nombrado que
//! deciden si una tarea condicional se ejecuta o se salta, evaluadas sobre
//! los payloads ya producidos.

use indexmap::IndexMap;
use serde_json::Value;

use crate::plan::{TaskSpec, WorkerKind};
use crate::worker::TaskResult;

#[derive(Debug, Clone, PartialEq)]
pub enum BranchDecision {
    Run,
    Skip { reason: String },
}

pub trait BranchPredicate: Send + Sync {
    /// Capacidad cuyas tareas vigila este predicado.
    fn applies_to(&self) -> WorkerKind;

    /// Decide sobre los resultados ya acumulados (todas las tareas previas
    /// en orden de plan).
    fn evaluate(&self, task: &TaskSpec, upstream: &IndexMap<String, TaskResult>) -> BranchDecision;
}

/// Puerta de segmentación: sólo se segmenta si algún escaneo clasificado
/// supera el umbral de probabilidad de tumor. Si ninguna clasificación es
/// visible aguas arriba, la tarea corre incondicionalmente (el plan la
/// pidió de forma explícita).
pub struct SegmentationGate {
    pub threshold: f64,
}

impl SegmentationGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn max_tumor_probability(doc: &Value) -> Option<f64> {
        let entries = doc.get("classifications")?.as_array()?;
        entries.iter()
               .filter_map(|e| e.get("result")?.get("probabilities")?.get("tumor")?.as_f64())
               .fold(None, |acc, p| Some(acc.map_or(p, |m: f64| m.max(p))))
    }
}

impl BranchPredicate for SegmentationGate {
    fn applies_to(&self) -> WorkerKind {
        WorkerKind::Segmenter
    }

    fn evaluate(&self, _task: &TaskSpec, upstream: &IndexMap<String, TaskResult>) -> BranchDecision {
        let mut saw_classification = false;
        let mut max_p: Option<f64> = None;
        for result in upstream.values() {
            let Some(doc) = result.payload.as_document() else { continue };
            if doc.get("classifications").is_none() {
                continue;
            }
            saw_classification = true;
            if let Some(p) = Self::max_tumor_probability(doc) {
                max_p = Some(max_p.map_or(p, |m| m.max(p)));
            }
        }

        if !saw_classification {
            return BranchDecision::Run;
        }
        match max_p {
            Some(p) if p > self.threshold => BranchDecision::Run,
            Some(p) => BranchDecision::Skip { reason: format!("probabilidad máxima de tumor {p:.2} no supera el umbral {:.2}", self.threshold) },
            None => BranchDecision::Skip { reason: "sin probabilidades de tumor disponibles en la clasificación".to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::TaskResult;
    use serde_json::json;

    fn classification_result(p: f64) -> TaskResult {
        TaskResult::success("3",
                            json!({
                                "patient_identifier": "carlos_perez",
                                "classifications": [
                                    {"scan_id": "carlos_perez_1", "result": {"prediction": "tumor", "probabilities": {"tumor": p, "no_tumor": 1.0 - p}}}
                                ]
                            }))
    }

    fn seg_task() -> TaskSpec {
        TaskSpec { id: "4".into(),
                   name: "segmentar_imagenes".into(),
                   worker: WorkerKind::Segmenter,
                   input: None,
                   output_name: "segmentation.json".into(),
                   params: IndexMap::new(),
                   dependencies: vec!["3".into()],
                   validation_criterion: None }
    }

    #[test]
    fn below_threshold_skips() {
        let gate = SegmentationGate::new(0.6);
        let mut upstream = IndexMap::new();
        upstream.insert("3".to_string(), classification_result(0.55));
        assert!(matches!(gate.evaluate(&seg_task(), &upstream), BranchDecision::Skip { .. }));
    }

    #[test]
    fn above_threshold_runs() {
        let gate = SegmentationGate::new(0.6);
        let mut upstream = IndexMap::new();
        upstream.insert("3".to_string(), classification_result(0.91));
        assert_eq!(gate.evaluate(&seg_task(), &upstream), BranchDecision::Run);
    }

    #[test]
    fn without_upstream_classification_runs_unconditionally() {
        let gate = SegmentationGate::new(0.6);
        let upstream = IndexMap::new();
        assert_eq!(gate.evaluate(&seg_task(), &upstream), BranchDecision::Run);
    }

    #[test]
    fn classification_with_only_failures_skips() {
        let gate = SegmentationGate::new(0.6);
        let mut upstream = IndexMap::new();
        upstream.insert("3".to_string(),
                        TaskResult::success("3",
                                            json!({
                                                "patient_identifier": "carlos_perez",
                                                "classifications": [
                                                    {"scan_id": "carlos_perez_1", "result": {"error": "fallo"}}
                                                ]
                                            })));
        assert!(matches!(gate.evaluate(&seg_task(), &upstream), BranchDecision::Skip { .. }));
    }
}
