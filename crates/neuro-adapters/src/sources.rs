//! Clasificación de artifacts de dependencia por su forma.
//!
//! Las tareas de agregación (triaje, informe, validación) reciben los
//! artifacts de sus dependencias declaradas sin más etiqueta que su
//! contenido; este módulo los reconoce por forma y los decodifica a sus
//! tipos de dominio. Un artifact ilegible o marcado como saltado se trata
//! como fuente ausente, nunca como valor inventado.

use serde_json::Value;

use neuro_core::Artifact;
use neuro_domain::{ClassificationReport, ContextRecord, MasterReport, ScanInventory, SegmentationReport,
                   TriageAssessment};

#[derive(Debug, Default)]
pub struct SourceArtifacts {
    pub inventory: Option<ScanInventory>,
    pub classification: Option<ClassificationReport>,
    pub segmentation: Option<SegmentationReport>,
    pub context: Option<ContextRecord>,
    pub triage: Option<TriageAssessment>,
    pub report: Option<MasterReport>,
}

impl SourceArtifacts {
    pub fn from_dependencies(dependencies: &[Artifact]) -> Self {
        let mut sources = Self::default();
        for artifact in dependencies {
            sources.absorb(&artifact.payload);
        }
        sources
    }

    fn absorb(&mut self, doc: &Value) {
        // Los marcadores de salto no son fuente.
        if doc.get("skipped").and_then(Value::as_bool) == Some(true) {
            return;
        }
        if doc.get("classifications").is_some() {
            self.classification = serde_json::from_value(doc.clone()).ok();
        } else if doc.get("segmentations").is_some() {
            self.segmentation = serde_json::from_value(doc.clone()).ok();
        } else if doc.get("context").is_some() && doc.get("query").is_some() {
            self.context = serde_json::from_value(doc.clone()).ok();
        } else if doc.get("riesgo").is_some() && doc.get("paciente_id").is_none() {
            self.triage = serde_json::from_value(doc.clone()).ok();
        } else if doc.get("paciente_id").is_some() {
            self.report = serde_json::from_value(doc.clone()).ok();
        } else if doc.get("scans").is_some() && doc.get("patient_identifier").is_some() {
            self.inventory = serde_json::from_value(doc.clone()).ok();
        }
    }

    /// Identificador de paciente según las fuentes disponibles, en orden de
    /// confianza: inventario, clasificación, segmentación, contexto.
    pub fn patient_identifier(&self) -> Option<&str> {
        self.inventory
            .as_ref()
            .map(|i| i.patient_identifier.as_str())
            .or_else(|| self.classification.as_ref().map(|c| c.patient_identifier.as_str()))
            .or_else(|| self.segmentation.as_ref().map(|s| s.patient_identifier.as_str()))
            .or_else(|| self.context.as_ref().map(|c| c.patient_identifier.as_str()))
    }
}
