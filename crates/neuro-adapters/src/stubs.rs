//! Colaboradores stub deterministas para pruebas y demo.
//!
//! No hay inferencia real: las puntuaciones y documentos se configuran por
//! adelantado y las salidas siguen las convenciones de nombres del sistema
//! de segmentación (rebanada 95, `Resultado_segmentacion_*`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use neuro_domain::{format_probability, MasterReport};

use crate::collaborators::{CollaboratorError, IndexedDocument, InferenceService, RenderedDocument, ReportRenderer,
                           SemanticIndex, SegmentationOutput, TumorScore};

const SELECTED_SLICE: u32 = 95;
const SEGMENTATIONS_DIR: &str = "data/segmentations";

fn scan_base(flair_path: &str) -> String {
    let file = flair_path.rsplit('/').next().unwrap_or(flair_path);
    file.trim_end_matches("_flair.nii").to_string()
}

/// Servicio de inferencia con puntuaciones fijadas por escaneo.
#[derive(Debug, Default)]
pub struct StubInferenceService {
    /// p_tumor por id de escaneo; los no listados usan `default_score`.
    pub scores: HashMap<String, f64>,
    pub default_score: f64,
    /// Escaneos que simulan un fallo del servicio.
    pub failing: Vec<String>,
    /// Volumen estimado por escaneo (opcional).
    pub volumes: HashMap<String, f64>,
    /// Zona afectada por escaneo (opcional).
    pub zones: HashMap<String, String>,
}

impl StubInferenceService {
    pub fn with_default_score(default_score: f64) -> Self {
        Self { default_score, ..Self::default() }
    }

    fn check_failure(&self, base: &str) -> Result<(), CollaboratorError> {
        if self.failing.iter().any(|f| f == base) {
            return Err(CollaboratorError::Inference(format!("fallo simulado para '{base}'")));
        }
        Ok(())
    }
}

#[async_trait]
impl InferenceService for StubInferenceService {
    async fn classify_pair(&self, flair_path: &str, _t1ce_path: &str) -> Result<TumorScore, CollaboratorError> {
        let base = scan_base(flair_path);
        self.check_failure(&base)?;
        let p_tumor = self.scores.get(&base).copied().unwrap_or(self.default_score);
        Ok(TumorScore { p_tumor })
    }

    async fn segment_pair(&self, flair_path: &str, _t1ce_path: &str) -> Result<SegmentationOutput, CollaboratorError> {
        let base = scan_base(flair_path);
        self.check_failure(&base)?;
        Ok(SegmentationOutput { slice: SELECTED_SLICE,
                                input_slice: format!("{SEGMENTATIONS_DIR}/FLAIR_slice_{SELECTED_SLICE}_{base}.png"),
                                mask_file: format!("{SEGMENTATIONS_DIR}/Resultado_segmentacion_{base}.png"),
                                overlay_file: format!("{SEGMENTATIONS_DIR}/Resultado_segmentacion_superpuesto_{base}.png"),
                                volume_cc: self.volumes.get(&base).copied(),
                                affected_zone: self.zones.get(&base).cloned() })
    }
}

/// Índice semántico sobre una colección fija de documentos. Devuelve los
/// `k` mejores por solapamiento léxico; el filtrado por paciente NO es
/// responsabilidad del índice (caja negra), sino del worker que lo consume.
#[derive(Debug, Default)]
pub struct StubSemanticIndex {
    pub documents: Vec<IndexedDocument>,
}

impl StubSemanticIndex {
    pub fn new(documents: Vec<IndexedDocument>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl SemanticIndex for StubSemanticIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<IndexedDocument>, CollaboratorError> {
        let terms: Vec<String> = query.to_lowercase()
                                      .split([' ', ','])
                                      .filter(|t| t.len() > 3)
                                      .map(str::to_string)
                                      .collect();
        let mut scored: Vec<(usize, &IndexedDocument)> =
            self.documents
                .iter()
                .map(|d| {
                    let content = d.content.to_lowercase();
                    (terms.iter().filter(|t| content.contains(t.as_str())).count(), d)
                })
                .filter(|(score, _)| *score > 0)
                .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, d)| d.clone()).collect())
    }
}

/// Renderizador en memoria: materializa el informe como texto plano con la
/// plantilla del informe clínico y lo archiva bajo su referencia.
#[derive(Debug, Default)]
pub struct StubRenderer {
    documents: DashMap<String, String>,
    /// Si está activo, el primer renderizado sale truncado (sin la sección
    /// de triaje); los siguientes son completos. Permite ejercitar la fase
    /// de verificación del documento renderizado.
    truncate_first_render: AtomicBool,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn truncating_first_render() -> Self {
        let r = Self::default();
        r.truncate_first_render.store(true, Ordering::SeqCst);
        r
    }

    pub fn rendered_count(&self) -> usize {
        self.documents.len()
    }

    fn render_text(report: &MasterReport) -> String {
        let prob = report.tumor_prob.map(format_probability).unwrap_or_else(|| "null".to_string());
        let mut text = format!("## Informe Clínico Automatizado – Resonancia Craneal\n\
                                **Datos del paciente**\n\
                                - Nombre: {}\n\
                                - ID: {}\n\
                                - Fecha de la prueba: {}\n\
                                - Edad: {}\n\n\
                                **Motivo de la consulta**\n{}\n\n\
                                **Prioridad estimada (triaje automático)**\n\
                                - Riesgo: {}\n\
                                - Justificación: {}\n\n\
                                **Síntesis del historial clínico**\n{}\n\n\
                                **Diagnóstico preliminar (IA)**\n\
                                - Resultado: {}\n\
                                - Probabilidad de tumor: {}\n\
                                - Observaciones: {}\n\n\
                                **Segmentación de imagen**\n\
                                - Zona afectada: {}\n\
                                - Volumen estimado: {} cc\n\
                                - Imagen cerebral: {}\n\
                                - Segmentación del tumor: {}\n\
                                - Máscara superpuesta: {}\n\n\
                                **Conclusión del sistema**\n{}\n",
                               report.name,
                               report.patient_id,
                               report.date,
                               report.age,
                               report.consultation_reason,
                               report.risk,
                               report.triage_justification,
                               report.history_summary,
                               report.tumor_result,
                               prob,
                               report.classifier_comments,
                               report.affected_zone,
                               report.volume_cc.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string()),
                               report.input_slice,
                               report.mask_file,
                               report.overlay_file,
                               report.final_comment);
        for scan in &report.scans {
            let p = scan.p_tumor.map(format_probability).unwrap_or_else(|| "null".to_string());
            text.push_str(&format!("- Escaneo {}: probabilidad de tumor {} (máscara: {})\n", scan.scan_id, p, scan.mask_file));
        }
        text
    }
}

#[async_trait]
impl ReportRenderer for StubRenderer {
    async fn render(&self, report: &MasterReport, output_ref: &str) -> Result<RenderedDocument, CollaboratorError> {
        let mut text = Self::render_text(report);
        if self.truncate_first_render.swap(false, Ordering::SeqCst) {
            // Deja fuera la sección de triaje (y todo lo posterior).
            if let Some(pos) = text.find("**Prioridad estimada") {
                text.truncate(pos);
            }
        }
        let checksum = format!("{:x}", Sha256::digest(text.as_bytes()));
        self.documents.insert(output_ref.to_string(), text.clone());
        Ok(RenderedDocument { doc_ref: output_ref.to_string(), text, checksum })
    }

    async fn extract_text(&self, doc_ref: &str) -> Result<String, CollaboratorError> {
        self.documents
            .get(doc_ref)
            .map(|t| t.clone())
            .ok_or_else(|| CollaboratorError::Rendering(format!("documento no encontrado: {doc_ref}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classify_uses_configured_score() {
        let mut stub = StubInferenceService::with_default_score(0.2);
        stub.scores.insert("carlos_perez_1".into(), 0.91);
        let s = stub.classify_pair("data/pictures/carlos_perez_1_flair.nii", "data/pictures/carlos_perez_1_t1ce.nii")
                    .await
                    .unwrap();
        assert_eq!(s.p_tumor, 0.91);
    }

    #[tokio::test]
    async fn segmentation_outputs_follow_naming_convention() {
        let stub = StubInferenceService::default();
        let out = stub.segment_pair("data/pictures/x_1_flair.nii", "data/pictures/x_1_t1ce.nii").await.unwrap();
        assert_eq!(out.mask_file, "data/segmentations/Resultado_segmentacion_x_1.png");
        assert_eq!(out.slice, 95);
    }

    #[tokio::test]
    async fn renderer_archives_and_extracts() {
        let renderer = StubRenderer::new();
        let report = MasterReport::unavailable("carlos_perez".into());
        let doc = renderer.render(&report, "data/reportes/r.pdf").await.unwrap();
        assert!(doc.text.contains("carlos_perez"));
        let text = renderer.extract_text("data/reportes/r.pdf").await.unwrap();
        assert_eq!(text, doc.text);
    }
}
