//! Informe maestro del caso: agregación de todos los artifacts previos.
//!
//! Reglas de composición:
//! - Todo campo sin fuente directa lleva el centinela `NO DISPONIBLE`
//!   (texto) o `null` (números); nunca se interpola un valor.
//! - `scans` es la unión, por `scan_id`, de los escaneos vistos en
//!   clasificación y/o segmentación; nunca un subconjunto.

use serde::{Deserialize, Serialize};

/// Centinela para campos sin fuente trazable.
pub const NOT_AVAILABLE: &str = "NO DISPONIBLE";

/// Entrada por escaneo dentro del informe (join clasificación + segmentación).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportScan {
    pub scan_id: String,
    pub flair_path: String,
    pub t1ce_path: String,
    pub p_tumor: Option<f64>,
    pub mask_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterReport {
    #[serde(rename = "paciente_id")]
    pub patient_id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "edad")]
    pub age: String,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "motivo_consulta")]
    pub consultation_reason: String,

    pub tumor_prob: Option<f64>,
    #[serde(rename = "tumor_resultado")]
    pub tumor_result: String,
    #[serde(rename = "comentarios_clasificador")]
    pub classifier_comments: String,

    #[serde(rename = "zona_afectada")]
    pub affected_zone: String,
    #[serde(rename = "volumen_cc")]
    pub volume_cc: Option<f64>,
    pub slice: Option<u32>,
    pub input_slice: String,
    pub mask_file: String,
    pub overlay_file: String,

    #[serde(rename = "resumen_historial")]
    pub history_summary: String,

    #[serde(rename = "riesgo")]
    pub risk: String,
    #[serde(rename = "justificacion_triaje")]
    pub triage_justification: String,

    #[serde(rename = "comentario_final_sobre_el_caso")]
    pub final_comment: String,

    pub scans: Vec<ReportScan>,
}

impl MasterReport {
    /// Informe con todos los campos en centinela, punto de partida de la
    /// composición.
    pub fn unavailable(patient_id: String) -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self { patient_id,
               name: na(),
               age: na(),
               date: na(),
               consultation_reason: na(),
               tumor_prob: None,
               tumor_result: na(),
               classifier_comments: na(),
               affected_zone: na(),
               volume_cc: None,
               slice: None,
               input_slice: na(),
               mask_file: na(),
               overlay_file: na(),
               history_summary: na(),
               risk: na(),
               triage_justification: na(),
               final_comment: na(),
               scans: Vec::new() }
    }

    /// Ids de escaneo presentes en el informe, en orden.
    pub fn scan_ids(&self) -> Vec<&str> {
        self.scans.iter().map(|s| s.scan_id.as_str()).collect()
    }
}

/// Formato canónico de una probabilidad de tumor en documentos legibles
/// (p. ej. `91.8%`). Renderizado y verificación usan el mismo formato.
pub fn format_probability(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}
