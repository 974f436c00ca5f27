//! Fronteras con los colaboradores externos del caso.
//!
//! Los algoritmos internos de estos servicios quedan fuera del sistema:
//! aquí sólo se fija su contrato. Toda implementación debe degradar a un
//! error explícito en lugar de lanzar.

use async_trait::async_trait;
use thiserror::Error;

use neuro_domain::MasterReport;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("inferencia: {0}")]
    Inference(String),
    #[error("recuperación: {0}")]
    Retrieval(String),
    #[error("renderizado: {0}")]
    Rendering(String),
}

/// Probabilidad de tumor estimada para un par FLAIR/T1-CE.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TumorScore {
    pub p_tumor: f64,
}

/// Salida de la segmentación de un par: tres archivos generados más la
/// rebanada elegida y, si el servicio los estima, volumen y zona.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationOutput {
    pub slice: u32,
    pub input_slice: String,
    pub mask_file: String,
    pub overlay_file: String,
    pub volume_cc: Option<f64>,
    pub affected_zone: Option<String>,
}

/// Documento devuelto por la búsqueda semántica, con su propietario
/// inferido. El propietario es la base del filtro de aislamiento.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub owner_identifier: String,
    pub content: String,
}

/// Documento renderizado: referencia y texto extraíble para verificación.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub doc_ref: String,
    pub text: String,
    /// Huella del contenido renderizado (diagnóstico / trazabilidad).
    pub checksum: String,
}

/// Servicio de inferencia de imagen (clasificación y segmentación).
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn classify_pair(&self, flair_path: &str, t1ce_path: &str) -> Result<TumorScore, CollaboratorError>;
    async fn segment_pair(&self, flair_path: &str, t1ce_path: &str) -> Result<SegmentationOutput, CollaboratorError>;
}

/// Búsqueda semántica sobre la base documental de pacientes.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<IndexedDocument>, CollaboratorError>;
}

/// Renderizador del informe a documento entregable.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, report: &MasterReport, output_ref: &str) -> Result<RenderedDocument, CollaboratorError>;
    async fn extract_text(&self, doc_ref: &str) -> Result<String, CollaboratorError>;
}
