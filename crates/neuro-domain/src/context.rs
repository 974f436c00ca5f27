//! Contexto clínico recuperado para un paciente.
//!
//! El texto de contexto sólo puede derivar de documentos cuyo propietario
//! coincide exactamente con el paciente solicitado; si nada califica se
//! emite el marcador explícito de "sin información", nunca una conjetura.

use serde::{Deserialize, Serialize};

/// Marcador estándar cuando la búsqueda no produce contexto utilizable.
pub const NO_CONTEXT_MARKER: &str = "No se encontró información relevante para la consulta expandida.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub patient_identifier: String,
    /// Consulta ya expandida con sinónimos clínicos.
    pub query: String,
    pub context: String,
}

impl ContextRecord {
    pub fn not_found(patient_identifier: String, query: String) -> Self {
        Self { patient_identifier,
               query,
               context: NO_CONTEXT_MARKER.to_string() }
    }

    pub fn has_context(&self) -> bool {
        !self.context.is_empty() && self.context != NO_CONTEXT_MARKER
    }
}
