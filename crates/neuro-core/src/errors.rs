//! Errores del motor: taxonomía cerrada y serializable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errores de análisis del plan. El parser falla cerrado: ante cualquier
/// ambigüedad devuelve error en lugar de adivinar un orden.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum PlanParseError {
    #[error("plan vacío")] EmptyPlan,
    #[error("falta la línea FINAL_OUTPUT")] MissingFinalOutput,
    #[error("línea de tarea mal formada: {0}")] MalformedLine(String),
    #[error("referencia de worker desconocida: {0}")] UnknownWorker(String),
    #[error("id de tarea duplicado: {0}")] DuplicateTaskId(String),
    #[error("nombre de salida duplicado: {0}")] DuplicateOutputName(String),
    #[error("dependencia desconocida '{dependency}' en tarea '{task}'")]
    UnknownDependency { task: String, dependency: String },
    #[error("dependencia '{dependency}' no precede a la tarea '{task}'")]
    ForwardDependency { task: String, dependency: String },
    #[error("el planificador sólo puede invocarse una vez, al inicio del run: {0}")]
    PlannerMisuse(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum EngineError {
    #[error("plan parse: {0}")] PlanParse(#[from] PlanParseError),
    #[error("dependency unresolved: {0}")] DependencyUnresolved(String),
    #[error("worker error: {0}")] Worker(String),
    #[error("worker timeout tras {attempts} intento(s) de {timeout_secs}s")]
    WorkerTimeout { attempts: u32, timeout_secs: u64 },
    #[error("patient isolation violation: {0}")] PatientIsolation(String),
    #[error("validation mismatch: {0}")] ValidationMismatch(String),
    #[error("internal: {0}")] Internal(String),
}
