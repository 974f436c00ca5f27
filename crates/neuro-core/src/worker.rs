//! Contrato uniforme de worker y resultados de tarea.
//!
//! Un worker nunca propaga pánicos ni errores "sueltos": todo fallo
//! ordinario se expresa en el `TaskResult` devuelto. El `Err` del contrato
//! queda reservado para condiciones fatales del run (violación de
//! aislamiento de paciente), que el ejecutor corta de inmediato.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::artifact::Artifact;
use crate::errors::EngineError;
use crate::exec::RunContext;
use crate::plan::WorkerKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Success,
    Error,
}

/// Payload de un resultado: documento opaco, o el marcador explícito de
/// tarea saltada. `Skipped` permite a los dependientes distinguir "se
/// ejecutó y no encontró nada" de "no se ejecutó".
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    Document(Value),
    Skipped,
}

impl TaskPayload {
    pub fn as_document(&self) -> Option<&Value> {
        match self {
            TaskPayload::Document(v) => Some(v),
            TaskPayload::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TaskPayload::Skipped)
    }

    /// Representación JSON persistible (el marcador de salto también se
    /// materializa como documento).
    pub fn to_value(&self) -> Value {
        match self {
            TaskPayload::Document(v) => v.clone(),
            TaskPayload::Skipped => json!({ "skipped": true }),
        }
    }
}

impl Serialize for TaskPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TaskPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.get("skipped").and_then(Value::as_bool) == Some(true) {
            if value.as_object().map(|m| m.len()) == Some(1) {
                return Ok(TaskPayload::Skipped);
            }
            return Err(D::Error::custom("marcador 'skipped' con campos extra"));
        }
        Ok(TaskPayload::Document(value))
    }
}

/// Resultado inmutable de la ejecución de una tarea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    pub payload: TaskPayload,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_detail: Option<String>,
}

impl TaskResult {
    pub fn success(task_id: impl Into<String>, document: Value) -> Self {
        Self { task_id: task_id.into(),
               status: TaskStatus::Success,
               payload: TaskPayload::Document(document),
               error_detail: None }
    }

    pub fn skipped(task_id: impl Into<String>) -> Self {
        Self { task_id: task_id.into(),
               status: TaskStatus::Success,
               payload: TaskPayload::Skipped,
               error_detail: None }
    }

    /// Fallo de tarea completa: el payload lleva el error de forma
    /// explícita, como documento.
    pub fn error(task_id: impl Into<String>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self { task_id: task_id.into(),
               status: TaskStatus::Error,
               payload: TaskPayload::Document(json!({ "error": detail })),
               error_detail: Some(detail) }
    }

    pub fn is_error(&self) -> bool {
        self.status == TaskStatus::Error
    }
}

/// Entradas resueltas por el ejecutor antes de invocar al worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerInput {
    /// Payload del artifact referido por el campo `Input=` (si refería a
    /// una tarea previa).
    pub document: Option<Value>,
    /// Valor literal del campo `Input=` cuando no refiere a un artifact.
    pub literal: Option<String>,
    /// Artifacts de las dependencias declaradas, en orden de declaración.
    pub dependencies: Vec<Artifact>,
}

#[async_trait]
pub trait Worker: Send + Sync {
    fn kind(&self) -> WorkerKind;

    async fn invoke(&self,
                    ctx: &RunContext,
                    input: WorkerInput,
                    params: &IndexMap<String, String>)
                    -> Result<TaskResult, EngineError>;
}

/// Registro cerrado de workers por capacidad.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerKind, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self { workers: HashMap::new() }
    }

    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        self.workers.insert(worker.kind(), worker);
    }

    pub fn resolve(&self, kind: WorkerKind) -> Option<Arc<dyn Worker>> {
        self.workers.get(&kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_payload_roundtrips_as_marker_document() {
        let r = TaskResult::skipped("4");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["payload"], serde_json::json!({"skipped": true}));
        let back: TaskResult = serde_json::from_value(json).unwrap();
        assert!(back.payload.is_skipped());
    }

    #[test]
    fn error_result_carries_explicit_error_document() {
        let r = TaskResult::error("3", "fallo de inferencia");
        assert!(r.is_error());
        assert_eq!(r.payload.as_document().unwrap()["error"], "fallo de inferencia");
    }
}
