//! Artifacts: documentos JSON producidos por tareas y consumidos por sus
//! dependientes.
//!
//! - `payload` es JSON neutro; el motor no interpreta su semántica.
//! - `hash` se calcula sobre el JSON canonicalizado y sirve de identidad
//!   para idempotencia (re-ejecutar con el mismo input produce el mismo
//!   hash y sobrescribe, no duplica).
//! - Dentro de un run, cada `name` tiene un único productor; la escritura
//!   ocurre antes de que cualquier dependiente lea (write-then-visible).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EngineError;
use crate::hashing::hash_value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Nombre de salida declarado en el plan (clave del store).
    pub name: String,
    /// Tarea productora.
    pub task_id: String,
    pub payload: Value,
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(name: String, task_id: String, payload: Value) -> Self {
        let hash = hash_value(&payload);
        Self { name,
               task_id,
               payload,
               hash,
               created_at: Utc::now() }
    }
}

/// Almacenamiento clave→documento compartido en lectura por las tareas del
/// run. Multi-lector, un único escritor por nombre.
pub trait ArtifactStore: Send + Sync {
    fn put(&self, artifact: Artifact) -> Result<(), EngineError>;
    fn get(&self, name: &str) -> Option<Artifact>;
    fn names(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    inner: DashMap<String, Artifact>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn put(&self, artifact: Artifact) -> Result<(), EngineError> {
        if let Some(existing) = self.inner.get(&artifact.name) {
            // Sobrescribir es legítimo sólo para la misma tarea (re-ejecución).
            if existing.task_id != artifact.task_id {
                return Err(EngineError::Internal(format!("colisión de output_name '{}': tareas '{}' y '{}'",
                                                         artifact.name, existing.task_id, artifact.task_id)));
            }
        }
        self.inner.insert(artifact.name.clone(), artifact);
        Ok(())
    }

    fn get(&self, name: &str) -> Option<Artifact> {
        self.inner.get(name).map(|a| a.clone())
    }

    fn names(&self) -> Vec<String> {
        self.inner.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rerun_overwrites_without_duplicating() {
        let store = InMemoryArtifactStore::new();
        store.put(Artifact::new("salida.json".into(), "1".into(), json!({"v": 1}))).unwrap();
        store.put(Artifact::new("salida.json".into(), "1".into(), json!({"v": 2}))).unwrap();
        assert_eq!(store.names().len(), 1);
        assert_eq!(store.get("salida.json").unwrap().payload, json!({"v": 2}));
    }

    #[test]
    fn identical_payload_yields_identical_hash() {
        let a = Artifact::new("x".into(), "1".into(), json!({"a": 1, "b": 2}));
        let b = Artifact::new("x".into(), "1".into(), json!({"b": 2, "a": 1}));
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn cross_task_name_collision_is_rejected() {
        let store = InMemoryArtifactStore::new();
        store.put(Artifact::new("salida.json".into(), "1".into(), json!(1))).unwrap();
        let err = store.put(Artifact::new("salida.json".into(), "2".into(), json!(2)));
        assert!(err.is_err());
    }
}
