//! Eventos de ejecución del run y almacén append-only.
//!
//! Los eventos permiten reconstruir el diagnóstico interno de un run sin
//! exponerlo al exterior: el llamador sólo ve el `RunResult`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEventKind {
    /// Primer evento de un run: fija el hash del plan y su tamaño.
    RunStarted { plan_hash: String, task_count: usize },
    TaskStarted { index: usize, task_id: String },
    /// La tarea terminó bien y su artifact quedó visible para dependientes.
    TaskFinished {
        index: usize,
        task_id: String,
        output_name: String,
        artifact_hash: String,
    },
    /// La tarea se saltó por predicado de ramificación.
    TaskSkipped { index: usize, task_id: String, reason: String },
    TaskFailed { index: usize, task_id: String, error: String },
    RunCompleted { final_output_ref: Option<String> },
    /// Corte inmediato del run (condición fatal).
    RunAborted { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u64, // orden de append dentro del run
    pub run_id: Uuid,
    pub kind: RunEventKind,
    pub ts: DateTime<Utc>,
}

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo
    /// (con seq y ts).
    fn append_kind(&mut self, run_id: Uuid, kind: RunEventKind) -> RunEvent;
    /// Lista eventos de un run (orden ascendente por seq).
    fn list(&self, run_id: Uuid) -> Vec<RunEvent>;
}

#[derive(Default)]
pub struct InMemoryEventStore {
    inner: HashMap<Uuid, Vec<RunEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, run_id: Uuid, kind: RunEventKind) -> RunEvent {
        let vec = self.inner.entry(run_id).or_default();
        let seq = vec.len() as u64;
        let ev = RunEvent { seq, run_id, kind, ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }

    fn list(&self, run_id: Uuid) -> Vec<RunEvent> {
        self.inner.get(&run_id).cloned().unwrap_or_default()
    }
}
