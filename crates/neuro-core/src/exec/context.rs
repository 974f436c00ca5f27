//! Contexto explícito por run: identidad, configuración y acceso de
//! lectura al store de artifacts. Sustituye cualquier estado global: todo
//! componente que necesite el run id o el sink de log lo recibe por aquí.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::artifact::ArtifactStore;
use crate::config::EngineConfig;

#[derive(Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub config: EngineConfig,
    store: Arc<dyn ArtifactStore>,
    final_output: Option<String>,
}

impl RunContext {
    pub fn new(config: EngineConfig, store: Arc<dyn ArtifactStore>) -> Self {
        Self { run_id: Uuid::new_v4(),
               started_at: Utc::now(),
               config,
               store,
               final_output: None }
    }

    /// Fija la ruta del entregable declarada por el plan (`FINAL_OUTPUT:`).
    pub fn with_final_output(mut self, final_output: String) -> Self {
        self.final_output = Some(final_output);
        self
    }

    /// Ruta del entregable final declarada por el plan, si la hay.
    pub fn final_output(&self) -> Option<&str> {
        self.final_output.as_deref()
    }

    /// Acceso compartido de sólo-lectura a los artifacts del run.
    pub fn artifacts(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    /// Span raíz del run; toda traza de workers cuelga de él.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("run", run_id = %self.run_id)
    }
}
