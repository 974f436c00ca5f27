//! Modelo declarativo del plan: lista ordenada de tareas con worker,
//! entradas, salidas, parámetros y dependencias explícitas.
//!
//! El despacho es cerrado: cada referencia `AgentTool=` del plan se
//! resuelve a un `WorkerKind` en tiempo de análisis, nunca en tiempo de
//! llamada.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Conjunto cerrado de capacidades de procesamiento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerKind {
    /// Capacidad de planificación; sólo legítima como primera tarea de un
    /// run, nunca re-invocada.
    Planner,
    ImageLister,
    Classifier,
    Segmenter,
    ContextRetrieval,
    Triage,
    ReportComposer,
    ReportValidator,
}

impl WorkerKind {
    /// Resuelve la referencia `AgentTool=` de una línea del plan.
    pub fn from_agent_tool(reference: &str) -> Option<Self> {
        match reference {
            "invoke_planner_agent" => Some(Self::Planner),
            "invoke_image_lister_agent" => Some(Self::ImageLister),
            "invoke_classification_agent" => Some(Self::Classifier),
            "invoke_segmentation_agent" => Some(Self::Segmenter),
            "invoke_rag_agent" => Some(Self::ContextRetrieval),
            "invoke_triage_agent" => Some(Self::Triage),
            "invoke_reportes_agent" => Some(Self::ReportComposer),
            "invoke_validator_agent" => Some(Self::ReportValidator),
            _ => None,
        }
    }

    pub fn agent_tool(&self) -> &'static str {
        match self {
            Self::Planner => "invoke_planner_agent",
            Self::ImageLister => "invoke_image_lister_agent",
            Self::Classifier => "invoke_classification_agent",
            Self::Segmenter => "invoke_segmentation_agent",
            Self::ContextRetrieval => "invoke_rag_agent",
            Self::Triage => "invoke_triage_agent",
            Self::ReportComposer => "invoke_reportes_agent",
            Self::ReportValidator => "invoke_validator_agent",
        }
    }
}

/// Una unidad de trabajo del plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    pub name: String,
    pub worker: WorkerKind,
    /// Campo `Input=` crudo; `-` se normaliza a `None`. Puede referir al id
    /// o al nombre de salida de una tarea previa, o ser un literal.
    pub input: Option<String>,
    /// Nombre de salida, único dentro del run.
    pub output_name: String,
    pub params: IndexMap<String, String>,
    /// Ids de tareas que deben completarse antes; siempre anteriores en el
    /// orden de declaración.
    pub dependencies: Vec<String>,
    pub validation_criterion: Option<String>,
}

/// Plan validado y topológicamente ordenado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub final_output: String,
    pub tasks: Vec<TaskSpec>,
}

impl Plan {
    pub fn task(&self, id: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Resultado del análisis: plan ejecutable o inviabilidad declarada por el
/// planificador (terminal, no un error).
#[derive(Debug, Clone)]
pub enum ParsedPlan {
    Feasible(Plan),
    Infeasible { reason: String },
}
