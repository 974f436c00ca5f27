//! Ejecutor del plan (orquestador).
//!
//! Recorre las tareas en el orden topológico ya validado, resuelve las
//! entradas de cada una desde los artifacts previos, invoca al worker
//! registrado y aplica las políticas del run:
//! - salto condicional por predicado de ramificación (marcador `Skipped`);
//! - aislamiento de fallos por ítem (un ítem caído no aborta hermanos);
//! - corte duro de dependientes transitivos cuando una tarea entera falla;
//! - timeout + reintentos acotados por invocación de worker;
//! - aborto inmediato ante violación de aislamiento de paciente.
//!
//! Comportamiento terminal: `execute` siempre devuelve un `RunResult` bien
//! formado, incluso ante fallo total; ninguna excepción escapa al llamador.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use super::context::RunContext;
use super::predicate::{BranchDecision, BranchPredicate, SegmentationGate};
use crate::artifact::{Artifact, ArtifactStore};
use crate::config::EngineConfig;
use crate::errors::{EngineError, PlanParseError};
use crate::event::{EventStore, RunEventKind};
use crate::hashing::hash_value;
use crate::plan::{ParsedPlan, Plan, TaskSpec, WorkerKind};
use crate::worker::{TaskResult, Worker, WorkerInput, WorkerRegistry};

/// Resultado agregado de un run, siempre bien formado.
#[derive(Debug)]
pub struct RunResult {
    pub run_id: Uuid,
    /// Referencia del entregable final; `None` si el run no lo produjo.
    pub final_output_ref: Option<String>,
    /// Resultado por tarea, en orden de plan.
    pub results: IndexMap<String, TaskResult>,
    /// Motivo de inviabilidad declarado por el planificador, si aplica.
    pub infeasible: Option<String>,
    /// Primer fallo irrecuperable del run, si lo hubo.
    pub error: Option<EngineError>,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.infeasible.is_none() && self.final_output_ref.is_some()
    }
}

pub struct Executor<E: EventStore> {
    registry: WorkerRegistry,
    store: Arc<dyn ArtifactStore>,
    events: E,
    predicates: Vec<Box<dyn BranchPredicate>>,
    config: EngineConfig,
}

impl<E: EventStore> Executor<E> {
    /// Ejecutor con la puerta de segmentación instalada por defecto.
    pub fn new(registry: WorkerRegistry, store: Arc<dyn ArtifactStore>, events: E, config: EngineConfig) -> Self {
        let predicates: Vec<Box<dyn BranchPredicate>> = vec![Box::new(SegmentationGate::new(config.segmentation_threshold))];
        Self { registry,
               store,
               events,
               predicates,
               config }
    }

    pub fn with_predicate(mut self, predicate: Box<dyn BranchPredicate>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub async fn execute(&mut self, parsed: &ParsedPlan) -> RunResult {
        let mut ctx = RunContext::new(self.config.clone(), self.store.clone());

        let plan = match parsed {
            ParsedPlan::Feasible(plan) => plan,
            ParsedPlan::Infeasible { reason } => {
                // El planificador declaró la petición inviable: no se
                // intenta ninguna tarea.
                tracing::info!(run_id = %ctx.run_id, %reason, "plan inviable, run sin tareas");
                return RunResult { run_id: ctx.run_id,
                                   final_output_ref: None,
                                   results: IndexMap::new(),
                                   infeasible: Some(reason.clone()),
                                   error: None };
            }
        };

        ctx = ctx.with_final_output(plan.final_output.clone());

        if let Err(misuse) = check_planner_policy(plan) {
            self.events.append_kind(ctx.run_id, RunEventKind::RunAborted { error: misuse.to_string() });
            return RunResult { run_id: ctx.run_id,
                               final_output_ref: None,
                               results: IndexMap::new(),
                               infeasible: None,
                               error: Some(misuse) };
        }

        let plan_hash = hash_value(&serde_json::to_value(plan).unwrap_or(Value::Null));
        self.events.append_kind(ctx.run_id,
                                RunEventKind::RunStarted { plan_hash,
                                                           task_count: plan.tasks.len() });

        let mut results: IndexMap<String, TaskResult> = IndexMap::with_capacity(plan.tasks.len());

        for (index, task) in plan.tasks.iter().enumerate() {
            // Corte duro: una dependencia entera en error contamina a todos
            // sus dependientes transitivos, sin invocar sus workers.
            if let Some(failed_dep) = task.dependencies.iter().find(|d| results.get(*d).is_some_and(TaskResult::is_error)) {
                let result = TaskResult::error(task.id.clone(), format!("dependency unresolved: {failed_dep}"));
                self.events.append_kind(ctx.run_id,
                                        RunEventKind::TaskFailed { index,
                                                                   task_id: task.id.clone(),
                                                                   error: result.error_detail.clone().unwrap_or_default() });
                results.insert(task.id.clone(), result);
                continue;
            }

            // Predicado de ramificación: la tarea puede no aplicar.
            if let Some(reason) = self.skip_reason(task, &results) {
                tracing::info!(run_id = %ctx.run_id, task = %task.id, %reason, "tarea saltada");
                let result = TaskResult::skipped(task.id.clone());
                if let Err(e) = self.store.put(Artifact::new(task.output_name.clone(), task.id.clone(), result.payload.to_value())) {
                    results.insert(task.id.clone(), TaskResult::error(task.id.clone(), e.to_string()));
                    continue;
                }
                self.events.append_kind(ctx.run_id,
                                        RunEventKind::TaskSkipped { index, task_id: task.id.clone(), reason });
                results.insert(task.id.clone(), result);
                continue;
            }

            let Some(worker) = self.registry.resolve(task.worker) else {
                let result = TaskResult::error(task.id.clone(), format!("worker no registrado para {}", task.worker.agent_tool()));
                self.events.append_kind(ctx.run_id,
                                        RunEventKind::TaskFailed { index,
                                                                   task_id: task.id.clone(),
                                                                   error: result.error_detail.clone().unwrap_or_default() });
                results.insert(task.id.clone(), result);
                continue;
            };

            self.events.append_kind(ctx.run_id,
                                    RunEventKind::TaskStarted { index, task_id: task.id.clone() });

            let input = self.resolve_input(task, plan);
            let result = match self.invoke_bounded(worker, &ctx, input, task).await {
                Ok(mut result) => {
                    // El id de tarea lo asigna el plan, no el worker.
                    result.task_id = task.id.clone();
                    result
                }
                Err(EngineError::PatientIsolation(detail)) => {
                    // Fuga entre pacientes: el run se corta de inmediato.
                    let error = EngineError::PatientIsolation(detail);
                    tracing::error!(run_id = %ctx.run_id, task = %task.id, %error, "aislamiento de paciente violado");
                    results.insert(task.id.clone(), TaskResult::error(task.id.clone(), error.to_string()));
                    self.events.append_kind(ctx.run_id, RunEventKind::RunAborted { error: error.to_string() });
                    return RunResult { run_id: ctx.run_id,
                                       final_output_ref: None,
                                       results,
                                       infeasible: None,
                                       error: Some(error) };
                }
                // Cualquier otro fallo interno se degrada a error de tarea.
                Err(e) => TaskResult::error(task.id.clone(), e.to_string()),
            };

            if result.is_error() {
                self.events.append_kind(ctx.run_id,
                                        RunEventKind::TaskFailed { index,
                                                                   task_id: task.id.clone(),
                                                                   error: result.error_detail.clone().unwrap_or_default() });
                results.insert(task.id.clone(), result);
                continue;
            }

            // Persistir el artifact antes de registrar el resultado: la
            // escritura debe ser visible para cualquier lector posterior.
            let artifact = Artifact::new(task.output_name.clone(), task.id.clone(), result.payload.to_value());
            let artifact_hash = artifact.hash.clone();
            if let Err(e) = self.store.put(artifact) {
                let failed = TaskResult::error(task.id.clone(), e.to_string());
                self.events.append_kind(ctx.run_id,
                                        RunEventKind::TaskFailed { index,
                                                                   task_id: task.id.clone(),
                                                                   error: failed.error_detail.clone().unwrap_or_default() });
                results.insert(task.id.clone(), failed);
                continue;
            }
            self.events.append_kind(ctx.run_id,
                                    RunEventKind::TaskFinished { index,
                                                                 task_id: task.id.clone(),
                                                                 output_name: task.output_name.clone(),
                                                                 artifact_hash });
            results.insert(task.id.clone(), result);
        }

        let final_output_ref = final_output_ref(plan, &results);
        self.events.append_kind(ctx.run_id,
                                RunEventKind::RunCompleted { final_output_ref: final_output_ref.clone() });

        RunResult { run_id: ctx.run_id,
                    final_output_ref,
                    results,
                    infeasible: None,
                    error: None }
    }

    fn skip_reason(&self, task: &TaskSpec, upstream: &IndexMap<String, TaskResult>) -> Option<String> {
        self.predicates
            .iter()
            .filter(|p| p.applies_to() == task.worker)
            .find_map(|p| match p.evaluate(task, upstream) {
                BranchDecision::Run => None,
                BranchDecision::Skip { reason } => Some(reason),
            })
    }

    /// Resuelve el campo `Input=` y los artifacts de las dependencias
    /// declaradas. Un `Input=` que no corresponde a ninguna tarea previa ni
    /// a ningún artifact es un literal.
    fn resolve_input(&self, task: &TaskSpec, plan: &Plan) -> WorkerInput {
        let mut dependencies = Vec::with_capacity(task.dependencies.len());
        for dep_id in &task.dependencies {
            if let Some(dep_task) = plan.task(dep_id) {
                if let Some(artifact) = self.store.get(&dep_task.output_name) {
                    dependencies.push(artifact);
                }
            }
        }

        let (document, literal) = match &task.input {
            None => (None, None),
            Some(raw) => {
                if let Some(prev) = plan.task(raw) {
                    (self.store.get(&prev.output_name).map(|a| a.payload), None)
                } else if let Some(artifact) = self.store.get(raw) {
                    (Some(artifact.payload), None)
                } else {
                    (None, Some(raw.clone()))
                }
            }
        };

        WorkerInput { document, literal, dependencies }
    }

    /// Invocación acotada: timeout por intento y presupuesto de reintentos
    /// pequeño. Agotado el presupuesto se devuelve `WorkerTimeout` en lugar
    /// de colgar el run.
    async fn invoke_bounded(&self,
                            worker: Arc<dyn Worker>,
                            ctx: &RunContext,
                            input: WorkerInput,
                            task: &TaskSpec)
                            -> Result<TaskResult, EngineError> {
        let timeout = Duration::from_secs(self.config.worker_timeout_secs);
        let attempts = self.config.worker_retries + 1;
        for attempt in 1..=attempts {
            let call = worker.invoke(ctx, input.clone(), &task.params);
            match tokio::time::timeout(timeout, call.instrument(ctx.span())).await {
                Ok(outcome) => return outcome,
                Err(_) => {
                    tracing::warn!(run_id = %ctx.run_id, task = %task.id, attempt, "timeout de worker");
                }
            }
        }
        Err(EngineError::WorkerTimeout { attempts,
                                         timeout_secs: self.config.worker_timeout_secs })
    }
}

/// La planificación ocurre exactamente una vez y sólo como primera tarea;
/// cualquier otra aparición se rechaza antes de ejecutar nada.
fn check_planner_policy(plan: &Plan) -> Result<(), EngineError> {
    let planner_ids: Vec<&str> = plan.tasks
                                     .iter()
                                     .filter(|t| t.worker == WorkerKind::Planner)
                                     .map(|t| t.id.as_str())
                                     .collect();
    if planner_ids.len() > 1 || plan.tasks.iter().skip(1).any(|t| t.worker == WorkerKind::Planner) {
        return Err(EngineError::PlanParse(PlanParseError::PlannerMisuse(planner_ids.join(","))));
    }
    Ok(())
}

/// Referencia del entregable final. La referencia corregida por el
/// validador, cuando existe, tiene precedencia sobre la ruta declarada en
/// el plan.
fn final_output_ref(plan: &Plan, results: &IndexMap<String, TaskResult>) -> Option<String> {
    for result in results.values().rev() {
        if result.is_error() {
            continue;
        }
        if let Some(doc) = result.payload.as_document() {
            if let Some(r) = doc.get("final_ref").and_then(Value::as_str) {
                return Some(r.to_string());
            }
        }
    }

    let producing = plan.tasks
                        .iter()
                        .rev()
                        .find(|t| t.output_name == plan.final_output)
                        .or_else(|| plan.tasks.last());
    match producing.and_then(|t| results.get(&t.id)) {
        Some(r) if !r.is_error() => Some(plan.final_output.clone()),
        _ => None,
    }
}
