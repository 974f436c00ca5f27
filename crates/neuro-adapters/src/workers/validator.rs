//! Validación del informe en dos fases, con autocorrección acotada.
//!
//! Fase A (contenido): cada campo del informe maestro debe ser trazable a
//! su artifact fuente; ante cualquier discrepancia se reconstruye el
//! informe sólo con valores verificados y se re-renderiza el entregable.
//! Fase B (documento renderizado): el texto extraído del entregable debe
//! contener los valores cruciales; si falta alguno se regenera una única
//! vez. Un fallo tras la regeneración es un error de validación fatal, no
//! un reintento infinito.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use neuro_core::{EngineError, RunContext, TaskResult, Worker, WorkerInput, WorkerKind};
use neuro_domain::{format_probability, MasterReport, ValidationPhase, ValidationVerdict};

use crate::collaborators::ReportRenderer;
use crate::sources::SourceArtifacts;
use crate::workers::report::compose_master_report;

/// Referencia del artifact con el informe corregido.
pub const CORRECTED_REPORT_REF: &str = "report_validated.json";

/// Estados del ciclo de validación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Pending,
    ContentChecking,
    ContentApproved,
    ContentRejected,
    Corrected,
    RenderChecking,
    RenderApproved,
    RenderRejected,
    Rerendered,
    Terminal,
}

pub struct ReportValidatorWorker {
    renderer: Arc<dyn ReportRenderer>,
}

impl ReportValidatorWorker {
    pub fn new(renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { renderer }
    }
}

/// Claves del informe (serializado) que difieren entre el informe bajo
/// validación y el reconstruido desde las fuentes.
fn content_mismatches(report: &MasterReport, rebuilt: &MasterReport) -> Vec<String> {
    let a = serde_json::to_value(report).unwrap_or_default();
    let b = serde_json::to_value(rebuilt).unwrap_or_default();
    match (a.as_object(), b.as_object()) {
        (Some(a), Some(b)) => b.iter()
                               .filter(|(key, expected)| a.get(key.as_str()) != Some(expected))
                               .map(|(key, _)| key.clone())
                               .collect(),
        _ => vec!["informe".to_string()],
    }
}

/// Valores cruciales ausentes del texto renderizado.
fn missing_crucial_values(report: &MasterReport, text: &str) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !text.contains(&report.patient_id) {
        missing.push("paciente_id");
    }
    if !text.contains(&report.name) {
        missing.push("nombre");
    }
    if !text.contains(&report.date) {
        missing.push("fecha");
    }
    if !text.contains(&report.risk) {
        missing.push("riesgo");
    }
    if let Some(p) = report.tumor_prob {
        if !text.contains(&format_probability(p)) {
            missing.push("tumor_prob");
        }
    }
    missing
}

#[async_trait]
impl Worker for ReportValidatorWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::ReportValidator
    }

    async fn invoke(&self,
                    ctx: &RunContext,
                    input: WorkerInput,
                    _params: &IndexMap<String, String>)
                    -> Result<TaskResult, EngineError> {
        let Some(doc) = input.document.as_ref() else {
            return Ok(TaskResult::error("", "informe maestro ausente"));
        };
        let Ok(report) = serde_json::from_value::<MasterReport>(doc.clone()) else {
            return Ok(TaskResult::error("", "informe maestro ilegible"));
        };

        let sources = SourceArtifacts::from_dependencies(&input.dependencies);
        let patient = sources.patient_identifier().unwrap_or(&report.patient_id).to_string();

        let validated_ref = format!("data/reportes/{patient}_validado.pdf");
        let mut current_ref = ctx.final_output()
                                 .map(str::to_string)
                                 .unwrap_or_else(|| validated_ref.clone());

        let mut verdicts: Vec<ValidationVerdict> = Vec::new();
        let mut current = report;
        let mut rerendered = false;
        let mut state = LoopState::Pending;

        loop {
            state = match state {
                LoopState::Pending => LoopState::ContentChecking,

                LoopState::ContentChecking => {
                    let mut rebuilt = compose_master_report(&sources, &patient, None);
                    // El motivo de consulta no tiene artifact fuente: se
                    // acepta el declarado.
                    rebuilt.consultation_reason = current.consultation_reason.clone();
                    let mismatches = content_mismatches(&current, &rebuilt);
                    if mismatches.is_empty() {
                        LoopState::ContentApproved
                    } else {
                        tracing::info!(run_id = %ctx.run_id, campos = ?mismatches,
                                       "informe inconsistente con sus fuentes; se corrige");
                        current = rebuilt;
                        LoopState::ContentRejected
                    }
                }

                LoopState::ContentApproved => {
                    verdicts.push(ValidationVerdict::approved(ValidationPhase::ContentCheck));
                    LoopState::RenderChecking
                }

                LoopState::ContentRejected => {
                    verdicts.push(ValidationVerdict::rejected(ValidationPhase::ContentCheck,
                                                              CORRECTED_REPORT_REF.to_string()));
                    LoopState::Corrected
                }

                LoopState::Corrected => {
                    // El entregable se regenera desde el informe corregido.
                    current_ref = validated_ref.clone();
                    match self.renderer.render(&current, &current_ref).await {
                        Ok(_) => LoopState::RenderChecking,
                        Err(e) => return Ok(TaskResult::error("", e.to_string())),
                    }
                }

                LoopState::RenderChecking => {
                    let text = self.renderer.extract_text(&current_ref).await.unwrap_or_default();
                    let missing = missing_crucial_values(&current, &text);
                    if missing.is_empty() {
                        LoopState::RenderApproved
                    } else {
                        tracing::info!(run_id = %ctx.run_id, faltan = ?missing,
                                       "entregable sin valores cruciales");
                        LoopState::RenderRejected
                    }
                }

                LoopState::RenderApproved => {
                    verdicts.push(ValidationVerdict::approved(ValidationPhase::RenderedArtifactCheck));
                    LoopState::Terminal
                }

                LoopState::RenderRejected => {
                    if rerendered {
                        // Una única regeneración por fase; aquí ya falló dos veces.
                        return Err(EngineError::ValidationMismatch(format!("el entregable '{current_ref}' sigue incompleto tras regenerarlo")));
                    }
                    verdicts.push(ValidationVerdict::rejected(ValidationPhase::RenderedArtifactCheck,
                                                              validated_ref.clone()));
                    current_ref = validated_ref.clone();
                    match self.renderer.render(&current, &current_ref).await {
                        Ok(_) => LoopState::Rerendered,
                        Err(e) => return Ok(TaskResult::error("", e.to_string())),
                    }
                }

                LoopState::Rerendered => {
                    rerendered = true;
                    LoopState::RenderChecking
                }

                LoopState::Terminal => break,
            };
        }

        // Informe final (corregido si hizo falta) + veredictos + referencia
        // del entregable aprobado.
        let mut payload = serde_json::to_value(&current).map_err(|e| EngineError::Internal(e.to_string()))?;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("validaciones".to_string(),
                       serde_json::to_value(&verdicts).map_err(|e| EngineError::Internal(e.to_string()))?);
            obj.insert("final_ref".to_string(), Value::String(current_ref));
        }
        Ok(TaskResult::success("", payload))
    }
}
