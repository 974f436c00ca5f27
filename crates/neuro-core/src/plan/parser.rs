//! Analizador del plan en texto plano.
//!
//! Gramática (una línea por tarea, `-` para campos no aplicables):
//!   FINAL_OUTPUT: <ruta>
//!   <id>. <nombre> | AgentTool=<ref> | Input=<ref> | Output=<ref> |
//!   Params=<k=v,...> | Dependencias=<id,...> | Validación=<criterio>
//!
//! Un plan inviable es exactamente una línea:
//!   tarea_imposible | AgentTool=NONE | Input=- | Output=- | Params=- |
//!   Dependencias=- | Validación=<motivo>
//!
//! El parser re-verifica el orden topológico aunque los planes se escriban
//! ya ordenados, y falla cerrado ante cualquier referencia dudosa.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::spec::{ParsedPlan, Plan, TaskSpec, WorkerKind};
use crate::errors::PlanParseError;

/// Nombre reservado de la línea de inviabilidad.
pub const INFEASIBLE_TASK_NAME: &str = "tarea_imposible";
/// Placeholder de timestamp en nombres de salida.
pub const TIMESTAMP_PLACEHOLDER: &str = "YYYYMMDD_HHMMSS";

const FINAL_OUTPUT_PREFIX: &str = "FINAL_OUTPUT:";
const SENTINEL: &str = "-";

/// Analiza un plan resolviendo placeholders contra el reloj actual.
pub fn parse(text: &str) -> Result<ParsedPlan, PlanParseError> {
    parse_at(text, Utc::now())
}

/// Variante con reloj inyectado: los placeholders `YYYYMMDD_HHMMSS` se
/// resuelven contra `now`, manteniendo deterministas las entradas del
/// ejecutor.
pub fn parse_at(text: &str, now: DateTime<Utc>) -> Result<ParsedPlan, PlanParseError> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return Err(PlanParseError::EmptyPlan);
    }

    // Inviabilidad declarada: una única línea, sin FINAL_OUTPUT.
    if lines.len() == 1 && lines[0].starts_with(INFEASIBLE_TASK_NAME) {
        return parse_infeasible(lines[0]);
    }

    let header = lines[0];
    if !header.starts_with(FINAL_OUTPUT_PREFIX) {
        return Err(PlanParseError::MissingFinalOutput);
    }
    let final_output = resolve_timestamp(header[FINAL_OUTPUT_PREFIX.len()..].trim(), now);
    if final_output.is_empty() {
        return Err(PlanParseError::MissingFinalOutput);
    }

    let mut tasks: Vec<TaskSpec> = Vec::with_capacity(lines.len() - 1);
    for line in &lines[1..] {
        let task = parse_task_line(line, now)?;

        if tasks.iter().any(|t| t.id == task.id) {
            return Err(PlanParseError::DuplicateTaskId(task.id));
        }
        if tasks.iter().any(|t| t.output_name == task.output_name) {
            return Err(PlanParseError::DuplicateOutputName(task.output_name));
        }
        // Toda dependencia debe existir y preceder a su dependiente.
        for dep in &task.dependencies {
            if tasks.iter().all(|t| t.id != *dep) {
                return Err(PlanParseError::UnknownDependency { task: task.id.clone(),
                                                               dependency: dep.clone() });
            }
        }
        tasks.push(task);
    }

    Ok(ParsedPlan::Feasible(Plan { final_output, tasks }))
}

fn parse_infeasible(line: &str) -> Result<ParsedPlan, PlanParseError> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() != 7 || fields[0] != INFEASIBLE_TASK_NAME {
        return Err(PlanParseError::MalformedLine(line.to_string()));
    }
    if expect_field(fields[1], "AgentTool=", line)? != "NONE" {
        return Err(PlanParseError::MalformedLine(line.to_string()));
    }
    let reason = expect_field(fields[6], "Validación=", line)?.to_string();
    Ok(ParsedPlan::Infeasible { reason })
}

fn parse_task_line(line: &str, now: DateTime<Utc>) -> Result<TaskSpec, PlanParseError> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() != 7 {
        return Err(PlanParseError::MalformedLine(line.to_string()));
    }

    let (id, name) = fields[0].split_once('.')
                              .ok_or_else(|| PlanParseError::MalformedLine(line.to_string()))?;
    let id = id.trim().to_string();
    let name = name.trim().to_string();
    if id.is_empty() || name.is_empty() {
        return Err(PlanParseError::MalformedLine(line.to_string()));
    }

    let agent_tool = expect_field(fields[1], "AgentTool=", line)?;
    let worker = WorkerKind::from_agent_tool(agent_tool).ok_or_else(|| PlanParseError::UnknownWorker(agent_tool.to_string()))?;

    let input = match expect_field(fields[2], "Input=", line)? {
        SENTINEL => None,
        other => Some(other.to_string()),
    };

    let output_name = match expect_field(fields[3], "Output=", line)? {
        // Sin salida declarada: nombre sintético estable derivado del id.
        SENTINEL => format!("out_{id}"),
        other => resolve_timestamp(other, now),
    };

    let params = parse_params(expect_field(fields[4], "Params=", line)?, line)?;

    let dependencies = match expect_field(fields[5], "Dependencias=", line)? {
        SENTINEL => Vec::new(),
        list => list.split(',').map(|d| d.trim().to_string()).filter(|d| !d.is_empty()).collect(),
    };

    let validation_criterion = match expect_field(fields[6], "Validación=", line)? {
        SENTINEL => None,
        other => Some(other.to_string()),
    };

    Ok(TaskSpec { id,
                  name,
                  worker,
                  input,
                  output_name,
                  params,
                  dependencies,
                  validation_criterion })
}

fn expect_field<'a>(field: &'a str, prefix: &str, line: &str) -> Result<&'a str, PlanParseError> {
    field.strip_prefix(prefix)
         .map(str::trim)
         .ok_or_else(|| PlanParseError::MalformedLine(line.to_string()))
}

fn parse_params(raw: &str, line: &str) -> Result<IndexMap<String, String>, PlanParseError> {
    let mut params = IndexMap::new();
    if raw == SENTINEL || raw.is_empty() {
        return Ok(params);
    }
    for pair in raw.split(',') {
        let (k, v) = pair.split_once('=')
                         .ok_or_else(|| PlanParseError::MalformedLine(line.to_string()))?;
        params.insert(k.trim().to_string(), v.trim().to_string());
    }
    Ok(params)
}

fn resolve_timestamp(name: &str, now: DateTime<Utc>) -> String {
    if name.contains(TIMESTAMP_PLACEHOLDER) {
        name.replace(TIMESTAMP_PLACEHOLDER, &now.format("%Y%m%d_%H%M%S").to_string())
    } else {
        name.to_string()
    }
}

/// Plan canónico del caso completo para un paciente: listar → historial →
/// clasificar → segmentar → triaje → informe → validación. Sustituye al
/// colaborador de planificación externo en la demo y en las pruebas.
pub fn default_case_plan(patient_identifier: &str) -> String {
    let p = patient_identifier;
    format!("FINAL_OUTPUT: data/reportes/{p}_informe_{TIMESTAMP_PLACEHOLDER}.pdf\n\
             1. listar_imagenes | AgentTool=invoke_image_lister_agent | Input={p} | Output=lister.json | Params=- | Dependencias=- | Validación=pares flair/t1ce completos\n\
             2. consultar_historial | AgentTool=invoke_rag_agent | Input=- | Output=rag.json | Params=patient_id={p},query=historial médico del paciente | Dependencias=- | Validación=contexto del paciente solicitado\n\
             3. clasificar_imagenes | AgentTool=invoke_classification_agent | Input=lister.json | Output=classification.json | Params=- | Dependencias=1 | Validación=una entrada por escaneo\n\
             4. segmentar_imagenes | AgentTool=invoke_segmentation_agent | Input=lister.json | Output=segmentation.json | Params=- | Dependencias=1,3 | Validación=máscara por escaneo segmentado\n\
             5. evaluar_urgencia | AgentTool=invoke_triage_agent | Input=- | Output=triage.json | Params=- | Dependencias=2,3,4 | Validación=riesgo justificado con datos previos\n\
             6. generar_informe | AgentTool=invoke_reportes_agent | Input=- | Output=report.json | Params=patient_id={p} | Dependencias=1,2,3,4,5 | Validación=campos sin fuente en NO DISPONIBLE\n\
             7. validar_informe | AgentTool=invoke_validator_agent | Input=report.json | Output=report_validated.json | Params=- | Dependencias=1,2,3,4,5,6 | Validación=informe fiel a los artifacts fuente\n")
}
