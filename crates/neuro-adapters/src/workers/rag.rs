//! Recuperación de contexto clínico con aislamiento estricto por paciente.
//!
//! La consulta se expande con sinónimos clínicos antes de buscar. Todo
//! documento cuyo propietario no coincide exactamente con el paciente
//! solicitado se descarta (fail closed); un documento ajeno que llegara a
//! quedarse es una violación fatal que corta el run entero.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use neuro_core::{EngineError, RunContext, TaskResult, Worker, WorkerInput, WorkerKind};
use neuro_domain::ContextRecord;

use crate::collaborators::{IndexedDocument, SemanticIndex};
use crate::expansion::expand_query;

const DEFAULT_QUERY: &str = "historial médico del paciente";
const RETRIEVAL_K: usize = 3;

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Guardia final de aislamiento: exige que cada documento retenido
/// pertenezca exactamente al paciente solicitado. Falla cerrado.
pub fn verify_patient_sources(documents: &[IndexedDocument], patient: &str) -> Result<(), EngineError> {
    let patient = normalize(patient);
    for doc in documents {
        if normalize(&doc.owner_identifier) != patient {
            return Err(EngineError::PatientIsolation(format!("documento de '{}' en el contexto de '{}'",
                                                             doc.owner_identifier, patient)));
        }
    }
    Ok(())
}

pub struct ContextWorker {
    index: Arc<dyn SemanticIndex>,
}

impl ContextWorker {
    pub fn new(index: Arc<dyn SemanticIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Worker for ContextWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::ContextRetrieval
    }

    async fn invoke(&self,
                    ctx: &RunContext,
                    input: WorkerInput,
                    params: &IndexMap<String, String>)
                    -> Result<TaskResult, EngineError> {
        let Some(raw_patient) = params.get("patient_id").cloned().or(input.literal) else {
            return Ok(TaskResult::error("", "identificador de paciente ausente"));
        };
        let patient = normalize(&raw_patient);

        let query = params.get("query").map(String::as_str).unwrap_or(DEFAULT_QUERY);
        let expanded = expand_query(query);

        let documents = match self.index.search(&expanded, RETRIEVAL_K).await {
            Ok(docs) => docs,
            Err(e) => return Ok(TaskResult::error("", e.to_string())),
        };

        // Filtro obligatorio: coincidencia exacta del propietario
        // normalizado. Documentos sin propietario se descartan.
        let total = documents.len();
        let kept: Vec<IndexedDocument> = documents.into_iter()
                                                  .filter(|d| !d.owner_identifier.is_empty() && normalize(&d.owner_identifier) == patient)
                                                  .collect();
        if kept.len() < total {
            tracing::info!(run_id = %ctx.run_id, %patient, discarded = total - kept.len(),
                           "documentos de otros pacientes descartados");
        }
        verify_patient_sources(&kept, &patient)?;

        let record = if kept.is_empty() {
            ContextRecord::not_found(patient, expanded)
        } else {
            ContextRecord { patient_identifier: patient,
                            query: expanded,
                            context: kept.iter().map(|d| d.content.as_str()).collect::<Vec<_>>().join("\n\n") }
        };
        let doc = serde_json::to_value(&record).map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(TaskResult::success("", doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use neuro_core::{EngineConfig, InMemoryArtifactStore};
    use neuro_domain::NO_CONTEXT_MARKER;

    use crate::stubs::StubSemanticIndex;

    fn ctx() -> RunContext {
        RunContext::new(EngineConfig::default(), Arc::new(InMemoryArtifactStore::new()))
    }

    fn params(patient: &str) -> IndexMap<String, String> {
        let mut p = IndexMap::new();
        p.insert("patient_id".to_string(), patient.to_string());
        p.insert("query".to_string(), "historial del paciente".to_string());
        p
    }

    fn carlos_docs() -> Vec<IndexedDocument> {
        vec![IndexedDocument { owner_identifier: "carlos_perez".into(),
                               content: "Paciente con historial de cefaleas y antecedentes de neoplasia.".into() }]
    }

    #[tokio::test]
    async fn foreign_documents_never_leak_into_context() {
        let worker = ContextWorker::new(Arc::new(StubSemanticIndex::new(carlos_docs())));
        let result = worker.invoke(&ctx(), WorkerInput::default(), &params("ana_lopez")).await.unwrap();

        let record: ContextRecord = serde_json::from_value(result.payload.as_document().unwrap().clone()).unwrap();
        assert_eq!(record.context, NO_CONTEXT_MARKER);
        assert!(!record.context.contains("neoplasia"));
    }

    #[tokio::test]
    async fn own_documents_are_returned_with_expanded_query() {
        let worker = ContextWorker::new(Arc::new(StubSemanticIndex::new(carlos_docs())));
        let result = worker.invoke(&ctx(), WorkerInput::default(), &params("Carlos_Perez")).await.unwrap();

        let record: ContextRecord = serde_json::from_value(result.payload.as_document().unwrap().clone()).unwrap();
        assert!(record.has_context());
        assert!(record.context.contains("cefaleas"));
        assert!(record.query.contains("antecedentes clínicos"), "la consulta va expandida");
    }

    #[test]
    fn isolation_guard_fails_closed() {
        let docs = vec![IndexedDocument { owner_identifier: "carlos_perez".into(), content: "x".into() }];
        assert!(verify_patient_sources(&docs, "ana_lopez").is_err());
        assert!(verify_patient_sources(&docs, "carlos_perez").is_ok());
    }
}
