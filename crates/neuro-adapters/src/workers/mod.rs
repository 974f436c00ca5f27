//! Workers del caso clínico: el conjunto cerrado de capacidades que el
//! plan puede referenciar.

pub mod classifier;
pub mod lister;
pub mod rag;
pub mod report;
pub mod segmenter;
pub mod triage;
pub mod validator;

use std::sync::Arc;

use neuro_core::WorkerRegistry;

use crate::collaborators::{InferenceService, ReportRenderer, SemanticIndex};

pub use classifier::ClassificationWorker;
pub use lister::ListerWorker;
pub use rag::ContextWorker;
pub use report::ReportComposerWorker;
pub use segmenter::SegmentationWorker;
pub use triage::TriageWorker;
pub use validator::ReportValidatorWorker;

/// Registro con los siete workers del caso, cableados a los colaboradores
/// externos dados.
pub fn default_registry(inference: Arc<dyn InferenceService>,
                        index: Arc<dyn SemanticIndex>,
                        renderer: Arc<dyn ReportRenderer>)
                        -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    registry.register(Arc::new(ListerWorker::new()));
    registry.register(Arc::new(ClassificationWorker::new(inference.clone())));
    registry.register(Arc::new(SegmentationWorker::new(inference)));
    registry.register(Arc::new(ContextWorker::new(index)));
    registry.register(Arc::new(TriageWorker));
    registry.register(Arc::new(ReportComposerWorker::new(renderer.clone())));
    registry.register(Arc::new(ReportValidatorWorker::new(renderer)));
    registry
}
