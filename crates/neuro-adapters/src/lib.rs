//! neuro-adapters: workers concretos del caso clínico sobre el contrato
//! neutro del motor, más las fronteras con los colaboradores externos
//! (inferencia, búsqueda semántica, renderizado) y sus stubs deterministas.
pub mod collaborators;
pub mod expansion;
pub mod sources;
pub mod stubs;
pub mod workers;

pub use collaborators::{CollaboratorError, IndexedDocument, InferenceService, RenderedDocument, ReportRenderer,
                        SemanticIndex, SegmentationOutput, TumorScore};
pub use sources::SourceArtifacts;
pub use stubs::{StubInferenceService, StubRenderer, StubSemanticIndex};
pub use workers::{default_registry, ClassificationWorker, ContextWorker, ListerWorker, ReportComposerWorker,
                  ReportValidatorWorker, SegmentationWorker, TriageWorker};
