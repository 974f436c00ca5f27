// neuro-domain library entry point
pub mod classification;
pub mod context;
pub mod error;
pub mod patient;
pub mod report;
pub mod segmentation;
pub mod triage;
pub mod validation;

pub use classification::{ClassProbabilities, ClassificationOutcome, ClassificationReport, ScanClassification, TumorPrediction, NO_IMAGES_FOUND};
pub use context::{ContextRecord, NO_CONTEXT_MARKER};
pub use error::DomainError;
pub use patient::{ScanInventory, ScanPair, NO_COMPLETE_PAIRS};
pub use report::{format_probability, MasterReport, ReportScan, NOT_AVAILABLE};
pub use segmentation::{ScanSegmentation, SegmentationOutcome, SegmentationReport};
pub use triage::{RiskLevel, TriageAssessment, INSUFFICIENT_INFO};
pub use validation::{ValidationOutcome, ValidationPhase, ValidationVerdict};
