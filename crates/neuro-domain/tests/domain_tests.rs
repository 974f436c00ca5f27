//! Ida y vuelta de los artifacts del caso por su forma de alambre.

use neuro_domain::{ClassificationReport, ContextRecord, MasterReport, ScanInventory, TriageAssessment,
                   NO_CONTEXT_MARKER, NOT_AVAILABLE};
use serde_json::json;

#[test]
fn lister_artifact_roundtrip() {
    let raw = json!({
        "patient_identifier": "carlos_perez",
        "scans": [
            {"scan_id": "carlos_perez_1",
             "flair_path": "data/pictures/carlos_perez_1_flair.nii",
             "t1ce_path": "data/pictures/carlos_perez_1_t1ce.nii"}
        ]
    });
    let inv: ScanInventory = serde_json::from_value(raw.clone()).unwrap();
    assert!(inv.has_scans());
    assert_eq!(serde_json::to_value(&inv).unwrap(), raw);
}

#[test]
fn classification_artifact_accepts_mixed_entries() {
    let raw = json!({
        "patient_identifier": "carlos_perez",
        "classifications": [
            {"scan_id": "carlos_perez_1",
             "result": {"prediction": "tumor", "probabilities": {"tumor": 0.918, "no_tumor": 0.082}}},
            {"scan_id": "carlos_perez_2", "result": {"error": "detalle del fallo"}}
        ]
    });
    let report: ClassificationReport = serde_json::from_value(raw).unwrap();
    assert_eq!(report.max_tumor_probability(), Some(0.918));
    assert_eq!(report.tumor_probability_for("carlos_perez_2"), None);
}

#[test]
fn triage_wire_uses_accented_key() {
    let raw = json!({"riesgo": "medio", "justificación_triaje": "hallazgos que requieren seguimiento"});
    let triage: TriageAssessment = serde_json::from_value(raw).unwrap();
    assert_eq!(triage.risk.to_string(), "medio");
}

#[test]
fn context_not_found_marker_is_detectable() {
    let record = ContextRecord::not_found("ana_lopez".into(), "historial".into());
    assert!(!record.has_context());
    assert_eq!(record.context, NO_CONTEXT_MARKER);
}

#[test]
fn master_report_roundtrips_with_sentinels() {
    let report = MasterReport::unavailable("carlos_perez".into());
    let raw = serde_json::to_value(&report).unwrap();
    assert_eq!(raw["nombre"], NOT_AVAILABLE);
    let back: MasterReport = serde_json::from_value(raw).unwrap();
    assert_eq!(back, report);
}
