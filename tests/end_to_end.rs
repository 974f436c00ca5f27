//! Caso completo de extremo a extremo sobre colaboradores stub: plan por
//! defecto, siete tareas, informe validado.

use std::fs::File;
use std::sync::Arc;

use neuro_adapters::{default_registry, IndexedDocument, ReportRenderer, StubInferenceService, StubRenderer,
                     StubSemanticIndex};
use neuro_core::{default_case_plan, parse_at, ArtifactStore, EngineConfig, Executor, InMemoryArtifactStore,
                 InMemoryEventStore, RunResult, TaskStatus};
use neuro_domain::NOT_AVAILABLE;

fn fixed_now() -> chrono::DateTime<chrono::Utc> {
    use chrono::TimeZone;
    chrono::Utc.with_ymd_and_hms(2024, 5, 17, 10, 30, 0).unwrap()
}

struct Harness {
    store: Arc<InMemoryArtifactStore>,
    renderer: Arc<StubRenderer>,
    run: RunResult,
}

/// Ejecuta el plan por defecto para `carlos_perez` con dos pares de
/// escaneo en disco y los colaboradores stub dados.
async fn run_case(inference: StubInferenceService, documents: Vec<IndexedDocument>) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    for scan in ["carlos_perez_1", "carlos_perez_2"] {
        for suffix in ["flair", "t1ce"] {
            File::create(tmp.path().join(format!("{scan}_{suffix}.nii"))).unwrap();
        }
    }

    let config = EngineConfig { images_dir: tmp.path().display().to_string(),
                                ..EngineConfig::default() };
    let renderer = Arc::new(StubRenderer::new());
    let registry = default_registry(Arc::new(inference), Arc::new(StubSemanticIndex::new(documents)), renderer.clone());
    let store = Arc::new(InMemoryArtifactStore::new());
    let mut executor = Executor::new(registry, store.clone(), InMemoryEventStore::new(), config);

    let parsed = parse_at(&default_case_plan("carlos_perez"), fixed_now()).unwrap();
    let run = executor.execute(&parsed).await;
    Harness { store, renderer, run }
}

fn carlos_history() -> Vec<IndexedDocument> {
    vec![IndexedDocument { owner_identifier: "carlos_perez".into(),
                           content: "Paciente con historial de cefaleas y antecedentes de neoplasia cerebral.".into() }]
}

#[tokio::test]
async fn full_case_produces_a_validated_deliverable() {
    let mut inference = StubInferenceService::with_default_score(0.91);
    inference.volumes.insert("carlos_perez_1".into(), 17.3);
    let h = run_case(inference, carlos_history()).await;

    assert!(h.run.error.is_none());
    assert!(h.run.infeasible.is_none());
    let final_ref = h.run.final_output_ref.as_deref().expect("entregable final");
    assert_eq!(final_ref, "data/reportes/carlos_perez_informe_20240517_103000.pdf");

    // Las siete tareas terminaron en Success.
    assert_eq!(h.run.results.len(), 7);
    assert!(h.run.results.values().all(|r| r.status == TaskStatus::Success));

    // El informe maestro quedó persistido y con el riesgo del triaje.
    let report = h.store.get("report.json").unwrap().payload;
    assert_eq!(report["paciente_id"], "carlos_perez");
    assert_eq!(report["riesgo"], "alto");
    assert_eq!(report["scans"].as_array().unwrap().len(), 2);
    assert_eq!(report["resumen_historial"].as_str().unwrap().contains("cefaleas"), true);

    // El validador aprobó ambas fases.
    let validated = h.store.get("report_validated.json").unwrap().payload;
    let verdicts = validated["validaciones"].as_array().unwrap();
    assert!(verdicts.iter().all(|v| v["outcome"] == "Approved"));

    // El entregable contiene los valores cruciales.
    let text = h.renderer.extract_text(final_ref).await.unwrap();
    assert!(text.contains("carlos_perez"));
    assert!(text.contains("alto"));
    assert!(text.contains("91.0%"));
}

#[tokio::test]
async fn low_probability_case_skips_segmentation_but_still_reports() {
    let h = run_case(StubInferenceService::with_default_score(0.55), carlos_history()).await;

    assert!(h.run.error.is_none());
    assert!(h.run.results["4"].payload.is_skipped(), "segmentación saltada bajo el umbral");
    assert!(h.run.final_output_ref.is_some(), "el caso sigue entregando informe");

    let report = h.store.get("report.json").unwrap().payload;
    assert_eq!(report["mask_file"], NOT_AVAILABLE, "sin segmentación no hay máscara");
    assert_eq!(report["riesgo"], "bajo");
}

#[tokio::test]
async fn per_scan_failures_do_not_abort_the_case() {
    let mut inference = StubInferenceService::with_default_score(0.91);
    inference.failing.push("carlos_perez_2".into());
    let h = run_case(inference, carlos_history()).await;

    assert!(h.run.error.is_none());
    assert_eq!(h.run.results["3"].status, TaskStatus::Success, "el fallo por escaneo no tumba la tarea");

    let classification = h.store.get("classification.json").unwrap().payload;
    let entries = classification["classifications"].as_array().unwrap();
    assert_eq!(entries.len(), 2, "una entrada por escaneo, con o sin error");
    assert!(entries[1]["result"]["error"].is_string());

    // El escaneo fallido sigue presente en la unión del informe.
    let report = h.store.get("report.json").unwrap().payload;
    assert_eq!(report["scans"].as_array().unwrap().len(), 2);
    assert!(report["scans"][1]["p_tumor"].is_null());
}

#[tokio::test]
async fn foreign_patient_documents_yield_not_found_context() {
    let foreign = vec![IndexedDocument { owner_identifier: "ana_lopez".into(),
                                         content: "Paciente con historial de migrañas.".into() }];
    let h = run_case(StubInferenceService::with_default_score(0.91), foreign).await;

    assert!(h.run.error.is_none());
    let rag = h.store.get("rag.json").unwrap().payload;
    assert_eq!(rag["patient_identifier"], "carlos_perez");
    assert!(rag["context"].as_str().unwrap().starts_with("No se encontró información relevante"));

    let report = h.store.get("report.json").unwrap().payload;
    assert_eq!(report["resumen_historial"], NOT_AVAILABLE);
}
