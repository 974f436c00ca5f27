//! Demo de extremo a extremo: ejecuta el caso completo de un paciente con
//! colaboradores stub deterministas e imprime el entregable validado o el
//! primer error irrecuperable.
//!
//! Uso: `main-core [identificador_paciente] [--plan <fichero>]`

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use neuro_adapters::{default_registry, IndexedDocument, ReportRenderer, StubInferenceService, StubRenderer,
                     StubSemanticIndex};
use neuro_core::{default_case_plan, parse, EngineConfig, Executor, InMemoryArtifactStore, InMemoryEventStore};

/// Deja un par FLAIR/T1-CE de muestra si el directorio de imágenes no
/// existe todavía, para que la demo corra sin datos reales.
fn ensure_sample_images(images_dir: &str, patient: &str) {
    let dir = Path::new(images_dir);
    if dir.exists() {
        return;
    }
    if fs::create_dir_all(dir).is_err() {
        return;
    }
    for suffix in ["flair", "t1ce"] {
        let _ = fs::write(dir.join(format!("{patient}_1_{suffix}.nii")), b"");
    }
    eprintln!("[neuro] directorio de imágenes creado con un par de muestra: {images_dir}");
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                             .init();

    let args: Vec<String> = std::env::args().collect();
    let mut patient = "carlos_perez".to_string();
    let mut plan_file: Option<String> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--plan" => {
                i += 1;
                if i < args.len() {
                    plan_file = Some(args[i].clone());
                }
            }
            other => patient = other.to_lowercase(),
        }
        i += 1;
    }

    let config = EngineConfig::from_env();
    ensure_sample_images(&config.images_dir, &patient);

    // Colaboradores stub: puntuación alta fija y un historial mínimo del
    // propio paciente.
    let mut inference = StubInferenceService::with_default_score(0.91);
    inference.volumes.insert(format!("{patient}_1"), 17.3);
    inference.zones.insert(format!("{patient}_1"), "región frontal".to_string());
    let index = StubSemanticIndex::new(vec![IndexedDocument { owner_identifier: patient.clone(),
                                                              content: format!("Paciente {patient} con historial de cefaleas recurrentes y antecedentes familiares de neoplasia.") }]);
    let renderer: Arc<StubRenderer> = Arc::new(StubRenderer::new());

    let registry = default_registry(Arc::new(inference), Arc::new(index), renderer.clone());
    let store = Arc::new(InMemoryArtifactStore::new());
    let mut executor = Executor::new(registry, store, InMemoryEventStore::new(), config);

    let plan_text = match &plan_file {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("[neuro] no se pudo leer el plan '{path}': {e}");
                std::process::exit(2);
            }
        },
        None => default_case_plan(&patient),
    };

    let parsed = match parse(&plan_text) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("[neuro] plan inválido: {e}");
            std::process::exit(2);
        }
    };

    let run = executor.execute(&parsed).await;

    if let Some(reason) = &run.infeasible {
        println!("El planificador declaró la petición inviable: {reason}");
        return;
    }
    if let Some(error) = &run.error {
        eprintln!("[neuro] run {} abortado: {error}", run.run_id);
        std::process::exit(1);
    }
    match &run.final_output_ref {
        Some(reference) => match renderer.extract_text(reference).await {
            Ok(text) => {
                println!("{text}");
                println!("--- entregable validado: {reference} (run {})", run.run_id);
            }
            Err(_) => println!("Entregable validado: {reference} (run {})", run.run_id),
        },
        None => {
            // Primer fallo de tarea como mensaje único para el usuario.
            let detail = run.results
                            .values()
                            .find(|r| r.is_error())
                            .and_then(|r| r.error_detail.clone())
                            .unwrap_or_else(|| "el run no produjo entregable".to_string());
            eprintln!("[neuro] caso sin entregable: {detail}");
            std::process::exit(1);
        }
    }
}
