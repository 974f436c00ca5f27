//! Descubrimiento de imágenes de un paciente.
//!
//! Las imágenes viven en un directorio plano, sin subcarpetas por
//! paciente; los ficheros se emparejan por identificador base
//! (`<base>_flair.nii` + `<base>_t1ce.nii`) y sólo los pares completos
//! entran al inventario.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use indexmap::IndexMap;

use neuro_core::{EngineError, RunContext, TaskResult, Worker, WorkerInput, WorkerKind};
use neuro_domain::{ScanInventory, ScanPair};

const FLAIR_SUFFIX: &str = "_flair.nii";
const T1CE_SUFFIX: &str = "_t1ce.nii";

pub struct ListerWorker {
    /// Directorio explícito; si es `None` se usa el configurado en el run.
    images_dir: Option<PathBuf>,
}

impl ListerWorker {
    pub fn new() -> Self {
        Self { images_dir: None }
    }

    pub fn with_dir(images_dir: impl Into<PathBuf>) -> Self {
        Self { images_dir: Some(images_dir.into()) }
    }
}

impl Default for ListerWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for ListerWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::ImageLister
    }

    async fn invoke(&self,
                    ctx: &RunContext,
                    input: WorkerInput,
                    params: &IndexMap<String, String>)
                    -> Result<TaskResult, EngineError> {
        let Some(raw_patient) = input.literal.clone().or_else(|| params.get("patient_id").cloned()) else {
            return Ok(TaskResult::error("", "identificador de paciente ausente"));
        };
        let patient = raw_patient.trim().to_lowercase();

        let dir = self.images_dir
                      .clone()
                      .unwrap_or_else(|| PathBuf::from(&ctx.config.images_dir));
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => {
                return Ok(TaskResult::error("", format!("Directory '{}' not found", dir.display())));
            }
        };

        // base → (flair, t1ce); BTreeMap para un orden estable del inventario.
        let mut pairs: BTreeMap<String, (Option<String>, Option<String>)> = BTreeMap::new();
        for entry in entries.flatten() {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let file = entry.file_name().to_string_lossy().to_lowercase();
            if !file.starts_with(&patient) {
                continue;
            }
            let path = format!("{}/{}", dir.display(), file);
            if let Some(base) = file.strip_suffix(FLAIR_SUFFIX) {
                pairs.entry(base.to_string()).or_default().0 = Some(path);
            } else if let Some(base) = file.strip_suffix(T1CE_SUFFIX) {
                pairs.entry(base.to_string()).or_default().1 = Some(path);
            }
        }

        let scans: Vec<ScanPair> = pairs.into_iter()
                                        .filter_map(|(base, (flair, t1ce))| match (flair, t1ce) {
                                            (Some(flair_path), Some(t1ce_path)) => Some(ScanPair { scan_id: base,
                                                                                                   flair_path,
                                                                                                   t1ce_path }),
                                            _ => None, // par incompleto: fuera del inventario
                                        })
                                        .collect();

        let inventory = if scans.is_empty() {
            ScanInventory::empty(patient)
        } else {
            match ScanInventory::new(patient, scans) {
                Ok(inv) => inv,
                Err(e) => return Ok(TaskResult::error("", e.to_string())),
            }
        };

        tracing::info!(run_id = %ctx.run_id, patient = %inventory.patient_identifier,
                       scans = inventory.scans.len(), "inventario de escaneos generado");
        let doc = serde_json::to_value(&inventory).map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(TaskResult::success("", doc))
    }
}
