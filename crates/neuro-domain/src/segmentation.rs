//! Resultado de segmentación por escaneo.
//!
//! Cada escaneo segmentado con éxito referencia tres archivos generados
//! (rebanada de entrada, máscara y superposición) más la rebanada elegida;
//! un fallo se registra en línea con `error`, sin abortar a los hermanos.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentationOutcome {
    Segmented {
        slice: u32,
        input_slice: String,
        mask_file: String,
        overlay_file: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        volumen_cc: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        zona_afectada: Option<String>,
    },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSegmentation {
    pub scan_id: String,
    #[serde(flatten)]
    pub outcome: SegmentationOutcome,
}

/// Artifact agregado de segmentación de un paciente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub patient_identifier: String,
    pub segmentations: Vec<ScanSegmentation>,
}

impl SegmentationReport {
    /// Máscara generada para un escaneo concreto, si la segmentación tuvo
    /// éxito.
    pub fn mask_for(&self, scan_id: &str) -> Option<&str> {
        self.segmentations.iter().find(|s| s.scan_id == scan_id).and_then(|s| match &s.outcome {
                                                                      SegmentationOutcome::Segmented { mask_file, .. } => Some(mask_file.as_str()),
                                                                      SegmentationOutcome::Failed { .. } => None,
                                                                  })
    }

    /// Primera segmentación exitosa (para los campos singulares del informe).
    pub fn first_segmented(&self) -> Option<&ScanSegmentation> {
        self.segmentations.iter().find(|s| matches!(s.outcome, SegmentationOutcome::Segmented { .. }))
    }
}
