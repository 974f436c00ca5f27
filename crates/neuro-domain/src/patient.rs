//! Caso de paciente: pares de escaneo FLAIR/T1-CE.
//!
//! Un escaneo sólo es utilizable si el par está completo (ambas modalidades
//! presentes). El inventario es el artifact inicial del que dependen
//! clasificación y segmentación; sus `scan_id` deben ser únicos.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Mensaje emitido cuando el listado no encuentra ningún par completo.
pub const NO_COMPLETE_PAIRS: &str = "No se encontraron pares de imágenes (flair/t1ce) completos.";

/// Par de modalidades co-registradas de una misma adquisición.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPair {
    pub scan_id: String,
    pub flair_path: String,
    pub t1ce_path: String,
}

impl ScanPair {
    /// Completo = ambas rutas presentes. Un par incompleto nunca entra al
    /// inventario.
    pub fn is_complete(&self) -> bool {
        !self.flair_path.is_empty() && !self.t1ce_path.is_empty()
    }
}

/// Inventario de escaneos de un paciente (artifact del lister).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanInventory {
    pub patient_identifier: String,
    pub scans: Vec<ScanPair>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ScanInventory {
    /// Construye un inventario validado: sólo pares completos y `scan_id`
    /// únicos.
    pub fn new(patient_identifier: String, scans: Vec<ScanPair>) -> Result<Self, DomainError> {
        for (i, s) in scans.iter().enumerate() {
            if !s.is_complete() {
                return Err(DomainError::ValidationError(format!("scan '{}' con par incompleto", s.scan_id)));
            }
            if scans[..i].iter().any(|p| p.scan_id == s.scan_id) {
                return Err(DomainError::ValidationError(format!("scan_id duplicado: '{}'", s.scan_id)));
            }
        }
        Ok(Self { patient_identifier, scans, error: None })
    }

    /// Inventario vacío con el mensaje estándar de "sin pares completos".
    pub fn empty(patient_identifier: String) -> Self {
        Self { patient_identifier,
               scans: Vec::new(),
               error: Some(NO_COMPLETE_PAIRS.to_string()) }
    }

    pub fn has_scans(&self) -> bool {
        !self.scans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(id: &str) -> ScanPair {
        ScanPair { scan_id: id.to_string(),
                   flair_path: format!("data/pictures/{id}_flair.nii"),
                   t1ce_path: format!("data/pictures/{id}_t1ce.nii") }
    }

    #[test]
    fn inventory_rejects_duplicate_scan_ids() {
        let res = ScanInventory::new("carlos_perez".into(), vec![pair("carlos_perez_1"), pair("carlos_perez_1")]);
        assert!(res.is_err());
    }

    #[test]
    fn inventory_rejects_incomplete_pair() {
        let mut p = pair("carlos_perez_1");
        p.t1ce_path.clear();
        assert!(ScanInventory::new("carlos_perez".into(), vec![p]).is_err());
    }

    #[test]
    fn empty_inventory_carries_standard_message() {
        let inv = ScanInventory::empty("ana_lopez".into());
        assert!(!inv.has_scans());
        assert_eq!(inv.error.as_deref(), Some(NO_COMPLETE_PAIRS));
    }
}
