//! Configuración del motor desde variables de entorno.
//! Convención `NEURO_*`, con valores por defecto operativos.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Umbral de probabilidad de tumor que habilita la segmentación.
    /// Valor observado del comportamiento del sistema, no un contrato.
    pub segmentation_threshold: f64,
    /// Límite por invocación de worker antes de declarar timeout.
    pub worker_timeout_secs: u64,
    /// Reintentos adicionales tras un timeout (presupuesto acotado).
    pub worker_retries: u32,
    /// Directorio plano con las imágenes de pacientes.
    pub images_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { segmentation_threshold: 0.6,
               worker_timeout_secs: 60,
               worker_retries: 1,
               images_dir: "data/pictures".to_string() }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let base = Self::default();
        let segmentation_threshold = env::var("NEURO_SEGMENTATION_THRESHOLD").ok()
                                                                             .and_then(|v| v.parse().ok())
                                                                             .unwrap_or(base.segmentation_threshold);
        let worker_timeout_secs = env::var("NEURO_WORKER_TIMEOUT_SECS").ok()
                                                                       .and_then(|v| v.parse().ok())
                                                                       .unwrap_or(base.worker_timeout_secs);
        let worker_retries = env::var("NEURO_WORKER_RETRIES").ok()
                                                             .and_then(|v| v.parse().ok())
                                                             .unwrap_or(base.worker_retries);
        let images_dir = env::var("NEURO_IMAGES_DIR").unwrap_or(base.images_dir);
        Self { segmentation_threshold,
               worker_timeout_secs,
               worker_retries,
               images_dir }
    }
}
