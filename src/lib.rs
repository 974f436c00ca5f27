//! NeuroFlow: orquestación determinista de casos de imagen clínica.
//!
//! Este crate actúa como fachada del workspace:
//! - `neuro_core`: motor de planes (parser, store de artifacts, ejecutor).
//! - `neuro_domain`: modelo tipado de los artifacts del caso.
//! - `neuro_adapters`: workers concretos y fronteras con colaboradores.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub use neuro_adapters as adapters;
pub use neuro_core as core;
pub use neuro_domain as domain;
