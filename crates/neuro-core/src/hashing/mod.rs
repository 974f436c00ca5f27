pub mod canonical_json;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use hash::hash_str;

use serde_json::Value;

/// Hash canónico de un valor JSON (identidad de artifacts).
pub fn hash_value(value: &Value) -> String {
    hash_str(&to_canonical_json(value))
}
