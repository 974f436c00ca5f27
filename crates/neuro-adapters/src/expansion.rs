//! Expansión de consultas clínicas: sinónimos y términos relacionados que
//! amplían la formulación antes de la búsqueda semántica, para que una
//! consulta pobre no deje datos relevantes fuera.

/// Tabla cerrada de expansiones (término → sinónimos clínicos).
const SYNONYMS: &[(&str, &[&str])] = &[
    ("tumor", &["masa", "lesión", "neoplasia"]),
    ("antecedentes", &["historial de trastornos cerebrales", "enfermedades del sistema nervioso central"]),
    ("historial", &["antecedentes clínicos", "historia médica"]),
    ("cefalea", &["dolor de cabeza", "migraña"]),
    ("convulsiones", &["crisis epilépticas", "episodios convulsivos"]),
];

/// Amplía la consulta con los sinónimos de cada término reconocido. La
/// consulta original siempre encabeza el resultado; la expansión es
/// determinista y conserva el orden de la tabla.
pub fn expand_query(query: &str) -> String {
    let lowered = query.to_lowercase();
    let mut parts: Vec<&str> = vec![query.trim()];
    for (term, synonyms) in SYNONYMS {
        if lowered.contains(term) {
            for s in synonyms.iter().copied() {
                if !parts.contains(&s) {
                    parts.push(s);
                }
            }
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_terms_are_expanded() {
        let out = expand_query("¿Tiene antecedentes neurológicos?");
        assert!(out.starts_with("¿Tiene antecedentes neurológicos?"));
        assert!(out.contains("historial de trastornos cerebrales"));
    }

    #[test]
    fn unknown_terms_pass_through_untouched() {
        assert_eq!(expand_query("consulta general"), "consulta general");
    }

    #[test]
    fn expansion_is_deterministic() {
        assert_eq!(expand_query("tumor"), expand_query("tumor"));
    }
}
