use crate::document::Language;

/// Notice attached to every diagnosis and interaction report
pub fn disclaimer(language: Language) -> &'static str {
    match language {
        Language::Es => {
            "Esta información es un apoyo heurístico a la decisión y no sustituye el \
             consejo, diagnóstico ni tratamiento de un profesional sanitario."
        }
        _ => {
            "This information is heuristic decision support and is not a substitute for \
             professional medical advice, diagnosis or treatment."
        }
    }
}
