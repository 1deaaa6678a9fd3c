//! Per-language word lists used by the normalizer.

use knowledge::Language;

pub fn stop_words(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => &[
            "a", "an", "the", "and", "or", "of", "in", "on", "at", "to", "for", "with", "is",
            "are", "was", "were", "be", "been", "my", "i", "have", "has", "had", "it", "its",
            "this", "that", "what", "which", "from", "by", "as", "about", "me", "do", "does",
            "some", "very", "feel", "feeling",
        ],
        Language::Es => &[
            "el", "la", "los", "las", "un", "una", "unos", "unas", "y", "o", "de", "del", "en",
            "con", "por", "para", "que", "mi", "me", "tengo", "es", "al", "se", "muy", "siento",
        ],
        Language::Fr => &[
            "le", "la", "les", "un", "une", "et", "ou", "de", "du", "des", "en", "avec", "pour",
            "que", "mon", "ma", "mes", "j", "ai", "est", "au", "aux", "tres",
        ],
        Language::Unknown => &[],
    }
}

/// Phrase (diacritics folded) to canonical English term
pub fn synonyms(language: Language) -> &'static [(&'static str, &'static str)] {
    match language {
        Language::En => &[
            ("tylenol", "acetaminophen"),
            ("paracetamol", "acetaminophen"),
            ("advil", "ibuprofen"),
            ("motrin", "ibuprofen"),
            ("coumadin", "warfarin"),
            ("high blood pressure", "hypertension"),
            ("heart attack", "myocardial infarction"),
            ("flu", "influenza"),
            ("stomach ache", "abdominal pain"),
            ("stomachache", "abdominal pain"),
            ("tummy ache", "abdominal pain"),
            ("throwing up", "vomiting"),
            ("short of breath", "shortness of breath"),
            ("breathlessness", "shortness of breath"),
            ("pyrexia", "fever"),
            ("high temperature", "fever"),
            ("head ache", "headache"),
            ("cephalalgia", "headache"),
            ("tiredness", "fatigue"),
            ("sore muscles", "muscle aches"),
        ],
        Language::Es => &[
            ("fiebre", "fever"),
            ("dolor de cabeza", "headache"),
            ("cefalea", "headache"),
            ("tos", "cough"),
            ("dolor de pecho", "chest pain"),
            ("dolor toracico", "chest pain"),
            ("dificultad para respirar", "shortness of breath"),
            ("nauseas", "nausea"),
            ("vomitos", "vomiting"),
            ("diarrea", "diarrhea"),
            ("mareo", "dizziness"),
            ("gripe", "influenza"),
            ("dolor abdominal", "abdominal pain"),
            ("cansancio", "fatigue"),
            ("rigidez de nuca", "stiff neck"),
            ("aspirina", "aspirin"),
        ],
        Language::Fr => &[
            ("fievre", "fever"),
            ("mal de tete", "headache"),
            ("toux", "cough"),
            ("douleur thoracique", "chest pain"),
            ("essoufflement", "shortness of breath"),
            ("nausee", "nausea"),
            ("vomissements", "vomiting"),
            ("grippe", "influenza"),
            ("fatigue", "fatigue"),
            ("raideur de la nuque", "stiff neck"),
        ],
        Language::Unknown => &[],
    }
}

/// Fold Latin diacritics to ASCII ("fièvre" -> "fievre")
pub fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Light suffix stripping. Identical input always yields identical output.
pub fn stem(word: &str, language: Language) -> String {
    match language {
        Language::En => stem_english(word),
        Language::Es | Language::Fr => stem_romance(word, language),
        Language::Unknown => word.to_string(),
    }
}

fn stem_english(word: &str) -> String {
    let len = word.chars().count();
    if len <= 3 || !word.is_ascii() {
        return word.to_string();
    }

    for (suffix, replacement) in [
        ("ations", "ate"),
        ("ation", "ate"),
        ("ness", ""),
        ("ments", ""),
        ("ment", ""),
        ("ings", ""),
        ("ing", ""),
        ("edly", ""),
        ("ies", "y"),
        ("ied", "y"),
        ("ly", ""),
        ("ed", ""),
    ] {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.len() >= 3 {
                return format!("{}{}", stem, replacement);
            }
        }
    }

    for suffix in ["sses", "xes", "zes", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }

    // Keep -ss, -us, -is endings (stress, virus, meningitis)
    if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && !word.ends_with("is") {
        return word[..word.len() - 1].to_string();
    }

    word.to_string()
}

fn stem_romance(word: &str, language: Language) -> String {
    let mut stem = word.to_string();
    if stem.chars().count() <= 3 || !stem.is_ascii() {
        return stem;
    }

    if stem.ends_with('s') || (language == Language::Fr && stem.ends_with('x')) {
        stem.pop();
    }
    if stem.len() > 3 && (stem.ends_with('a') || stem.ends_with('e') || stem.ends_with('o')) {
        stem.pop();
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_plurals() {
        assert_eq!(stem("headaches", Language::En), "headache");
        assert_eq!(stem("aches", Language::En), "ache");
        assert_eq!(stem("allergies", Language::En), "allergy");
        assert_eq!(stem("stress", Language::En), "stress");
        assert_eq!(stem("meningitis", Language::En), "meningitis");
        assert_eq!(stem("boxes", Language::En), "box");
    }

    #[test]
    fn test_romance_stems_agree_on_plurals() {
        assert_eq!(stem("fiebre", Language::Es), stem("fiebres", Language::Es));
        assert_eq!(stem("dolores", Language::Es), "dolor");
        assert_eq!(stem("dolor", Language::Es), "dolor");
    }

    #[test]
    fn test_fold() {
        let folded: String = "fièvre náuseas".chars().map(fold_char).collect();
        assert_eq!(folded, "fievre nauseas");
    }
}
