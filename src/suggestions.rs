//! Quick-reply suggestions derived from the last user utterance.

/// Keyword table, checked in order. The first keyword contained in the
/// lower-cased text wins.
pub const SUGGESTION_TABLE: &[(&str, &[&str])] = &[
    ("boleto", &["Ver boleto", "Gerar nova via"]),
    ("curso", &["Lista de cursos", "Modalidades"]),
    ("matrícula", &["Ver status", "Atualizar dados"]),
];

/// Returned when no keyword matches.
pub const DEFAULT_SUGGESTIONS: &[&str] = &["Falar com atendente", "Ajuda com login", "Mais informações"];

/// Shown before the first round-trip.
pub const INITIAL_SUGGESTIONS: &[&str] = &[
    "Segunda via do boleto",
    "Acompanhar minha matrícula",
    "Problemas com login",
    "Mais informações sobre cursos",
];

pub fn suggest(last_user_text: &str) -> Vec<String> {
    let text = last_user_text.to_lowercase();
    let picked = SUGGESTION_TABLE
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, replies)| *replies)
        .unwrap_or(DEFAULT_SUGGESTIONS);
    to_owned(picked)
}

pub fn initial() -> Vec<String> {
    to_owned(INITIAL_SUGGESTIONS)
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
