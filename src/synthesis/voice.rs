use super::backend::Voice;

/// Primary language subtag of a BCP-47 tag, lowercased (`en` for `en-US`)
pub fn primary_subtag(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Pick the voice to use for a language
///
/// Voices sharing the primary subtag win, local ones first. Without a match
/// the first voice of any language is used.
pub fn select_best_voice(voices: &[Voice], tag: &str) -> Option<Voice> {
    let wanted = primary_subtag(tag);
    let matching: Vec<&Voice> = voices
        .iter()
        .filter(|voice| primary_subtag(&voice.lang) == wanted)
        .collect();

    matching
        .iter()
        .find(|voice| voice.local_service)
        .or_else(|| matching.first())
        .map(|voice| (*voice).clone())
        .or_else(|| voices.first().cloned())
}
