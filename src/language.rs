// Supported dictation languages
//
// Recognition is limited to English plus nine Indian languages. Synthesis voices
// are not restricted to this list (see synthesis::voice).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SpeechError;

/// A BCP-47 tag from the fixed set of dictation languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    #[default]
    EnglishUs,
    Hindi,
    Bengali,
    Telugu,
    Tamil,
    Gujarati,
    Kannada,
    Malayalam,
    Marathi,
    Punjabi,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::EnglishUs,
        Language::Hindi,
        Language::Bengali,
        Language::Telugu,
        Language::Tamil,
        Language::Gujarati,
        Language::Kannada,
        Language::Malayalam,
        Language::Marathi,
        Language::Punjabi,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Language::EnglishUs => "en-US",
            Language::Hindi => "hi-IN",
            Language::Bengali => "bn-IN",
            Language::Telugu => "te-IN",
            Language::Tamil => "ta-IN",
            Language::Gujarati => "gu-IN",
            Language::Kannada => "kn-IN",
            Language::Malayalam => "ml-IN",
            Language::Marathi => "mr-IN",
            Language::Punjabi => "pa-IN",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::EnglishUs => "English (US)",
            Language::Hindi => "Hindi (India)",
            Language::Bengali => "Bengali (India)",
            Language::Telugu => "Telugu (India)",
            Language::Tamil => "Tamil (India)",
            Language::Gujarati => "Gujarati (India)",
            Language::Kannada => "Kannada (India)",
            Language::Malayalam => "Malayalam (India)",
            Language::Marathi => "Marathi (India)",
            Language::Punjabi => "Punjabi (India)",
        }
    }
}

impl FromStr for Language {
    type Err = SpeechError;

    // Tags are matched exactly, the allow-list is the contract
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.tag() == tag)
            .ok_or_else(|| SpeechError::InvalidLanguage(tag.to_string()))
    }
}

impl TryFrom<String> for Language {
    type Error = SpeechError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.tag().to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tags_parse_back() {
        for language in Language::ALL {
            assert_eq!(language.tag().parse::<Language>().unwrap(), language);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert_eq!(
            "xx-XX".parse::<Language>(),
            Err(SpeechError::InvalidLanguage("xx-XX".to_string()))
        );
        assert!("hi-in".parse::<Language>().is_err(), "Tags are case-sensitive");
        assert!("en".parse::<Language>().is_err());
    }

    #[test]
    fn test_default_is_english() {
        assert_eq!(Language::default(), Language::EnglishUs);
        assert_eq!(Language::default().display_name(), "English (US)");
    }

    #[test]
    fn test_serde_uses_tag() {
        let json = serde_json::to_string(&Language::Tamil).unwrap();
        assert_eq!(json, "\"ta-IN\"");
        let parsed: Language = serde_json::from_str("\"pa-IN\"").unwrap();
        assert_eq!(parsed, Language::Punjabi);
        assert!(serde_json::from_str::<Language>("\"fr-FR\"").is_err());
    }
}
