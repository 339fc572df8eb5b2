//! Language codes accepted by the Dialogflow agent.
//!
//! Config may spell them in any case (`EN`, `en`, `pt-br`); the wire form is the
//! BCP-47 tag Dialogflow expects (`en`, `pt-BR`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LanguageCode {
    #[default]
    En,
    De,
    Es,
    Fr,
    It,
    Ja,
    Ko,
    Nl,
    Pl,
    Pt,
    PtBr,
    Ru,
    Tr,
    ZhCn,
}

const ALL: &[LanguageCode] = &[
    LanguageCode::En,
    LanguageCode::De,
    LanguageCode::Es,
    LanguageCode::Fr,
    LanguageCode::It,
    LanguageCode::Ja,
    LanguageCode::Ko,
    LanguageCode::Nl,
    LanguageCode::Pl,
    LanguageCode::Pt,
    LanguageCode::PtBr,
    LanguageCode::Ru,
    LanguageCode::Tr,
    LanguageCode::ZhCn,
];

impl LanguageCode {
    /// Tag sent as `queryInput.languageCode`.
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::De => "de",
            LanguageCode::Es => "es",
            LanguageCode::Fr => "fr",
            LanguageCode::It => "it",
            LanguageCode::Ja => "ja",
            LanguageCode::Ko => "ko",
            LanguageCode::Nl => "nl",
            LanguageCode::Pl => "pl",
            LanguageCode::Pt => "pt",
            LanguageCode::PtBr => "pt-BR",
            LanguageCode::Ru => "ru",
            LanguageCode::Tr => "tr",
            LanguageCode::ZhCn => "zh-CN",
        }
    }

    pub fn all() -> &'static [LanguageCode] {
        ALL
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported language code: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for LanguageCode {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "-");
        ALL.iter()
            .copied()
            .find(|code| code.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

impl Serialize for LanguageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
