//! Output languages the rewriter may be asked to write in.

use std::fmt;
use std::str::FromStr;

use crate::error::RewriteError;

/// Supported output languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    Korean,
    Japanese,
    Chinese,
    Spanish,
    French,
    German,
    Portuguese,
    Russian,
    Italian,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::English,
        Language::Korean,
        Language::Japanese,
        Language::Chinese,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Portuguese,
        Language::Russian,
        Language::Italian,
    ];

    /// ISO 639-1 code accepted on input.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Korean => "ko",
            Language::Japanese => "ja",
            Language::Chinese => "zh",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::Portuguese => "pt",
            Language::Russian => "ru",
            Language::Italian => "it",
        }
    }

    /// English name, as written into the prompt.
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Korean => "Korean",
            Language::Japanese => "Japanese",
            Language::Chinese => "Chinese",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Portuguese => "Portuguese",
            Language::Russian => "Russian",
            Language::Italian => "Italian",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = RewriteError;

    /// Codes are matched after trimming and lower-casing; anything outside
    /// the closed set fails instead of falling back to English.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.code() == code)
            .ok_or_else(|| RewriteError::UnsupportedLanguage(s.to_string()))
    }
}
