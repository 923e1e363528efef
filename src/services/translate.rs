use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AppError, Result};

// Unicode blocks covering Persian and Arabic-script text.
const PERSIAN_RANGES: [(u32, u32); 5] = [
    (0x0600, 0x06FF),
    (0x0750, 0x077F),
    (0x08A0, 0x08FF),
    (0xFB50, 0xFDFF),
    (0xFE70, 0xFEFF),
];

pub fn contains_persian(text: &str) -> bool {
    text.chars().any(|c| {
        let cp = c as u32;
        PERSIAN_RANGES.iter().any(|&(lo, hi)| cp >= lo && cp <= hi)
    })
}

/// `fa` for Persian-script text, `en` otherwise. Empty text counts as `en`.
pub fn detect_language(text: &str) -> &'static str {
    if contains_persian(text.trim()) {
        "fa"
    } else {
        "en"
    }
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;
}

/// Client for the MyMemory translation API.
pub struct MyMemoryTranslator {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: MyMemoryData,
}

#[derive(Debug, Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

impl MyMemoryTranslator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() || source == target {
            return Ok(text.to_string());
        }

        let langpair = format!("{source}|{target}");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", trimmed), ("langpair", langpair.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Translation(format!(
                "service answered with status {status}"
            )));
        }

        let body: MyMemoryResponse = response.json().await?;
        body.response_data
            .translated_text
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Translation("response had no text".to_string()))
    }
}

/// Translator that passes text through untouched, for when translation is
/// disabled.
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub original: String,
    pub text: String,
    pub was_translated: bool,
    pub language: &'static str,
}

impl TranslationOutcome {
    fn unchanged(text: &str, language: &'static str) -> Self {
        Self {
            original: text.to_string(),
            text: text.to_string(),
            was_translated: false,
            language,
        }
    }
}

/// Translate Persian prompts to English before generation. Best effort: any
/// detection or translation failure leaves the prompt untouched.
pub async fn smart_translate(translator: &dyn Translator, prompt: &str) -> TranslationOutcome {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return TranslationOutcome::unchanged(prompt, "en");
    }

    let language = detect_language(trimmed);
    if language != "fa" {
        return TranslationOutcome::unchanged(prompt, language);
    }

    match translator.translate(trimmed, "fa", "en").await {
        Ok(translated) => TranslationOutcome {
            original: prompt.to_string(),
            text: translated,
            was_translated: true,
            language,
        },
        Err(err) => {
            tracing::warn!(error = %err, "translation failed, keeping the original prompt");
            TranslationOutcome::unchanged(prompt, language)
        }
    }
}
