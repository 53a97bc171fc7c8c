//! The translation fetcher: turns Italian source words into their
//! acceptable English translations via an HTTP vendor, normalising the
//! result to lowercase `[a-z ]` only.

use crate::error::TranslatorError;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Translator {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: MyMemoryMatch,
}

#[derive(Deserialize)]
struct MyMemoryMatch {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl Translator {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("translator HTTP client config is always valid");
        Self { client, base_url }
    }

    /// Fetches a single acceptable translation for `word` (Italian ->
    /// English), normalised to lowercase letters and spaces only.
    pub async fn translate(&self, word: &str) -> Result<Vec<String>, TranslatorError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", word), ("langpair", "it|en")])
            .send()
            .await?
            .error_for_status()?
            .json::<MyMemoryResponse>()
            .await?;

        let normalized = normalize(&response.response_data.translated_text);
        if normalized.is_empty() {
            return Err(TranslatorError::UnexpectedResponse);
        }

        Ok(vec![normalized])
    }
}

/// Lowercases and strips everything but ASCII letters and spaces.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || *c == ' ')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_digits() {
        assert_eq!(normalize("House, 1st!"), "house st");
    }

    #[test]
    fn normalize_lowercases() {
        assert_eq!(normalize("DOG"), "dog");
    }
}
