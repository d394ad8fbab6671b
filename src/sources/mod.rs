mod assets;
mod ica;
mod mathem;

pub use assets::AssetStore;
pub use ica::Ica;
pub use mathem::Mathem;

use crate::config::SourcesConfig;
use crate::error::{ImportError, Result};
use crate::model::Recipe;
use crate::progress::ProgressSink;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A recipe site that can be turned into a Mealie recipe
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Get the source name (e.g., "ica", "mathem")
    fn source_name(&self) -> &'static str;

    /// The detail endpoint the recipe will be fetched from
    fn url(&self) -> &str;

    /// Fetch the recipe and map it onto the Mealie model
    async fn load(&self) -> Result<Recipe>;
}

/// Everything an importer needs besides the recipe reference.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub client: Client,
    pub sink: ProgressSink,
    pub assets: AssetStore,
    pub endpoints: SourcesConfig,
}

/// The supported recipe sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Ica,
    Mathem,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Ica, Source::Mathem];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ica => "ica",
            Source::Mathem => "mathem",
        }
    }

    /// Builds the importer for `reference`; fails before any request is made
    /// if the reference has a shape this site does not accept.
    pub fn open(&self, reference: &str, context: SourceContext) -> Result<Box<dyn RecipeSource>> {
        match self {
            Source::Ica => Ok(Box::new(Ica::new(reference, context)?)),
            Source::Mathem => Ok(Box::new(Mathem::new(reference, context)?)),
        }
    }
}

impl FromStr for Source {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ImportError::UnknownSource(s.to_string()))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GET `url` and decode the JSON body, mapping error statuses to
/// [`ImportError::UpstreamFetch`].
async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ImportError::UpstreamFetch {
            url: url.to_string(),
            status,
        });
    }
    Ok(response.json().await?)
}

/// Strips a leading `"<n>. "` ordinal from a step.
fn strip_ordinal(step: &str) -> &str {
    let step = step.trim();
    let digits = step.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return step;
    }
    match step[digits..].strip_prefix('.') {
        Some(rest) => rest.trim_start(),
        None => step,
    }
}

/// Cleans up one instruction step. Returns `None` for empty steps and for
/// credit lines starting with one of `attribution_markers`.
pub fn normalize_step(step: &str, attribution_markers: &[&str]) -> Option<String> {
    let step = strip_ordinal(step);
    if step.is_empty()
        || attribution_markers
            .iter()
            .any(|marker| step.starts_with(marker))
    {
        return None;
    }
    Some(step.to_string())
}

/// Reads a number that may arrive as JSON number or as text with a decimal
/// comma. Anything else is treated as missing.
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Renders a scalar as display text (`4` and `"4"` both become `4`).
fn text_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Drops a trailing slash so URL shapes can be matched segment-wise.
fn trim_reference(reference: &str) -> &str {
    reference.trim().trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_str_is_case_insensitive() {
        assert_eq!("ica".parse::<Source>().unwrap(), Source::Ica);
        assert_eq!("ICA".parse::<Source>().unwrap(), Source::Ica);
        assert_eq!("Mathem".parse::<Source>().unwrap(), Source::Mathem);
    }

    #[test]
    fn test_unknown_source() {
        let err = "coop".parse::<Source>().unwrap_err();
        assert!(matches!(err, ImportError::UnknownSource(ref name) if name == "coop"));
        assert_eq!(err.to_string(), "coop does not exist as an importer yet");
    }

    #[test]
    fn test_strip_ordinal() {
        assert_eq!(strip_ordinal("1. Preheat oven"), "Preheat oven");
        assert_eq!(strip_ordinal("12.Whisk"), "Whisk");
        assert_eq!(strip_ordinal("Preheat oven"), "Preheat oven");
        // Quantities at the start of a step are not ordinals
        assert_eq!(strip_ordinal("2 dl milk in a bowl"), "2 dl milk in a bowl");
    }

    #[test]
    fn test_normalize_step_drops_attribution() {
        let markers = ["Recept:", "Foto:"];
        assert_eq!(
            normalize_step("3. Grädda i 10 min", &markers),
            Some("Grädda i 10 min".to_string())
        );
        assert_eq!(normalize_step("Foto: Anna Andersson", &markers), None);
        assert_eq!(normalize_step("4. Recept: Per Persson", &markers), None);
        assert_eq!(normalize_step("   ", &markers), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&serde_json::json!(2.5)), Some(2.5));
        assert_eq!(parse_number(&serde_json::json!("1,5")), Some(1.5));
        assert_eq!(parse_number(&serde_json::json!(" 3 ")), Some(3.0));
        assert_eq!(parse_number(&serde_json::json!("en nypa")), None);
        assert_eq!(parse_number(&Value::Null), None);
    }

    #[test]
    fn test_text_value() {
        assert_eq!(text_value(serde_json::json!(4)), "4");
        assert_eq!(text_value(serde_json::json!("4-6")), "4-6");
        assert_eq!(text_value(Value::Null), "");
    }

    #[test]
    fn test_trim_reference() {
        assert_eq!(
            trim_reference(" https://www.ica.se/recept/scones-690203/ "),
            "https://www.ica.se/recept/scones-690203"
        );
    }
}
