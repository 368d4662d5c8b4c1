//! services/api/src/adapters/image_llm.rs
//!
//! This module contains the adapter for artistic image generation, used to
//! illustrate weekly insight reports. It implements the
//! `ImageGenerationService` port from the `core` crate.
//!
//! The images endpoint is called directly over HTTP; the themed prompt is
//! wrapped in a fixed style directive so every rendering matches the app's
//! visual language.

use async_trait::async_trait;
use mindhaven_core::ports::{ImageGenerationService, PortError, PortResult};
use serde::Deserialize;
use serde_json::json;

pub struct ImageApiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ImageApiAdapter {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

fn styled_prompt(prompt: &str) -> String {
    format!(
        "An artistic and evocative digital painting representing the concept of: \"{}\". \
         Style: a blend of impressionism and surrealism, beautiful, high quality, soft \
         textures, calming colors.",
        prompt,
    )
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

#[async_trait]
impl ImageGenerationService for ImageApiAdapter {
    async fn generate_artwork(&self, prompt: &str) -> PortResult<String> {
        let body = json!({
            "model": self.model,
            "prompt": styled_prompt(prompt),
            "n": 1,
            "size": "1024x1792",
            "response_format": "b64_json",
        });

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Image generation failed with status {}: {}",
                status, detail
            )));
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let encoded = parsed
            .data
            .into_iter()
            .next()
            .and_then(|datum| datum.b64_json)
            .ok_or_else(|| {
                PortError::Unexpected("Image generation returned no image data.".to_string())
            })?;

        Ok(format!("data:image/jpeg;base64,{}", encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styled_prompt_embeds_the_theme() {
        let styled = styled_prompt("a week of small victories");
        assert!(styled.contains("\"a week of small victories\""));
        assert!(styled.contains("impressionism"));
    }
}
