use reqwest::Client as HttpClient;
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    services::providers::SimilarityProvider,
};

/// HuggingFace inference API, sentence-similarity task
#[derive(Clone)]
pub struct HuggingFaceSimilarity {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

#[derive(Serialize)]
struct SimilarityRequest<'a> {
    inputs: SimilarityInputs<'a>,
}

#[derive(Serialize)]
struct SimilarityInputs<'a> {
    source_sentence: &'a str,
    sentences: &'a [String],
}

impl HuggingFaceSimilarity {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl SimilarityProvider for HuggingFaceSimilarity {
    async fn similarities(&self, source: &str, sentences: &[String]) -> AppResult<Vec<f64>> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let payload = SimilarityRequest {
            inputs: SimilarityInputs {
                source_sentence: source,
                sentences,
            },
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Similarity API returned status {}: {}",
                status, body
            )));
        }

        let scores: Vec<f64> = response.json().await?;
        if scores.len() != sentences.len() {
            return Err(AppError::ExternalApi(format!(
                "Similarity API returned {} scores for {} sentences",
                scores.len(),
                sentences.len()
            )));
        }

        Ok(scores)
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/models/sentence-transformers/all-MiniLM-L6-v2";

    fn provider_for(server: &MockServer) -> HuggingFaceSimilarity {
        HuggingFaceSimilarity::new("hf_test".to_string(), format!("{}{}", server.uri(), MODEL_PATH))
    }

    #[tokio::test]
    async fn test_similarities_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_json(json!({
                "inputs": {
                    "source_sentence": "Interstellar. Space. Drama",
                    "sentences": ["Inception. Dreams. Action", "Up. Balloons. Animation"]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.62, 0.11])))
            .expect(1)
            .mount(&server)
            .await;

        let sentences = vec![
            "Inception. Dreams. Action".to_string(),
            "Up. Balloons. Animation".to_string(),
        ];
        let scores = provider_for(&server)
            .similarities("Interstellar. Space. Drama", &sentences)
            .await
            .unwrap();

        assert_eq!(scores, vec![0.62, 0.11]);
    }

    #[tokio::test]
    async fn test_model_loading_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": "Model is currently loading"
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .similarities("a", &["b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
    }

    #[tokio::test]
    async fn test_length_mismatch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.5])))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .similarities("a", &["b".to_string(), "c".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 scores for 2 sentences"));
    }

    #[tokio::test]
    async fn test_no_sentences_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let scores = provider_for(&server).similarities("a", &[]).await.unwrap();
        assert!(scores.is_empty());
    }
}
