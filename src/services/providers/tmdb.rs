/// TMDB catalog provider
///
/// Every request carries the API key and locale as query parameters.
/// Responses are converted to client-facing types before caching, so the
/// cache never holds raw provider payloads.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        ApiCredits, ApiGenreList, ApiPage, ApiTitle, ApiTitleDetails, ApiVideos,
        CandidateContent, CastMember, MediaType, TitleDetails, Trailer,
    },
    services::providers::CatalogProvider,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Cast entries returned per title
const MAX_CAST: usize = 20;

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    cache: Option<Cache>,
}

impl TmdbCatalog {
    pub fn new(api_key: String, api_url: String, language: String, cache: Option<Cache>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            cache,
        }
    }

    /// Issues a GET against the catalog and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra_query: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(extra_query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Catalog resource {}", path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path = %path,
                status = %status,
                body = %body,
                "Catalog API request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Catalog API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn list(&self, path: String, media_type: MediaType) -> AppResult<Vec<CandidateContent>> {
        let page: ApiPage<ApiTitle> = self.get_json(&path, &[("page", "1")]).await?;
        Ok(page
            .results
            .into_iter()
            .map(|entry| entry.into_candidate(media_type))
            .collect())
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbCatalog {
    async fn popular(&self, media_type: MediaType) -> AppResult<Vec<CandidateContent>> {
        cached!(
            self.cache,
            CacheKey::Popular(media_type, self.language.clone()),
            self.list(format!("/{}/popular", media_type), media_type)
        )
    }

    async fn top_rated(&self, media_type: MediaType) -> AppResult<Vec<CandidateContent>> {
        cached!(
            self.cache,
            CacheKey::TopRated(media_type, self.language.clone()),
            self.list(format!("/{}/top_rated", media_type), media_type)
        )
    }

    async fn details(&self, media_type: MediaType, id: i64) -> AppResult<TitleDetails> {
        cached!(
            self.cache,
            CacheKey::Details(media_type, id, self.language.clone()),
            async move {
                let details: ApiTitleDetails = self
                    .get_json(&format!("/{}/{}", media_type, id), &[])
                    .await?;
                Ok::<_, AppError>(details.into_details(media_type))
            }
        )
    }

    async fn credits(&self, media_type: MediaType, id: i64) -> AppResult<Vec<CastMember>> {
        cached!(
            self.cache,
            CacheKey::Credits(media_type, id, self.language.clone()),
            async move {
                let credits: ApiCredits = self
                    .get_json(&format!("/{}/{}/credits", media_type, id), &[])
                    .await?;
                Ok::<_, AppError>(
                    credits
                        .cast
                        .into_iter()
                        .take(MAX_CAST)
                        .map(CastMember::from)
                        .collect::<Vec<_>>(),
                )
            }
        )
    }

    async fn trailers(&self, media_type: MediaType, id: i64) -> AppResult<Vec<Trailer>> {
        cached!(
            self.cache,
            CacheKey::Trailers(media_type, id, self.language.clone()),
            async move {
                let videos: ApiVideos = self
                    .get_json(&format!("/{}/{}/videos", media_type, id), &[])
                    .await?;
                Ok::<_, AppError>(
                    videos
                        .results
                        .into_iter()
                        .filter_map(|video| video.into_trailer())
                        .collect::<Vec<_>>(),
                )
            }
        )
    }

    async fn recommendations(
        &self,
        media_type: MediaType,
        id: i64,
    ) -> AppResult<Vec<CandidateContent>> {
        let results: Vec<CandidateContent> = cached!(
            self.cache,
            CacheKey::Recommendations(media_type, id, self.language.clone()),
            self.list(format!("/{}/{}/recommendations", media_type, id), media_type)
        )?;

        tracing::debug!(
            media_type = %media_type,
            source_id = id,
            results = results.len(),
            provider = "tmdb",
            "Recommendations fetched"
        );

        Ok(results)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<CandidateContent>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::Search(query.to_string(), self.language.clone()),
            async move {
                let page: ApiPage<ApiTitle> = self
                    .get_json("/search/multi", &[("query", query), ("page", "1")])
                    .await?;

                // Multi search also returns people; only titles are kept
                let titles: Vec<CandidateContent> = page
                    .results
                    .into_iter()
                    .filter_map(|entry| {
                        let media_type = entry.media_type.as_deref()?.parse::<MediaType>().ok()?;
                        Some(entry.into_candidate(media_type))
                    })
                    .collect();

                tracing::info!(
                    query = %query,
                    results = titles.len(),
                    provider = "tmdb",
                    "Title search completed"
                );

                Ok::<_, AppError>(titles)
            }
        )
    }

    async fn genres(&self, media_type: MediaType) -> AppResult<HashMap<i64, String>> {
        cached!(
            self.cache,
            CacheKey::Genres(media_type, self.language.clone()),
            async move {
                let list: ApiGenreList = self
                    .get_json(&format!("/genre/{}/list", media_type), &[])
                    .await?;
                Ok::<_, AppError>(list.into_lookup())
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog_for(server: &MockServer) -> TmdbCatalog {
        TmdbCatalog::new(
            "test_key".to_string(),
            server.uri(),
            "tr-TR".to_string(),
            None,
        )
    }

    #[tokio::test]
    async fn test_recommendations_sends_key_and_locale() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/27205/recommendations"))
            .and(query_param("api_key", "test_key"))
            .and(query_param("language", "tr-TR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "results": [
                    {"id": 157336, "title": "Interstellar", "overview": "Space.", "genre_ids": [12, 18],
                     "popularity": 140.2, "vote_average": 8.4, "release_date": "2014-11-05",
                     "original_language": "en"},
                    {"id": 155, "title": "The Dark Knight", "overview": "Batman.", "genre_ids": [28],
                     "popularity": 90.0, "vote_average": 8.5, "release_date": "2008-07-16"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = catalog_for(&server)
            .recommendations(MediaType::Movie, 27205)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 157336);
        assert_eq!(results[0].media_type, MediaType::Movie);
        assert_eq!(results[1].title, "The Dark Knight");
    }

    #[tokio::test]
    async fn test_server_error_is_external_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/popular"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = catalog_for(&server).popular(MediaType::Tv).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
    }

    #[tokio::test]
    async fn test_missing_title_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/999999999"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false, "status_code": 34
            })))
            .mount(&server)
            .await;

        let err = catalog_for(&server)
            .details(MediaType::Movie, 999999999)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_details_conversion() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/1396"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1396,
                "name": "Breaking Bad",
                "overview": "A chemistry teacher...",
                "genres": [{"id": 18, "name": "Dram"}, {"id": 80, "name": "Suç"}],
                "vote_average": 8.9,
                "first_air_date": "2008-01-20",
                "number_of_seasons": 5,
                "tagline": ""
            })))
            .mount(&server)
            .await;

        let details = catalog_for(&server).details(MediaType::Tv, 1396).await.unwrap();
        assert_eq!(details.title, "Breaking Bad");
        assert_eq!(details.genres.len(), 2);
        assert_eq!(details.genres[1].name, "Suç");
        assert_eq!(details.number_of_seasons, Some(5));
        assert_eq!(details.tagline, None);
    }

    #[tokio::test]
    async fn test_search_keeps_only_titles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/multi"))
            .and(query_param("query", "matrix"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "results": [
                    {"id": 603, "media_type": "movie", "title": "The Matrix"},
                    {"id": 6384, "media_type": "person", "name": "Keanu Reeves"},
                    {"id": 4614, "media_type": "tv", "name": "The Matrix Files"}
                ]
            })))
            .mount(&server)
            .await;

        let results = catalog_for(&server).search("  matrix ").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].media_type, MediaType::Movie);
        assert_eq!(results[1].media_type, MediaType::Tv);
    }

    #[tokio::test]
    async fn test_empty_search_rejected() {
        let server = MockServer::start().await;
        let err = catalog_for(&server).search("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_trailers_filtered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/603/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"key": "vKQi3bBA1y8", "name": "Trailer", "site": "YouTube", "type": "Trailer"},
                    {"key": "xyz", "name": "Clip", "site": "YouTube", "type": "Clip"}
                ]
            })))
            .mount(&server)
            .await;

        let trailers = catalog_for(&server).trailers(MediaType::Movie, 603).await.unwrap();
        assert_eq!(trailers.len(), 1);
        assert_eq!(trailers[0].key, "vKQi3bBA1y8");
    }

    #[tokio::test]
    async fn test_genre_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/genre/movie/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "genres": [{"id": 28, "name": "Aksiyon"}, {"id": 35, "name": "Komedi"}]
            })))
            .mount(&server)
            .await;

        let genres = catalog_for(&server).genres(MediaType::Movie).await.unwrap();
        assert_eq!(genres.len(), 2);
        assert_eq!(genres.get(&35).map(String::as_str), Some("Komedi"));
    }
}
