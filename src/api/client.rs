use crate::api::cache::FeaturedCache;
use crate::api::decode::{decode_object, decode_recipe_list, Envelope};
use crate::api::{
    HttpRequest, HttpResponse, HttpTransport, IngredientSearch, RecipeApi, ReqwestTransport,
    SearchCriteria,
};
use crate::config::ApiConfig;
use crate::error::{ForklyError, RecipeApiError};
use crate::model::{Recipe, RecipeDetail, RecipeId};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::Url;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.spoonacular.com";
/// Recipe fetched to verify the API key
const KEY_CHECK_RECIPE_ID: RecipeId = 715538;
/// Recipe fetched by the endpoint diagnostics
const DIAGNOSTIC_RECIPE_ID: RecipeId = 716429;
const FEATURED_COUNT: u32 = 5;
const MASKED_PREFIX_LEN: usize = 5;

/// Result of [`SpoonacularClient::check_api_key`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyStatus {
    Valid,
    /// 401 with the server's explanation
    Invalid(String),
    Unexpected(u16, String),
}

/// Outcome of one endpoint check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointOutcome {
    /// 200; `valid_json` tells whether the body parsed
    Success { valid_json: bool },
    /// Any other status, with the body
    Status(u16, String),
    /// The request could not be built or sent
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReport {
    pub name: &'static str,
    pub outcome: EndpointOutcome,
}

impl fmt::Display for EndpointReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            EndpointOutcome::Success { valid_json: true } => {
                write!(f, "{}: Success (200 OK) - Valid JSON response", self.name)
            }
            EndpointOutcome::Success { valid_json: false } => {
                write!(f, "{}: Success (200 OK)", self.name)
            }
            EndpointOutcome::Status(status, body) if body.is_empty() => {
                write!(f, "{}: Status code: {}", self.name, status)
            }
            EndpointOutcome::Status(status, body) => {
                write!(f, "{}: Status code: {} - {}", self.name, status, body)
            }
            EndpointOutcome::Failed(message) => write!(f, "{}: {}", self.name, message),
        }
    }
}

/// Result of [`SpoonacularClient::check_endpoints`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDiagnostics {
    pub endpoints: Vec<EndpointReport>,
    pub api_key: Result<ApiKeyStatus, RecipeApiError>,
}

/// Show only the first few characters of an API key
pub fn mask_api_key(api_key: &str) -> String {
    let prefix: String = api_key.chars().take(MASKED_PREFIX_LEN).collect();
    format!("{}...", prefix)
}

/// Client for the Spoonacular recipe API
pub struct SpoonacularClient {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    base_url: String,
    featured: Mutex<FeaturedCache>,
}

impl SpoonacularClient {
    /// Create a client from configuration, using reqwest as the transport
    pub fn new(config: &ApiConfig) -> Result<Self, ForklyError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            ForklyError::MissingConfig(
                "API key not found in config (api.api_key) or SPOONACULAR_API_KEY".to_string(),
            )
        })?;

        let transport = ReqwestTransport::new(config.request_timeout(), config.resource_timeout())
            .map_err(RecipeApiError::from)?;

        Ok(Self::with_transport(
            Arc::new(transport),
            api_key,
            config.base_url.clone(),
            config.featured_cache_ttl(),
        ))
    }

    /// Create a client with simple parameters and default timeouts
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, RecipeApiError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    #[doc(hidden)]
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, RecipeApiError> {
        let defaults = ApiConfig::default();
        let transport =
            ReqwestTransport::new(defaults.request_timeout(), defaults.resource_timeout())?;
        Ok(Self::with_transport(
            Arc::new(transport),
            api_key,
            base_url,
            defaults.featured_cache_ttl(),
        ))
    }

    /// Create a client over any transport
    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        featured_ttl: Duration,
    ) -> Self {
        let api_key = api_key.into();
        info!(
            "Recipe API client initialized with API key: {}",
            mask_api_key(&api_key)
        );
        Self {
            transport,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            featured: Mutex::new(FeaturedCache::new(featured_ttl)),
        }
    }

    /// Masked API key for diagnostics
    pub fn masked_api_key(&self) -> String {
        mask_api_key(&self.api_key)
    }

    /// Drop the cached featured recipes
    pub fn clear_featured_cache(&self) {
        if let Ok(mut cache) = self.featured.lock() {
            cache.clear();
        }
    }

    /// Verify the API key with a cheap information request
    pub async fn check_api_key(&self) -> Result<ApiKeyStatus, RecipeApiError> {
        let path = format!("recipes/{}/information", KEY_CHECK_RECIPE_ID);
        let request = self.build_request(&path, Vec::new())?;
        let response = self.send("key check", request).await?;
        debug!("API key check response code: {}", response.status);

        Ok(match response.status {
            200 => ApiKeyStatus::Valid,
            401 => ApiKeyStatus::Invalid(response.text()),
            status => ApiKeyStatus::Unexpected(status, response.text()),
        })
    }

    /// Hit each endpoint once with a minimal request, then check the key.
    ///
    /// Shows which upstream endpoint is failing right now; nothing is decoded
    /// beyond checking that a 200 body is JSON.
    pub async fn check_endpoints(&self) -> EndpointDiagnostics {
        let information = format!("recipes/{}/information", DIAGNOSTIC_RECIPE_ID);
        let (random, search, details, by_ingredients, api_key) = tokio::join!(
            self.check_endpoint("Random Recipes", "recipes/random", vec![("number", "1".to_string())]),
            self.check_endpoint(
                "Complex Search",
                "recipes/complexSearch",
                vec![("query", "pasta".to_string()), ("number", "1".to_string())],
            ),
            self.check_endpoint("Recipe Information", &information, Vec::new()),
            self.check_endpoint(
                "Find By Ingredients",
                "recipes/findByIngredients",
                vec![
                    ("ingredients", "apples,flour,sugar".to_string()),
                    ("number", "1".to_string()),
                ],
            ),
            self.check_api_key(),
        );

        EndpointDiagnostics {
            endpoints: vec![random, search, details, by_ingredients],
            api_key,
        }
    }

    async fn check_endpoint(
        &self,
        name: &'static str,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> EndpointReport {
        let outcome = match self.build_request(path, params) {
            Err(e) => EndpointOutcome::Failed(e.to_string()),
            Ok(request) => match self.send(name, request).await {
                Err(e) => EndpointOutcome::Failed(e.to_string()),
                Ok(response) if response.status == 200 => EndpointOutcome::Success {
                    valid_json: serde_json::from_slice::<serde_json::Value>(&response.body)
                        .is_ok(),
                },
                Ok(response) => EndpointOutcome::Status(response.status, response.text()),
            },
        };
        debug!("{} endpoint check: {:?}", name, outcome);
        EndpointReport { name, outcome }
    }

    fn build_request(
        &self,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<HttpRequest, RecipeApiError> {
        let endpoint = format!("{}/{}", self.base_url, path);
        let mut query = vec![("apiKey", self.api_key.clone())];
        query.extend(params);

        let url = Url::parse_with_params(&endpoint, &query)
            .map_err(|e| RecipeApiError::InvalidRequest(format!("{}: {}", endpoint, e)))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(RecipeApiError::InvalidRequest(format!(
                "unsupported base URL: {}",
                self.base_url
            )));
        }

        debug!("GET {}", self.redact(&url));

        Ok(HttpRequest {
            url,
            headers: vec![
                ("Accept", "application/json".to_string()),
                ("x-api-key", self.api_key.clone()),
            ],
        })
    }

    /// Send a request. Transport failures never carry the raw key.
    async fn send(&self, endpoint: &str, request: HttpRequest) -> Result<HttpResponse, RecipeApiError> {
        self.transport.get(request).await.map_err(|e| {
            let e = e.redacted(&self.api_key, &self.masked_api_key());
            warn!("{} request failed: {}", endpoint, e);
            RecipeApiError::from(e)
        })
    }

    /// Send a request and turn non-2xx statuses into `Server` errors
    async fn execute(
        &self,
        endpoint: &'static str,
        request: HttpRequest,
    ) -> Result<HttpResponse, RecipeApiError> {
        let response = self.send(endpoint, request).await?;
        debug!("{} response status code: {}", endpoint, response.status);

        if !response.is_success() {
            let body = response.text();
            let body = if body.trim().is_empty() {
                "Server returned error status".to_string()
            } else {
                body
            };
            warn!("{} error response ({}): {}", endpoint, response.status, body);
            return Err(RecipeApiError::Server {
                status: response.status,
                body,
            });
        }

        Ok(response)
    }

    fn redact(&self, url: &Url) -> String {
        let masked = mask_api_key(&self.api_key);
        let mut redacted = url.clone();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                if k == "apiKey" {
                    (k.into_owned(), masked.clone())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
        redacted.to_string()
    }

    fn log_decode_failure(err: &RecipeApiError) {
        if let RecipeApiError::Decode(detail) = err {
            error!("Decoding error: {}", detail);
        }
    }
}

#[async_trait]
impl RecipeApi for SpoonacularClient {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Recipe>, RecipeApiError> {
        let request = self.build_request("recipes/complexSearch", criteria.query_pairs())?;
        let response = self.execute("search", request).await?;

        let recipes = decode_recipe_list("search", &response.body, Envelope::Wrapped("results"))
            .inspect_err(Self::log_decode_failure)?;
        debug!("Successfully decoded {} recipes", recipes.len());
        Ok(recipes)
    }

    async fn get_details(&self, id: RecipeId) -> Result<RecipeDetail, RecipeApiError> {
        let path = format!("recipes/{}/information", id);
        let request = self.build_request(&path, vec![("includeNutrition", "false".to_string())])?;
        let response = self.execute("information", request).await?;

        let detail: RecipeDetail = decode_object("information", &response.body)
            .inspect_err(Self::log_decode_failure)?;
        debug!("Successfully decoded recipe detail {}", detail.id);
        Ok(detail)
    }

    async fn fetch_featured(&self, force_refresh: bool) -> Result<Vec<Recipe>, RecipeApiError> {
        if !force_refresh {
            let cached = self.featured.lock().ok().and_then(|cache| cache.get());
            if let Some((recipes, age)) = cached {
                debug!(
                    "Returning cached featured recipes (cached {} seconds ago)",
                    age.as_secs()
                );
                return Ok(recipes);
            }
        }

        let request = self.build_request(
            "recipes/random",
            vec![
                ("number", FEATURED_COUNT.to_string()),
                ("sort", "random".to_string()),
                ("addRecipeInformation", "true".to_string()),
            ],
        )?;
        let response = self.execute("random", request).await?;

        let recipes = decode_recipe_list("random", &response.body, Envelope::Wrapped("recipes"))
            .inspect_err(Self::log_decode_failure)?;
        debug!("Successfully decoded {} featured recipes", recipes.len());

        // Only a successful fetch may touch the cache
        if let Ok(mut cache) = self.featured.lock() {
            cache.store(recipes.clone());
        }
        Ok(recipes)
    }

    async fn find_by_ingredients(
        &self,
        query: &IngredientSearch,
    ) -> Result<Vec<Recipe>, RecipeApiError> {
        let request = self.build_request("recipes/findByIngredients", query.query_pairs())?;
        let response = self.execute("findByIngredients", request).await?;

        // This endpoint returns a bare array, not a wrapped object
        let recipes =
            decode_recipe_list("findByIngredients", &response.body, Envelope::BareArray)
                .inspect_err(Self::log_decode_failure)?;
        debug!(
            "Successfully decoded {} recipes from findByIngredients",
            recipes.len()
        );
        Ok(recipes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that records requests and replays a fixed response
    struct RecordingTransport {
        calls: AtomicUsize,
        last_url: Mutex<Option<Url>>,
        response: Result<HttpResponse, TransportError>,
    }

    impl RecordingTransport {
        fn replying(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last_url: Mutex::new(None),
                response: Ok(HttpResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                }),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock().unwrap() = Some(request.url);
            self.response.clone()
        }
    }

    fn client(transport: Arc<RecordingTransport>) -> SpoonacularClient {
        SpoonacularClient::with_transport(
            transport,
            "secret-key-123456",
            "https://api.example.test/",
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("abcdefghij"), "abcde...");
        assert_eq!(mask_api_key("ab"), "ab...");
    }

    #[test]
    fn test_redacted_url_hides_key() {
        let client = client(RecordingTransport::replying(200, "{}"));
        let request = client
            .build_request("recipes/complexSearch", vec![("query", "pasta".to_string())])
            .unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://api.example.test/recipes/complexSearch?apiKey=secret-key-123456&query=pasta"
        );

        let redacted = client.redact(&request.url);
        assert!(!redacted.contains("secret-key-123456"));
        assert!(redacted.contains("secre..."));
        assert!(redacted.contains("query=pasta"));
    }

    #[test]
    fn test_request_headers() {
        let client = client(RecordingTransport::replying(200, "{}"));
        let request = client.build_request("recipes/random", Vec::new()).unwrap();
        assert!(request
            .headers
            .contains(&("Accept", "application/json".to_string())));
        assert!(request
            .headers
            .contains(&("x-api-key", "secret-key-123456".to_string())));
    }

    #[tokio::test]
    async fn test_malformed_base_url_is_invalid_request() {
        let transport = RecordingTransport::replying(200, "{}");
        let client = SpoonacularClient::with_transport(
            transport.clone(),
            "key",
            "not a url",
            Duration::from_secs(60),
        );

        let err = client.search(&SearchCriteria::query("pasta")).await.unwrap_err();
        assert!(matches!(err, RecipeApiError::InvalidRequest(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_details_disable_nutrition() {
        let transport =
            RecordingTransport::replying(200, r#"{"id":42,"title":"Soup","instructions":null}"#);
        let client = client(transport.clone());

        let detail = client.get_details(42).await.unwrap();
        assert_eq!(detail.id, 42);

        let url = transport.last_url.lock().unwrap().clone().unwrap();
        assert_eq!(url.path(), "/recipes/42/information");
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "includeNutrition" && v == "false"));
    }

    #[tokio::test]
    async fn test_network_failure() {
        let transport = Arc::new(RecordingTransport {
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
            response: Err(TransportError::Timeout),
        });
        let client = client(transport);

        let err = client.fetch_featured(false).await.unwrap_err();
        assert_eq!(err, RecipeApiError::Network(TransportError::Timeout));
    }

    #[tokio::test]
    async fn test_transport_error_never_carries_the_key() {
        let transport = Arc::new(RecordingTransport {
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
            response: Err(TransportError::Connect(
                "error sending request for url (https://api.example.test/recipes/random?apiKey=secret-key-123456)"
                    .to_string(),
            )),
        });
        let client = client(transport);

        let err = client.fetch_featured(false).await.unwrap_err();
        let message = err.to_string();
        assert!(!message.contains("secret-key-123456"));
        assert!(message.contains("apiKey=secre..."));

        let err = client.check_api_key().await.unwrap_err();
        assert!(!format!("{:?}", err).contains("secret-key-123456"));
    }

    #[test]
    fn test_endpoint_report_display() {
        let ok = EndpointReport {
            name: "Random Recipes",
            outcome: EndpointOutcome::Success { valid_json: true },
        };
        assert_eq!(ok.to_string(), "Random Recipes: Success (200 OK) - Valid JSON response");

        let limited = EndpointReport {
            name: "Complex Search",
            outcome: EndpointOutcome::Status(402, "quota".to_string()),
        };
        assert_eq!(limited.to_string(), "Complex Search: Status code: 402 - quota");
    }

    #[tokio::test]
    async fn test_empty_error_body_gets_placeholder() {
        let client = client(RecordingTransport::replying(500, ""));
        let err = client
            .find_by_ingredients(&IngredientSearch::new(["egg"]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RecipeApiError::Server {
                status: 500,
                body: "Server returned error status".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_check_api_key_statuses() {
        let valid = client(RecordingTransport::replying(200, "{}"));
        assert_eq!(valid.check_api_key().await.unwrap(), ApiKeyStatus::Valid);

        let invalid = client(RecordingTransport::replying(401, "bad key"));
        assert_eq!(
            invalid.check_api_key().await.unwrap(),
            ApiKeyStatus::Invalid("bad key".to_string())
        );

        let limited = client(RecordingTransport::replying(402, "quota"));
        assert_eq!(
            limited.check_api_key().await.unwrap(),
            ApiKeyStatus::Unexpected(402, "quota".to_string())
        );
    }
}
