//! JSON-over-REST implementation of [`EarthDataProvider`].
//!
//! Posts tagged expression trees to a configured base URL and decodes the
//! typed responses. Construction performs a one-time capability ping; a
//! failed ping (or missing configuration) leaves the provider permanently
//! not ready, so every downstream call fails fast with
//! [`ProviderError::NotConfigured`] instead of attempting the network.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    EarthDataProvider, Expression, Filter, Geometry, ImageReduction, MapHandle, ProviderError,
    Reducer, VisParams,
};

/// Environment variable naming the provider base URL.
pub const ENV_BASE_URL: &str = "EARTH_DATA_API_URL";

/// Environment variable holding the bearer token, when the deployment
/// requires one.
pub const ENV_API_KEY: &str = "EARTH_DATA_API_KEY";

/// Environment variable overriding the request timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "EARTH_DATA_TIMEOUT_SECS";

/// Applied to every request, including tile fetches; heavy reductions and
/// tiles are the latency-sensitive paths.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`HttpEarthDataProvider`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Service base URL, e.g. `https://earth.example.com`.
    pub base_url: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Creates a config with the default timeout and no credentials.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_owned());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads configuration from the environment.
    ///
    /// Returns `None` when [`ENV_BASE_URL`] is unset — the deployment has
    /// no provider, which is a degraded-but-valid state.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(ENV_BASE_URL).ok()?;
        let mut config = Self::new(&base_url);
        if let Ok(api_key) = std::env::var(ENV_API_KEY) {
            config = config.with_api_key(&api_key);
        }
        if let Some(secs) = std::env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
        {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Some(config)
    }
}

/// The production provider: one shared `reqwest::Client`, safe for
/// concurrent use across requests.
pub struct HttpEarthDataProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    ready: bool,
}

impl HttpEarthDataProvider {
    /// Connects to the service and performs the one-time capability check.
    ///
    /// Never fails: a provider that cannot be reached is returned not
    /// ready, and the failure is logged once here instead of once per
    /// request.
    pub async fn connect(config: ProviderConfig) -> Self {
        let client = match reqwest::Client::builder().timeout(config.timeout).build() {
            Ok(client) => client,
            Err(e) => {
                log::error!("Failed to build HTTP client for earth data service: {e}");
                return Self {
                    config,
                    client: reqwest::Client::new(),
                    ready: false,
                };
            }
        };

        let ready = match ping(&client, &config).await {
            Ok(()) => {
                log::info!("Earth data service ready at {}", config.base_url);
                true
            }
            Err(e) => {
                log::warn!(
                    "Earth data service capability check failed: {e}; \
                     index operations will be unavailable"
                );
                false
            }
        };

        Self {
            config,
            client,
            ready,
        }
    }

    /// Builds a provider from environment variables.
    ///
    /// A missing [`ENV_BASE_URL`] produces a permanently not-ready
    /// provider rather than an error, mirroring a deployment that never
    /// configured the service.
    pub async fn from_env() -> Self {
        if let Some(config) = ProviderConfig::from_env() {
            Self::connect(config).await
        } else {
            log::warn!("{ENV_BASE_URL} is not set; earth data service is not configured");
            Self {
                config: ProviderConfig::new(""),
                client: reqwest::Client::new(),
                ready: false,
            }
        }
    }

    fn ensure_ready(&self) -> Result<(), ProviderError> {
        if self.ready {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured)
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        serde_json::from_str(&body).map_err(Into::into)
    }
}

async fn ping(client: &reqwest::Client, config: &ProviderConfig) -> Result<(), ProviderError> {
    let mut request = client.get(join_url(&config.base_url, "v1/ping"));
    if let Some(api_key) = &config.api_key {
        request = request.bearer_auth(api_key);
    }
    request.send().await?.error_for_status()?;
    Ok(())
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Extracts the provider's failure message from an error response body,
/// falling back to the status line plus a body snippet.
fn api_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    let message = serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| format!("status {status}: {}", snippet(body)),
        |parsed| parsed.error.message,
    );
    ProviderError::Api { message }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[derive(Serialize)]
struct GeometryLookupRequest<'a> {
    dataset: &'a str,
    filters: &'a [Filter],
}

#[derive(Deserialize)]
struct GeometryLookupResponse {
    geometry: Option<Geometry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReduceRegionRequest<'a> {
    expression: &'a Expression,
    reducer: Reducer,
    geometry: &'a Geometry,
    scale: u32,
    max_pixels: u64,
}

#[derive(Deserialize)]
struct ReduceRegionResponse {
    /// Explicit nulls and absent keys both mean "no data for this key".
    values: BTreeMap<String, Option<f64>>,
}

#[derive(Deserialize)]
struct ReduceImagesResponse {
    results: Vec<ImageReduction>,
}

#[derive(Serialize)]
struct MapRequest<'a> {
    expression: &'a Expression,
    visualization: &'a VisParams,
}

#[async_trait::async_trait]
impl EarthDataProvider for HttpEarthDataProvider {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn feature_geometry(
        &self,
        dataset: &str,
        filters: &[Filter],
    ) -> Result<Option<Geometry>, ProviderError> {
        self.ensure_ready()?;
        let response: GeometryLookupResponse = self
            .post(
                "v1/geometry/lookup",
                &GeometryLookupRequest { dataset, filters },
            )
            .await?;
        Ok(response.geometry)
    }

    async fn reduce_region(
        &self,
        expression: &Expression,
        reducer: Reducer,
        geometry: &Geometry,
        scale: u32,
        max_pixels: u64,
    ) -> Result<BTreeMap<String, f64>, ProviderError> {
        self.ensure_ready()?;
        let response: ReduceRegionResponse = self
            .post(
                "v1/reduce/region",
                &ReduceRegionRequest {
                    expression,
                    reducer,
                    geometry,
                    scale,
                    max_pixels,
                },
            )
            .await?;
        Ok(response
            .values
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect())
    }

    async fn reduce_images(
        &self,
        collection: &Expression,
        reducer: Reducer,
        geometry: &Geometry,
        scale: u32,
        max_pixels: u64,
    ) -> Result<Vec<ImageReduction>, ProviderError> {
        self.ensure_ready()?;
        let response: ReduceImagesResponse = self
            .post(
                "v1/reduce/images",
                &ReduceRegionRequest {
                    expression: collection,
                    reducer,
                    geometry,
                    scale,
                    max_pixels,
                },
            )
            .await?;
        Ok(response.results)
    }

    async fn map_id(
        &self,
        expression: &Expression,
        visualization: &VisParams,
    ) -> Result<MapHandle, ProviderError> {
        self.ensure_ready()?;
        self.post(
            "v1/map",
            &MapRequest {
                expression,
                visualization,
            },
        )
        .await
    }

    async fn fetch_tile(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.ensure_ready()?;
        let mut request = self.client.get(url);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::TileNotFound {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
