//! An HTTP client for the remote evaluation service.

use reqwest::Url;

use crate::models::{
    ApiInfo, EvalContext, EvalResult, EvaluationBatchRequest, EvaluationBatchResponse, Health,
};
use crate::{ClientConfig, Error, Result};

/// Fixed API version path appended to the base URL when not already present.
const API_VERSION_PATH: &str = "/api/v1";

/// Operations the remote evaluation service exposes.
///
/// [`FlagentClient`](crate::FlagentClient) depends on this trait rather than
/// a concrete transport, so tests and embedders can substitute their own
/// implementation.
pub trait EvaluationApi: Send + Sync {
    /// Evaluate a single flag for a single entity.
    fn post_evaluation(&self, context: &EvalContext) -> Result<EvalResult>;
    /// Evaluate a set of flags for a set of entities.
    fn post_evaluation_batch(
        &self,
        request: &EvaluationBatchRequest,
    ) -> Result<EvaluationBatchResponse>;
    /// Fetch the server's health report.
    fn get_health(&self) -> Result<Health>;
    /// Fetch the server's build metadata.
    fn get_info(&self) -> Result<ApiInfo>;
}

// Allows sharing one transport between several clients.
impl<T: EvaluationApi + ?Sized> EvaluationApi for std::sync::Arc<T> {
    fn post_evaluation(&self, context: &EvalContext) -> Result<EvalResult> {
        (**self).post_evaluation(context)
    }

    fn post_evaluation_batch(
        &self,
        request: &EvaluationBatchRequest,
    ) -> Result<EvaluationBatchResponse> {
        (**self).post_evaluation_batch(request)
    }

    fn get_health(&self) -> Result<Health> {
        (**self).get_health()
    }

    fn get_info(&self) -> Result<ApiInfo> {
        (**self).get_info()
    }
}

/// [`EvaluationApi`] implementation backed by HTTP.
pub struct ApiClient {
    // Client holds a connection pool internally, so we're reusing the client
    // between requests.
    client: reqwest::blocking::Client,
    evaluation_url: Url,
    batch_url: Url,
    health_url: Url,
    info_url: Url,
}

impl ApiClient {
    /// Create an API client from the given configuration.
    pub fn new(config: &ClientConfig) -> Result<ApiClient> {
        let base_url = normalize_base_url(&config.base_url)?;
        let endpoint = |path: &str| {
            Url::parse(&format!("{}{}", base_url, path)).map_err(Error::InvalidBaseUrl)
        };

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;

        Ok(ApiClient {
            client,
            evaluation_url: endpoint("/evaluation")?,
            batch_url: endpoint("/evaluation/batch")?,
            health_url: endpoint("/health")?,
            info_url: endpoint("/info")?,
        })
    }

    fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        log::warn!(target: "flagent", status = status.as_u16(); "received non-2xx response from evaluation service");
        let message = response.text().unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl EvaluationApi for ApiClient {
    fn post_evaluation(&self, context: &EvalContext) -> Result<EvalResult> {
        log::debug!(target: "flagent", "posting evaluation request");
        let response = self
            .client
            .post(self.evaluation_url.clone())
            .json(context)
            .send()?;
        let response = Self::check_status(response)?;
        Ok(response.json()?)
    }

    fn post_evaluation_batch(
        &self,
        request: &EvaluationBatchRequest,
    ) -> Result<EvaluationBatchResponse> {
        log::debug!(target: "flagent", entities = request.entities.len(); "posting batch evaluation request");
        let response = self
            .client
            .post(self.batch_url.clone())
            .json(request)
            .send()?;
        let response = Self::check_status(response)?;
        Ok(response.json()?)
    }

    fn get_health(&self) -> Result<Health> {
        let response = self.client.get(self.health_url.clone()).send()?;
        let response = Self::check_status(response)?;
        Ok(response.json()?)
    }

    fn get_info(&self) -> Result<ApiInfo> {
        let response = self.client.get(self.info_url.clone()).send()?;
        let response = Self::check_status(response)?;
        Ok(response.json()?)
    }
}

/// Normalize the configured base URL: strip trailing slashes and append the
/// API version path unless the caller already included it.
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim_end_matches('/');
    let full = if trimmed.ends_with(API_VERSION_PATH) {
        trimmed.to_owned()
    } else {
        format!("{}{}", trimmed, API_VERSION_PATH)
    };
    Url::parse(&full).map_err(Error::InvalidBaseUrl)
}
