use crate::cache::{EvalCache, NoopCache, TtlCache};
use crate::evaluation_api::{ApiClient, EvaluationApi};
use crate::models::{
    ApiInfo, EvalContext, EvalResult, EvaluationBatchRequest, EvaluationBatchResponse,
};
use crate::{ClientConfig, Error, Result};

/// A client for the Flagent evaluation API.
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// Single-flag evaluations are memoized in a TTL cache keyed by flag and
/// entity identity (see [`FlagentClient::evaluate`]); batch evaluations
/// always go to the server.
///
/// # Examples
/// ```no_run
/// # use flagent::{ClientConfig, EvalContext};
/// let client = ClientConfig::new("http://localhost:18000")
///     .to_client()
///     .unwrap();
/// let result = client.evaluate(&EvalContext::by_flag_key("my_flag", "user-1"));
/// ```
pub struct FlagentClient {
    api: Box<dyn EvaluationApi>,
    cache: Box<dyn EvalCache>,
    enabled: bool,
}

/// Binary health signal derived from the server's health report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// The server reported a healthy status.
    Up,
    /// The server reported an unhealthy status, or the health call failed.
    Down {
        /// The reported status string, or the failure message.
        detail: String,
    },
}

impl HealthStatus {
    /// Whether the server is reachable and healthy.
    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }
}

impl FlagentClient {
    /// Create a new `FlagentClient` using the specified configuration.
    pub fn new(config: ClientConfig) -> Result<FlagentClient> {
        let api = ApiClient::new(&config)?;
        Ok(FlagentClient::with_api(config, api))
    }

    /// Create a client on top of a custom [`EvaluationApi`] implementation.
    ///
    /// The configuration's transport options (base URL, timeouts) are owned
    /// by the provided implementation; only the caching and enablement
    /// options apply here.
    pub fn with_api(config: ClientConfig, api: impl EvaluationApi + 'static) -> FlagentClient {
        let cache: Box<dyn EvalCache> = if config.cache_enabled {
            Box::new(TtlCache::with_ttl(config.cache_ttl))
        } else {
            Box::new(NoopCache)
        };
        FlagentClient {
            api: Box::new(api),
            cache,
            enabled: config.enabled,
        }
    }

    /// Evaluate a single flag for a single entity.
    ///
    /// A cached result is returned as long as its TTL has not elapsed, even
    /// if the flag configuration changed on the server in the meantime. On a
    /// miss the server is called and, on success, the result is stored under
    /// the context's cache key; failures are propagated and never cached.
    ///
    /// The miss path is not atomic: concurrent misses for the same key each
    /// call the server and each write the cache, last writer wins. Evaluation
    /// is idempotent server-side, so callers still observe a consistent
    /// result.
    pub fn evaluate(&self, context: &EvalContext) -> Result<EvalResult> {
        if !self.enabled {
            return Err(Error::Disabled);
        }

        let key = cache_key(context);
        if let Some(result) = self.cache.get(&key) {
            log::trace!(target: "flagent", key; "returning cached evaluation result");
            return Ok(result);
        }

        let result = self.api.post_evaluation(context).inspect_err(|err| {
            log::warn!(target: "flagent", key; "evaluation request failed: {:?}", err);
        })?;
        self.cache.put(&key, result.clone());
        Ok(result)
    }

    /// Evaluate a set of flags for a set of entities.
    ///
    /// Batch evaluation always goes to the server: the evaluation cache is
    /// neither consulted nor populated.
    pub fn evaluate_batch(
        &self,
        request: &EvaluationBatchRequest,
    ) -> Result<EvaluationBatchResponse> {
        if !self.enabled {
            return Err(Error::Disabled);
        }
        self.api.post_evaluation_batch(request)
    }

    /// Report the server's health as a binary up/down signal.
    ///
    /// `"ok"` and `"up"` (case-insensitive) map to [`HealthStatus::Up`]; any
    /// other status, a failed call, or a disabled client map to
    /// [`HealthStatus::Down`] with the status string or failure message as
    /// detail. This never returns an error.
    pub fn health(&self) -> HealthStatus {
        if !self.enabled {
            return HealthStatus::Down {
                detail: Error::Disabled.to_string(),
            };
        }
        match self.api.get_health() {
            Ok(health)
                if health.status.eq_ignore_ascii_case("ok")
                    || health.status.eq_ignore_ascii_case("up") =>
            {
                HealthStatus::Up
            }
            Ok(health) => HealthStatus::Down {
                detail: health.status,
            },
            Err(err) => HealthStatus::Down {
                detail: err.to_string(),
            },
        }
    }

    /// Fetch the server's build metadata.
    pub fn info(&self) -> Result<ApiInfo> {
        if !self.enabled {
            return Err(Error::Disabled);
        }
        self.api.get_info()
    }
}

/// Derive the cache key from an evaluation context's identity fields.
///
/// The key covers flag identity (`flag_id` preferred over `flag_key`) and
/// entity identity only; `entity_context`, `enable_debug`, and the tag
/// selector do not participate. Two contexts differing only in those fields
/// share a cache slot, and a flag with ID `1` shares a slot with a flag keyed
/// `"1"`.
fn cache_key(context: &EvalContext) -> String {
    let flag = match (context.flag_id, &context.flag_key) {
        (Some(id), _) => id.to_string(),
        (None, Some(key)) => key.clone(),
        (None, None) => String::new(),
    };
    format!(
        "{}_{}_{}",
        flag,
        context.entity_id.as_deref().unwrap_or(""),
        context.entity_type.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{cache_key, FlagentClient, HealthStatus};
    use crate::evaluation_api::EvaluationApi;
    use crate::models::{
        ApiInfo, EvalContext, EvalResult, EvaluationBatchRequest, EvaluationBatchResponse,
        EvaluationEntity, Health,
    };
    use crate::{ClientConfig, Error, Result};

    /// Scripted stand-in for the evaluation service. Stamps the running call
    /// count into `flag_snapshot_id` so tests can tell fresh responses from
    /// cached ones.
    struct MockApi {
        response: EvalResult,
        health_status: Result<Health>,
        failures_remaining: AtomicUsize,
        evaluation_calls: AtomicUsize,
        batch_calls: AtomicUsize,
    }

    impl MockApi {
        fn new(response: EvalResult, health_status: Result<Health>) -> Arc<MockApi> {
            Arc::new(MockApi {
                response,
                health_status,
                failures_remaining: AtomicUsize::new(0),
                evaluation_calls: AtomicUsize::new(0),
                batch_calls: AtomicUsize::new(0),
            })
        }

        fn returning(response: EvalResult) -> Arc<MockApi> {
            MockApi::new(
                response,
                Ok(Health {
                    status: "ok".to_owned(),
                }),
            )
        }

        fn with_health(health_status: Result<Health>) -> Arc<MockApi> {
            MockApi::new(EvalResult::default(), health_status)
        }
    }

    impl EvaluationApi for MockApi {
        fn post_evaluation(&self, _context: &EvalContext) -> Result<EvalResult> {
            let calls = self.evaluation_calls.fetch_add(1, Ordering::SeqCst) + 1;
            let remaining = self.failures_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_remaining
                    .store(remaining - 1, Ordering::SeqCst);
                return Err(Error::Api {
                    status: 500,
                    message: "evaluation backend unavailable".to_owned(),
                });
            }
            let mut response = self.response.clone();
            response.flag_snapshot_id = Some(calls as i64);
            Ok(response)
        }

        fn post_evaluation_batch(
            &self,
            _request: &EvaluationBatchRequest,
        ) -> Result<EvaluationBatchResponse> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(EvaluationBatchResponse {
                evaluation_results: vec![self.response.clone()],
            })
        }

        fn get_health(&self) -> Result<Health> {
            self.health_status.clone()
        }

        fn get_info(&self) -> Result<ApiInfo> {
            Ok(ApiInfo::default())
        }
    }

    fn control_result(flag_key: &str) -> EvalResult {
        EvalResult {
            flag_key: Some(flag_key.to_owned()),
            variant_key: Some("control".to_owned()),
            ..EvalResult::default()
        }
    }

    fn client_with(config: ClientConfig, api: &Arc<MockApi>) -> FlagentClient {
        FlagentClient::with_api(config, api.clone())
    }

    /// Route SDK logs to test output. Run with `RUST_LOG=flagent=trace` to
    /// see them.
    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn identical_evaluations_hit_the_server_once() {
        init_logs();
        let api = MockApi::returning(control_result("my_flag"));
        let client = client_with(ClientConfig::default().cache_ttl_ms(60_000), &api);
        let context = EvalContext::by_flag_key("my_flag", "user-1");

        let first = client.evaluate(&context).unwrap();
        let second = client.evaluate(&context).unwrap();

        assert_eq!(api.evaluation_calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.variant_key.as_deref(), Some("control"));
    }

    #[test]
    fn expired_entries_trigger_a_new_server_call() {
        let api = MockApi::returning(control_result("my_flag"));
        let client = client_with(ClientConfig::default().cache_ttl_ms(5), &api);
        let context = EvalContext::by_flag_key("my_flag", "user-1");

        client.evaluate(&context).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        client.evaluate(&context).unwrap();

        assert_eq!(api.evaluation_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn entity_context_does_not_participate_in_the_cache_key() {
        let api = MockApi::returning(control_result("f"));
        let client = client_with(ClientConfig::default(), &api);

        let first_context = EvalContext::by_flag_key("f", "u1")
            .entity_context([("tier".to_owned(), "a".into())].into_iter().collect());
        let second_context = EvalContext::by_flag_key("f", "u1")
            .entity_context([("tier".to_owned(), "b".into())].into_iter().collect());

        let first = client.evaluate(&first_context).unwrap();
        let second = client.evaluate(&second_context).unwrap();

        // Identity-only key scope: the second call reuses the first result
        // despite the differing context.
        assert_eq!(api.evaluation_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second, first);
        assert_eq!(second.flag_snapshot_id, Some(1));
    }

    #[test]
    fn numeric_flag_id_collides_with_equal_flag_key() {
        let api = MockApi::returning(control_result("1"));
        let client = client_with(ClientConfig::default(), &api);

        client.evaluate(&EvalContext::by_flag_id(1, "u1")).unwrap();
        client
            .evaluate(&EvalContext::by_flag_key("1", "u1"))
            .unwrap();

        assert_eq!(api.evaluation_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_propagated_and_not_cached() {
        init_logs();
        let api = MockApi::returning(control_result("my_flag"));
        api.failures_remaining.store(1, Ordering::SeqCst);
        let client = client_with(ClientConfig::default(), &api);
        let context = EvalContext::by_flag_key("my_flag", "user-1");

        assert!(matches!(
            client.evaluate(&context),
            Err(Error::Api { status: 500, .. })
        ));

        // The failed call was not cached; the retry reaches the server.
        let result = client.evaluate(&context).unwrap();
        assert_eq!(api.evaluation_calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.variant_key.as_deref(), Some("control"));
    }

    #[test]
    fn batch_evaluations_bypass_the_cache() {
        let api = MockApi::returning(control_result("my_flag"));
        let client = client_with(ClientConfig::default(), &api);
        let request = EvaluationBatchRequest {
            entities: vec![EvaluationEntity {
                entity_id: "user-1".to_owned(),
                ..EvaluationEntity::default()
            }],
            flag_keys: vec!["my_flag".to_owned()],
            ..EvaluationBatchRequest::default()
        };

        client.evaluate_batch(&request).unwrap();
        client.evaluate_batch(&request).unwrap();

        assert_eq!(api.batch_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn disabled_cache_means_every_call_reaches_the_server() {
        let api = MockApi::returning(control_result("my_flag"));
        let client = client_with(ClientConfig::default().cache_enabled(false), &api);
        let context = EvalContext::by_flag_key("my_flag", "user-1");

        client.evaluate(&context).unwrap();
        client.evaluate(&context).unwrap();

        assert_eq!(api.evaluation_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn disabled_client_rejects_calls_without_contacting_the_server() {
        let api = MockApi::returning(control_result("my_flag"));
        let client = client_with(ClientConfig::default().enabled(false), &api);

        assert!(matches!(
            client.evaluate(&EvalContext::by_flag_key("my_flag", "user-1")),
            Err(Error::Disabled)
        ));
        assert!(matches!(client.info(), Err(Error::Disabled)));
        assert!(!client.health().is_up());
        assert_eq!(api.evaluation_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn health_maps_ok_and_up_statuses_case_insensitively() {
        for status in ["ok", "OK", "up", "Up"] {
            let api = MockApi::with_health(Ok(Health {
                status: status.to_owned(),
            }));
            let client = client_with(ClientConfig::default(), &api);
            assert!(client.health().is_up(), "status {status:?} should be UP");
        }
    }

    #[test]
    fn health_reports_other_statuses_as_down_with_detail() {
        let api = MockApi::with_health(Ok(Health {
            status: "degraded".to_owned(),
        }));
        let client = client_with(ClientConfig::default(), &api);
        assert_eq!(
            client.health(),
            HealthStatus::Down {
                detail: "degraded".to_owned()
            }
        );
    }

    #[test]
    fn health_translates_call_failures_instead_of_propagating() {
        let api = MockApi::with_health(Err(Error::Api {
            status: 503,
            message: "unavailable".to_owned(),
        }));
        let client = client_with(ClientConfig::default(), &api);

        let HealthStatus::Down { detail } = client.health() else {
            panic!("expected DOWN status");
        };
        assert!(detail.contains("503"), "detail should carry diagnostics: {detail}");
    }

    #[test]
    fn cache_key_prefers_flag_id_over_flag_key() {
        let context = EvalContext {
            flag_key: Some("shadowed".to_owned()),
            ..EvalContext::by_flag_id(7, "user-1")
        };
        assert_eq!(cache_key(&context), "7_user-1_user");
    }

    #[test]
    fn cache_key_fills_absent_identity_fields_with_empty_strings() {
        assert_eq!(cache_key(&EvalContext::default()), "__");
        assert_eq!(
            cache_key(&EvalContext {
                flag_key: Some("f".to_owned()),
                ..EvalContext::default()
            }),
            "f__"
        );
    }
}
