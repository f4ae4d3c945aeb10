//! The Rust client SDK for Flagent, a feature flagging and experimentation service.
//!
//! # Overview
//!
//! The SDK revolves around a [`FlagentClient`] that asks the remote Flagent
//! service which variant of a flag an entity should see. An entity is
//! identified by an ID and a type (`"user"`, `"device"`, ...) and may carry
//! free-form [`Attributes`] the server matches segment constraints against.
//! Evaluation results in an [`EvalResult`] carrying the assigned variant and
//! its attachment payload.
//!
//! Single-flag evaluations are memoized in a local TTL cache keyed by flag
//! and entity identity; batch evaluations ([`FlagentClient::evaluate_batch`])
//! always go to the server. The cache is a capability ([`EvalCache`]) with a
//! real store ([`TtlCache`]) and a no-op implementation ([`NoopCache`]), so
//! the evaluation path never branches on whether caching is configured.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum, which distinguishes
//! transport failures from well-formed error responses. Remote failures are
//! always propagated and never cached; health checks are the one exception
//! and are translated into a [`HealthStatus`] instead.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages under the `flagent` target. Consider integrating a
//! `log`-compatible logger implementation for better visibility into SDK
//! operations.
//!
//! # Examples
//!
//! ```no_run
//! # use flagent::{ClientConfig, EvalContext};
//! let client = ClientConfig::new("http://localhost:18000")
//!     .cache_ttl_ms(60_000)
//!     .to_client()
//!     .unwrap();
//!
//! let result = client
//!     .evaluate(&EvalContext::by_flag_key("my_flag", "user-1"))
//!     .unwrap();
//! println!("variant: {:?}", result.variant_key);
//! ```

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod cache;
mod client;
mod config;
mod error;
mod evaluation_api;
mod models;

pub use cache::{EvalCache, NoopCache, TtlCache, DEFAULT_CACHE_TTL};
pub use client::{FlagentClient, HealthStatus};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use evaluation_api::{ApiClient, EvaluationApi};
pub use models::{
    ApiInfo, AttributeValue, Attributes, Constraint, ConstraintOperator, Distribution,
    EvalContext, EvalDebugLog, EvalResult, EvaluationBatchRequest, EvaluationBatchResponse,
    EvaluationEntity, Flag, FlagTagsOperator, Health, Segment, SegmentDebugLog, Tag, Timestamp,
    Variant, DEFAULT_ENTITY_TYPE,
};
