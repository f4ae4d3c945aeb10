//! Wire data model for the Flagent evaluation API.
//!
//! Field names follow the server's JSON format (`flagID`, `entityID`,
//! `variantAttachment`, ...). The client transports targeting configuration
//! (flags, segments, constraints, distributions, variants) verbatim; matching
//! and rollout decisions are made server-side.

use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

#[allow(missing_docs)]
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Key-value pairs of free-form attributes.
///
/// Used for entity context and variant attachments.
///
/// # Examples
/// ```
/// # use flagent::{Attributes, AttributeValue};
/// let attributes = [
///     ("age".to_owned(), 30.0.into()),
///     ("is_premium_member".to_owned(), true.into()),
///     ("username".to_owned(), "john_doe".into()),
/// ].into_iter().collect::<Attributes>();
/// ```
pub type Attributes = HashMap<String, AttributeValue>;

/// A JSON-like attribute value.
///
/// Conveniently implements `From` conversions for `String`, `&str`, `f64`, and `bool` types.
#[derive(Debug, Serialize, Deserialize, PartialEq, From, Clone)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// A null value or absence of value.
    Null,
    /// A list of nested values.
    List(Vec<AttributeValue>),
    /// A nested map of values.
    Map(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Return the string value, if this is a string attribute.
    pub fn as_str(&self) -> Option<&str> {
        if let AttributeValue::String(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Operator combining multiple flag tags in a selector.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagTagsOperator {
    /// Match flags carrying at least one of the selector tags.
    #[default]
    Any,
    /// Match only flags carrying every selector tag.
    All,
}

impl FlagTagsOperator {
    /// Check whether `flag` matches the given tag selector.
    ///
    /// An empty selector matches nothing.
    pub fn matches(self, selector: &[String], flag: &Flag) -> bool {
        if selector.is_empty() {
            return false;
        }
        match self {
            FlagTagsOperator::Any => selector.iter().any(|tag| flag.has_tag(tag)),
            FlagTagsOperator::All => selector.iter().all(|tag| flag.has_tag(tag)),
        }
    }
}

/// Context for a single flag evaluation.
///
/// Flag identity is either-or: exactly one of `flag_id`/`flag_key` is
/// expected to be meaningful per call. Use [`EvalContext::by_flag_id`] or
/// [`EvalContext::by_flag_key`] to get this right by construction.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EvalContext {
    /// Numeric flag identity.
    #[serde(rename = "flagID", skip_serializing_if = "Option::is_none")]
    pub flag_id: Option<i64>,
    /// String flag identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_key: Option<String>,
    /// Identifier of the entity being evaluated.
    #[serde(rename = "entityID", skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Type of the entity, e.g. `"user"` or `"device"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// Free-form context the server matches segment constraints against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_context: Option<Attributes>,
    /// Ask the server to attach an evaluation debug log to the result.
    pub enable_debug: bool,
    /// Tag selector, combined under `flag_tags_operator`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flag_tags: Vec<String>,
    /// How multiple tags combine. Absent means ANY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_tags_operator: Option<FlagTagsOperator>,
}

/// Default entity type assumed when the caller does not specify one.
pub const DEFAULT_ENTITY_TYPE: &str = "user";

impl EvalContext {
    /// Create a context identifying the flag by key.
    pub fn by_flag_key(flag_key: impl Into<String>, entity_id: impl Into<String>) -> Self {
        EvalContext {
            flag_key: Some(flag_key.into()),
            entity_id: Some(entity_id.into()),
            entity_type: Some(DEFAULT_ENTITY_TYPE.to_owned()),
            ..EvalContext::default()
        }
    }

    /// Create a context identifying the flag by numeric ID.
    pub fn by_flag_id(flag_id: i64, entity_id: impl Into<String>) -> Self {
        EvalContext {
            flag_id: Some(flag_id),
            entity_id: Some(entity_id.into()),
            entity_type: Some(DEFAULT_ENTITY_TYPE.to_owned()),
            ..EvalContext::default()
        }
    }

    /// Override the entity type.
    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Attach free-form entity context.
    pub fn entity_context(mut self, entity_context: Attributes) -> Self {
        self.entity_context = Some(entity_context);
        self
    }

    /// Request an evaluation debug log from the server.
    pub fn enable_debug(mut self, enable_debug: bool) -> Self {
        self.enable_debug = enable_debug;
        self
    }
}

/// Result of a single flag evaluation, produced by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EvalResult {
    #[allow(missing_docs)]
    #[serde(rename = "flagID", skip_serializing_if = "Option::is_none")]
    pub flag_id: Option<i64>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_key: Option<String>,
    /// Snapshot of the flag configuration this evaluation was served from.
    #[serde(rename = "flagSnapshotID", skip_serializing_if = "Option::is_none")]
    pub flag_snapshot_id: Option<i64>,
    /// Tags attached to the flag at evaluation time.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flag_tags: Vec<String>,
    /// Segment the entity fell into, if any.
    #[serde(rename = "segmentID", skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<i64>,
    /// Variant assigned to the entity, if any.
    #[serde(rename = "variantID", skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<i64>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_key: Option<String>,
    /// Payload of the assigned variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_attachment: Option<Attributes>,
    /// Evaluation context echoed back by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_context: Option<EvalContext>,
    /// Server-side evaluation time, milliseconds on the wire.
    #[serde(
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<Timestamp>,
    /// Diagnostic trace, present only when debug was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_debug_log: Option<EvalDebugLog>,
}

impl EvalResult {
    /// Whether the evaluation assigned a variant. Disabled flags and
    /// non-matching entities yield no variant.
    pub fn is_enabled(&self) -> bool {
        self.variant_key.is_some()
    }

    /// Look up a value in the variant attachment.
    pub fn attachment_value(&self, key: &str) -> Option<&AttributeValue> {
        self.variant_attachment.as_ref()?.get(key)
    }
}

/// Evaluation debug log attached to a result when debug is requested.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EvalDebugLog {
    #[allow(missing_docs)]
    pub msg: String,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segment_debug_logs: Vec<SegmentDebugLog>,
}

/// Per-segment entry of an evaluation debug log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SegmentDebugLog {
    #[allow(missing_docs)]
    #[serde(rename = "segmentID", skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<i64>,
    #[allow(missing_docs)]
    pub msg: String,
}

/// An entity inside a batch evaluation request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationEntity {
    #[allow(missing_docs)]
    #[serde(rename = "entityID")]
    pub entity_id: String,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_context: Option<Attributes>,
}

/// Request evaluating a set of flags for a set of entities.
///
/// Flags are selected as the union of explicit `flag_ids`, explicit
/// `flag_keys`, and flags matching the tag selector.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationBatchRequest {
    #[allow(missing_docs)]
    pub entities: Vec<EvaluationEntity>,
    #[allow(missing_docs)]
    #[serde(rename = "flagIDs", skip_serializing_if = "Vec::is_empty")]
    pub flag_ids: Vec<i64>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flag_keys: Vec<String>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flag_tags: Vec<String>,
    /// How multiple tags combine. Absent means ANY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_tags_operator: Option<FlagTagsOperator>,
    #[allow(missing_docs)]
    pub enable_debug: bool,
}

impl EvaluationBatchRequest {
    /// Whether this request's selectors pick the given flag.
    pub fn selects(&self, flag: &Flag) -> bool {
        if flag.id.map_or(false, |id| self.flag_ids.contains(&id)) {
            return true;
        }
        if self.flag_keys.iter().any(|key| *key == flag.key) {
            return true;
        }
        self.flag_tags_operator
            .unwrap_or_default()
            .matches(&self.flag_tags, flag)
    }

    /// Filter `flags` down to the ones this request selects, preserving
    /// input order.
    pub fn selected_flags<'a>(&self, flags: &'a [Flag]) -> Vec<&'a Flag> {
        flags.iter().filter(|flag| self.selects(flag)).collect()
    }
}

/// Response to a batch evaluation request. One result per (entity, matched
/// flag) pair, in server-determined order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationBatchResponse {
    #[allow(missing_docs)]
    pub evaluation_results: Vec<EvalResult>,
}

/// A feature flag: the root of the targeting configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Flag {
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[allow(missing_docs)]
    pub key: String,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Disabled flags yield no variant assignment.
    pub enabled: bool,
    /// Whether evaluation results for this flag are recorded server-side.
    pub data_records_enabled: bool,
    /// Entity type this flag expects, used by the server as a default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// Segments in `rank` order; the server applies the first whose
    /// constraints match.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
}

impl Flag {
    /// Whether the flag carries a tag with the given value.
    pub fn has_tag(&self, value: &str) -> bool {
        self.tags.iter().any(|tag| tag.value == value)
    }
}

/// A label attached to flags.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[allow(missing_docs)]
    pub value: String,
}

/// A ranked, constraint-gated subset of entities within a flag.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Segment {
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[allow(missing_docs)]
    #[serde(rename = "flagID", skip_serializing_if = "Option::is_none")]
    pub flag_id: Option<i64>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Segments are evaluated in ascending rank order.
    pub rank: i64,
    /// Fraction of matching traffic this segment applies to, 0..=100.
    pub rollout_percent: i64,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    /// Variant distributions; the server expects them to sum to 100. The
    /// client only transports them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub distributions: Vec<Distribution>,
}

/// Predicate over `entity_context[property]`, evaluated server-side.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[allow(missing_docs)]
    #[serde(rename = "segmentID", default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<i64>,
    #[allow(missing_docs)]
    pub property: String,
    #[allow(missing_docs)]
    pub operator: ConstraintOperator,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Operators a constraint can apply to an entity context property.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum ConstraintOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Matches regex.
    Ereg,
    /// Regex does not match.
    Nereg,
    In,
    NotIn,
    Contains,
    NotContains,
}

/// A percentage-weighted mapping from a segment to a variant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Distribution {
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[allow(missing_docs)]
    #[serde(rename = "segmentID", skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<i64>,
    #[allow(missing_docs)]
    #[serde(rename = "variantID")]
    pub variant_id: i64,
    #[allow(missing_docs)]
    pub variant_key: String,
    #[allow(missing_docs)]
    pub percent: i64,
}

/// A concrete value/payload a flag can resolve to.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Variant {
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[allow(missing_docs)]
    #[serde(rename = "flagID", skip_serializing_if = "Option::is_none")]
    pub flag_id: Option<i64>,
    #[allow(missing_docs)]
    pub key: String,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attributes>,
}

/// Health report returned by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Health {
    #[allow(missing_docs)]
    pub status: String,
}

/// Build metadata reported by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiInfo {
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_time: Option<String>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
}
