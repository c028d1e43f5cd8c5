//! Producer and consumer binding properties.
//!
//! Properties arrive as a flat string bag (the shape configuration sources
//! produce) and are parsed into typed settings. Parsing validates syntax
//! only; the partition count is range-checked when the producer is bound.

use super::BinderDomainError;
use crate::message::domain::ContentType;
use crate::partition::{PartitionCount, PartitionKeyRule, PartitionRouter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::{NonZeroU32, NonZeroUsize};
use std::str::FromStr;
use std::time::Duration;

const PARTITIONED: &str = "partitioned";
const COUNT: &str = "count";
const PARTITION_COUNT: &str = "partitionCount";
const PARTITION_KEY_EXPRESSION: &str = "partitionKeyExpression";
const HEADER_MODE: &str = "headerMode";
const HEADERS: &str = "headers";
const CONTENT_TYPE: &str = "contentType";
const CONCURRENCY: &str = "concurrency";
const MAX_ATTEMPTS: &str = "maxAttempts";
const BACK_OFF_INITIAL_INTERVAL: &str = "backOffInitialInterval";
const BACK_OFF_MULTIPLIER: &str = "backOffMultiplier";
const BACK_OFF_MAX_INTERVAL: &str = "backOffMaxInterval";
const MALFORMED_ENVELOPE_POLICY: &str = "malformedEnvelopePolicy";

/// Upper bound on the back-off multiplier.
const MAX_MULTIPLIER: f64 = 100.0;

/// Flat string properties for one binding or binder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<String, String>);

impl PropertyBag {
    /// Creates an empty bag.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns this bag with one more property.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a property, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns a property value with surrounding whitespace removed.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|value| value.trim())
    }

    /// Returns whether no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, BinderDomainError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|err| BinderDomainError::invalid_property(key, raw, err.to_string()))
            })
            .transpose()
    }

    fn millis(&self, key: &str) -> Result<Option<Duration>, BinderDomainError> {
        Ok(self.parse::<u64>(key)?.map(Duration::from_millis))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// How message headers travel with the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderMode {
    /// Embed headers in the payload when the transport lacks native headers.
    #[default]
    Embedded,
    /// Hand headers to the transport; dropped when it has no header support.
    Native,
    /// Raw mode: byte payloads only, no headers.
    None,
}

impl HeaderMode {
    /// Returns the property value for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Native => "native",
            Self::None => "none",
        }
    }
}

impl fmt::Display for HeaderMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for HeaderMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "embedded" | "embeddedheaders" => Ok(Self::Embedded),
            "native" | "headers" => Ok(Self::Native),
            "none" | "raw" => Ok(Self::None),
            _ => Err("expected one of embedded, native, none".to_owned()),
        }
    }
}

/// What a consumer does with a payload whose embedded headers cannot be
/// decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MalformedEnvelopePolicy {
    /// Log and discard the message.
    #[default]
    Drop,
    /// Publish a malformed-envelope binder event carrying the raw bytes.
    ErrorChannel,
    /// Deliver the whole original bytes as an un-augmented payload.
    Raw,
}

impl FromStr for MalformedEnvelopePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "errorchannel" | "error_channel" | "error-channel" => Ok(Self::ErrorChannel),
            "raw" => Ok(Self::Raw),
            _ => Err("expected one of drop, errorChannel, raw".to_owned()),
        }
    }
}

/// Delivery retry with exponential back-off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: NonZeroU32,
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
            initial_interval: Duration::from_secs(1),
            multiplier: 2.0,
            max_interval: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delivers once and never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: NonZeroU32::MIN,
            ..Self::default()
        }
    }

    /// Returns this policy with a different attempt limit.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: NonZeroU32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns this policy with different back-off settings.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError::InvalidProperty`] when the multiplier is
    /// not between 1 and 100, or the initial interval exceeds the maximum.
    pub fn with_back_off(
        mut self,
        initial_interval: Duration,
        multiplier: f64,
        max_interval: Duration,
    ) -> Result<Self, BinderDomainError> {
        if !(multiplier.is_finite() && (1.0..=MAX_MULTIPLIER).contains(&multiplier)) {
            return Err(BinderDomainError::invalid_property(
                BACK_OFF_MULTIPLIER,
                &multiplier.to_string(),
                "must be between 1 and 100",
            ));
        }
        if initial_interval > max_interval {
            return Err(BinderDomainError::invalid_property(
                BACK_OFF_INITIAL_INTERVAL,
                &initial_interval.as_millis().to_string(),
                "must not exceed backOffMaxInterval",
            ));
        }
        self.initial_interval = initial_interval;
        self.multiplier = multiplier;
        self.max_interval = max_interval;
        Ok(self)
    }

    /// Returns the maximum number of delivery attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    /// Returns the delay before the attempt following `attempt`.
    ///
    /// The first retry waits the initial interval; each later one multiplies
    /// the previous delay, capped at the maximum interval.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "back-off multipliers are fractional"
    )]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        (1..attempt).fold(self.initial_interval, |delay, _| {
            Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier)
                .map_or(self.max_interval, |next| next.min(self.max_interval))
        })
    }

    fn from_properties(bag: &PropertyBag) -> Result<Self, BinderDomainError> {
        let defaults = Self::default();
        let mut policy = defaults;
        if let Some(attempts) = bag.parse::<u32>(MAX_ATTEMPTS)? {
            policy.max_attempts = NonZeroU32::new(attempts).ok_or_else(|| {
                BinderDomainError::invalid_property(MAX_ATTEMPTS, "0", "must be at least 1")
            })?;
        }
        policy.with_back_off(
            bag.millis(BACK_OFF_INITIAL_INTERVAL)?
                .unwrap_or(defaults.initial_interval),
            bag.parse::<f64>(BACK_OFF_MULTIPLIER)?
                .unwrap_or(defaults.multiplier),
            bag.millis(BACK_OFF_MAX_INTERVAL)?
                .unwrap_or(defaults.max_interval),
        )
    }
}

/// Settings for a producer binding.
#[derive(Debug, Clone)]
pub struct ProducerProperties {
    partitioned: bool,
    partition_count: i64,
    partition_key: Option<PartitionKeyRule>,
    header_mode: HeaderMode,
    embedded_headers: Vec<String>,
    content_type: Option<ContentType>,
}

impl Default for ProducerProperties {
    fn default() -> Self {
        Self {
            partitioned: false,
            partition_count: 1,
            partition_key: None,
            header_mode: HeaderMode::default(),
            embedded_headers: Vec::new(),
            content_type: None,
        }
    }
}

impl ProducerProperties {
    /// Creates unpartitioned producer settings with embedded headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses producer settings from a property bag.
    ///
    /// Recognized keys: `partitioned`, `count`/`partitionCount`,
    /// `partitionKeyExpression`, `headerMode`, `headers` and `contentType`.
    /// A key expression implies `partitioned`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError`] when a value does not parse.
    pub fn from_properties(bag: &PropertyBag) -> Result<Self, BinderDomainError> {
        let defaults = Self::default();
        let partition_key = bag
            .get(PARTITION_KEY_EXPRESSION)
            .map(PartitionKeyRule::parse_expression)
            .transpose()?;
        let partitioned =
            bag.parse::<bool>(PARTITIONED)?.unwrap_or(false) || partition_key.is_some();
        let partition_count = match bag.parse::<i64>(PARTITION_COUNT)? {
            Some(count) => count,
            None => bag.parse::<i64>(COUNT)?.unwrap_or(defaults.partition_count),
        };
        let content_type = bag
            .get(CONTENT_TYPE)
            .map(|raw| {
                ContentType::parse(raw).map_err(|err| {
                    BinderDomainError::invalid_property(CONTENT_TYPE, raw, err.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            partitioned,
            partition_count,
            partition_key,
            header_mode: bag.parse(HEADER_MODE)?.unwrap_or_default(),
            embedded_headers: bag.get(HEADERS).map(split_names).unwrap_or_default(),
            content_type,
        })
    }

    /// Returns these settings partitioned over `count` partitions.
    ///
    /// The count is validated when the producer is bound.
    #[must_use]
    pub const fn partitioned(mut self, count: i64) -> Self {
        self.partitioned = true;
        self.partition_count = count;
        self
    }

    /// Returns these settings with a partition key rule.
    #[must_use]
    pub fn with_partition_key(mut self, rule: PartitionKeyRule) -> Self {
        self.partition_key = Some(rule);
        self
    }

    /// Returns these settings with a different header mode.
    #[must_use]
    pub const fn with_header_mode(mut self, header_mode: HeaderMode) -> Self {
        self.header_mode = header_mode;
        self
    }

    /// Returns these settings embedding only the named headers.
    #[must_use]
    pub fn with_embedded_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.embedded_headers = names.into_iter().map(Into::into).collect();
        self
    }

    /// Returns these settings with a default content type for messages
    /// that carry none.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Returns whether messages are routed to partitions.
    #[must_use]
    pub const fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    /// Returns the configured header mode.
    #[must_use]
    pub const fn header_mode(&self) -> HeaderMode {
        self.header_mode
    }

    /// Returns the header names to embed; empty means all headers.
    #[must_use]
    pub fn embedded_headers(&self) -> &[String] {
        &self.embedded_headers
    }

    /// Returns the default content type.
    #[must_use]
    pub const fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    /// Builds the partition router for a partitioned producer.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError::Partition`] when the partition count is
    /// not a positive 32-bit integer.
    pub fn partition_router(&self) -> Result<Option<PartitionRouter>, BinderDomainError> {
        if !self.partitioned {
            return Ok(None);
        }
        let count = PartitionCount::new(self.partition_count)?;
        Ok(Some(PartitionRouter::new(self.partition_key.clone(), count)))
    }
}

/// Settings for a consumer binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumerProperties {
    concurrency: NonZeroUsize,
    header_mode: HeaderMode,
    retry: RetryPolicy,
    malformed_envelope_policy: MalformedEnvelopePolicy,
}

impl Default for ConsumerProperties {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::MIN,
            header_mode: HeaderMode::default(),
            retry: RetryPolicy::default(),
            malformed_envelope_policy: MalformedEnvelopePolicy::default(),
        }
    }
}

impl ConsumerProperties {
    /// Creates single-threaded consumer settings with embedded headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses consumer settings from a property bag.
    ///
    /// Recognized keys: `concurrency`, `headerMode`, `maxAttempts`,
    /// `backOffInitialInterval`, `backOffMultiplier`, `backOffMaxInterval`
    /// (intervals in milliseconds) and `malformedEnvelopePolicy`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError`] when a value does not parse or is out of
    /// range.
    pub fn from_properties(bag: &PropertyBag) -> Result<Self, BinderDomainError> {
        let concurrency = match bag.parse::<usize>(CONCURRENCY)? {
            Some(value) => NonZeroUsize::new(value).ok_or_else(|| {
                BinderDomainError::invalid_property(CONCURRENCY, "0", "must be at least 1")
            })?,
            None => NonZeroUsize::MIN,
        };
        Ok(Self {
            concurrency,
            header_mode: bag.parse(HEADER_MODE)?.unwrap_or_default(),
            retry: RetryPolicy::from_properties(bag)?,
            malformed_envelope_policy: bag.parse(MALFORMED_ENVELOPE_POLICY)?.unwrap_or_default(),
        })
    }

    /// Returns these settings with a different number of concurrent
    /// deliveries.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Returns these settings with a different header mode.
    #[must_use]
    pub const fn with_header_mode(mut self, header_mode: HeaderMode) -> Self {
        self.header_mode = header_mode;
        self
    }

    /// Returns these settings with a different retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns these settings with a different malformed-envelope policy.
    #[must_use]
    pub const fn with_malformed_envelope_policy(mut self, policy: MalformedEnvelopePolicy) -> Self {
        self.malformed_envelope_policy = policy;
        self
    }

    /// Returns the number of concurrent deliveries.
    #[must_use]
    pub const fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    /// Returns the configured header mode.
    #[must_use]
    pub const fn header_mode(&self) -> HeaderMode {
        self.header_mode
    }

    /// Returns the delivery retry policy.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Returns the malformed-envelope policy.
    #[must_use]
    pub const fn malformed_envelope_policy(&self) -> MalformedEnvelopePolicy {
        self.malformed_envelope_policy
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}
