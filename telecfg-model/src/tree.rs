//! Typed configuration entities.
//!
//! A [`ConfigurationTree`] owns its sensor groups and subscriptions. A
//! [`SensorProfile`] only names its sensor group; the group is resolved through
//! the tree that owns both.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schema::{EntityKind, LeafValue, Schema, Violation};

/// Schema node to sample, e.g. `Cisco-IOS-XR-nto-misc-oper:memory-summary/nodes/node/summary`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorPath(String);

impl SensorPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named, ordered set of sensor paths sampled together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorGroup {
    id: String,
    paths: Vec<SensorPath>,
}

impl SensorGroup {
    pub(crate) fn new(id: String, paths: Vec<SensorPath>) -> Self {
        Self { id, paths }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn paths(&self) -> &[SensorPath] {
        &self.paths
    }
}

/// Identifier of a persistent subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubscriptionId {
    Numeric(u64),
    Named(String),
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionId::Numeric(n) => write!(f, "{}", n),
            SubscriptionId::Named(name) => f.write_str(name),
        }
    }
}

impl From<u64> for SubscriptionId {
    fn from(id: u64) -> Self {
        SubscriptionId::Numeric(id)
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        SubscriptionId::Named(id.to_string())
    }
}

impl From<String> for SubscriptionId {
    fn from(id: String) -> Self {
        SubscriptionId::Named(id)
    }
}

/// Binding of a subscription to one sensor group and its sampling parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorProfile {
    sensor_group_id: String,
    sample_interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    heartbeat_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suppress_redundant: Option<bool>,
}

impl SensorProfile {
    pub fn new(sensor_group_id: impl Into<String>, sample_interval_ms: u64) -> Self {
        Self {
            sensor_group_id: sensor_group_id.into(),
            sample_interval_ms,
            heartbeat_interval_ms: None,
            suppress_redundant: None,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval_ms: u64) -> Self {
        self.heartbeat_interval_ms = Some(interval_ms);
        self
    }

    pub fn with_suppress_redundant(mut self, suppress: bool) -> Self {
        self.suppress_redundant = Some(suppress);
        self
    }

    pub fn sensor_group_id(&self) -> &str {
        &self.sensor_group_id
    }

    pub fn sample_interval_ms(&self) -> u64 {
        self.sample_interval_ms
    }

    pub fn heartbeat_interval_ms(&self) -> Option<u64> {
        self.heartbeat_interval_ms
    }

    pub fn suppress_redundant(&self) -> Option<bool> {
        self.suppress_redundant
    }
}

/// Named delivery policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    id: SubscriptionId,
    profiles: Vec<SensorProfile>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, profiles: Vec<SensorProfile>) -> Self {
        Self { id, profiles }
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    pub fn profiles(&self) -> &[SensorProfile] {
        &self.profiles
    }
}

/// Root of one telemetry configuration (`telemetry-system`).
///
/// This is the unit of transmission: the whole tree is encoded and applied
/// to a device at once. Trees built by [`crate::builder`] are always valid;
/// trees deserialized from elsewhere are checked again by the encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationTree {
    #[serde(default)]
    sensor_groups: Vec<SensorGroup>,
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

impl ConfigurationTree {
    pub(crate) fn from_parts(
        sensor_groups: Vec<SensorGroup>,
        subscriptions: Vec<Subscription>,
    ) -> Self {
        Self {
            sensor_groups,
            subscriptions,
        }
    }

    pub fn sensor_groups(&self) -> &[SensorGroup] {
        &self.sensor_groups
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Find a sensor group by id.
    pub fn sensor_group(&self, id: &str) -> Option<&SensorGroup> {
        self.sensor_groups.iter().find(|group| group.id == id)
    }

    /// Find a subscription by id.
    pub fn subscription(&self, id: &SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.iter().find(|sub| &sub.id == id)
    }

    /// Resolve the sensor group a profile refers to.
    pub fn resolve(&self, profile: &SensorProfile) -> Option<&SensorGroup> {
        self.sensor_group(&profile.sensor_group_id)
    }

    pub fn is_empty(&self) -> bool {
        self.sensor_groups.is_empty() && self.subscriptions.is_empty()
    }

    /// Check structural and referential invariants.
    ///
    /// Errors are reported for the first offending entity in tree order:
    /// sensor groups first, then subscriptions.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let group_key = Schema::entity(EntityKind::SensorGroup).key();
        let path_key = Schema::entity(EntityKind::SensorPath).key();

        let mut group_ids = HashSet::new();
        for group in &self.sensor_groups {
            if group_key.check(LeafValue::Str(&group.id)).is_err() {
                return Err(ValidationError::EmptyGroupId);
            }
            if !group_ids.insert(group.id.as_str()) {
                return Err(ValidationError::DuplicateGroupId(group.id.clone()));
            }
            if group.paths.is_empty() {
                return Err(ValidationError::EmptyPathSet(group.id.clone()));
            }

            let mut paths = HashSet::new();
            for path in &group.paths {
                if path_key.check(LeafValue::Str(path.as_str())).is_err() {
                    return Err(ValidationError::EmptyPath(group.id.clone()));
                }
                if !paths.insert(path.as_str()) {
                    return Err(ValidationError::DuplicatePath {
                        group: group.id.clone(),
                        path: path.0.clone(),
                    });
                }
            }
        }

        let profile_def = Schema::entity(EntityKind::SensorProfile);
        let mut subscription_ids = HashSet::new();
        for sub in &self.subscriptions {
            if let SubscriptionId::Named(name) = &sub.id {
                let key = Schema::entity(EntityKind::Subscription).key();
                if key.check(LeafValue::Str(name)).is_err() {
                    return Err(ValidationError::EmptySubscriptionId);
                }
            }
            // Both id flavours share one key leaf on the wire.
            let rendered = sub.id.to_string();
            if !subscription_ids.insert(rendered.clone()) {
                return Err(ValidationError::DuplicateSubscriptionId(rendered));
            }
            if sub.profiles.is_empty() {
                return Err(ValidationError::EmptyProfileSet(sub.id.to_string()));
            }

            let mut profiled = HashSet::new();
            for profile in &sub.profiles {
                let group = profile.sensor_group_id.as_str();
                if !group_ids.contains(group) {
                    return Err(ValidationError::UnknownSensorGroup {
                        subscription: sub.id.to_string(),
                        group: group.to_string(),
                    });
                }
                if !profiled.insert(group) {
                    return Err(ValidationError::DuplicateProfile {
                        subscription: sub.id.to_string(),
                        group: group.to_string(),
                    });
                }
                let interval = profile_def
                    .leaf("sample-interval")
                    .map(|leaf| leaf.check(LeafValue::U64(profile.sample_interval_ms)));
                if let Some(Err(Violation::BelowMinimum)) = interval {
                    return Err(ValidationError::NonPositiveInterval {
                        subscription: sub.id.to_string(),
                        group: group.to_string(),
                    });
                }
                let heartbeat = profile.heartbeat_interval_ms.and_then(|ms| {
                    profile_def
                        .leaf("heartbeat-interval")
                        .map(|leaf| leaf.check(LeafValue::U64(ms)))
                });
                if let Some(Err(Violation::BelowMinimum)) = heartbeat {
                    return Err(ValidationError::NonPositiveHeartbeat {
                        subscription: sub.id.to_string(),
                        group: group.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
