//! Construction of validated configuration trees.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::tree::{
    ConfigurationTree, SensorGroup, SensorPath, SensorProfile, Subscription, SubscriptionId,
};

/// Input for one sensor group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub id: String,
    pub paths: Vec<String>,
}

impl GroupSpec {
    pub fn new<I, S>(id: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

/// Input for one subscription with a single sensor profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    pub id: SubscriptionId,
    pub sensor_group: String,
    pub sample_interval_ms: u64,
    #[serde(default)]
    pub heartbeat_interval_ms: Option<u64>,
    #[serde(default)]
    pub suppress_redundant: Option<bool>,
}

impl SubscriptionSpec {
    pub fn new(
        id: impl Into<SubscriptionId>,
        sensor_group: impl Into<String>,
        sample_interval_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            sensor_group: sensor_group.into(),
            sample_interval_ms,
            heartbeat_interval_ms: None,
            suppress_redundant: None,
        }
    }

    fn profile(&self) -> SensorProfile {
        let mut profile = SensorProfile::new(self.sensor_group.clone(), self.sample_interval_ms);
        if let Some(heartbeat) = self.heartbeat_interval_ms {
            profile = profile.with_heartbeat_interval(heartbeat);
        }
        if let Some(suppress) = self.suppress_redundant {
            profile = profile.with_suppress_redundant(suppress);
        }
        profile
    }
}

/// Build a configuration tree from ordered group and subscription specs.
///
/// Input order is kept: it decides the encoding order of groups, paths and
/// subscriptions. Each subscription spec yields one subscription carrying one
/// sensor profile that names its own sensor group.
pub fn build(
    groups: &[GroupSpec],
    subscriptions: &[SubscriptionSpec],
) -> Result<ConfigurationTree, ValidationError> {
    let sensor_groups = groups
        .iter()
        .map(|spec| {
            SensorGroup::new(
                spec.id.clone(),
                spec.paths.iter().map(SensorPath::new).collect(),
            )
        })
        .collect();

    let subscriptions = subscriptions
        .iter()
        .map(|spec| Subscription::new(spec.id.clone(), vec![spec.profile()]))
        .collect();

    let tree = ConfigurationTree::from_parts(sensor_groups, subscriptions);
    tree.validate()?;

    tracing::debug!(
        sensor_groups = tree.sensor_groups().len(),
        subscriptions = tree.subscriptions().len(),
        "Built telemetry configuration tree"
    );

    Ok(tree)
}

/// Fluent front end for [`build`].
///
/// # Example
///
/// ```
/// use telecfg_model::TreeBuilder;
///
/// let tree = TreeBuilder::new()
///     .sensor_group("SGROUP1", ["openconfig-platform:components/component"])
///     .subscription(100, "SGROUP1", 30_000)
///     .build()
///     .unwrap();
/// assert_eq!(tree.subscriptions().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    groups: Vec<GroupSpec>,
    subscriptions: Vec<SubscriptionSpec>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sensor group with its paths, in order.
    pub fn sensor_group<I, S>(mut self, id: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.push(GroupSpec::new(id, paths));
        self
    }

    /// Add a subscription sampling one sensor group.
    pub fn subscription(
        mut self,
        id: impl Into<SubscriptionId>,
        sensor_group: impl Into<String>,
        sample_interval_ms: u64,
    ) -> Self {
        self.subscriptions
            .push(SubscriptionSpec::new(id, sensor_group, sample_interval_ms));
        self
    }

    /// Add a fully specified subscription.
    pub fn subscription_spec(mut self, spec: SubscriptionSpec) -> Self {
        self.subscriptions.push(spec);
        self
    }

    pub fn build(self) -> Result<ConfigurationTree, ValidationError> {
        build(&self.groups, &self.subscriptions)
    }
}
