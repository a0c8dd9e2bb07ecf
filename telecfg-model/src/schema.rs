//! Fixed schema registry for the `openconfig-telemetry` subset we configure.
//!
//! Every container name, list name, key leaf and the order of config leaves used
//! by the encoder comes from here. The first config leaf of every entity is its
//! list key.

/// YANG module that owns the configuration tree.
pub const MODULE: &str = "openconfig-telemetry";

/// Top-level container of the module.
pub const ROOT_CONTAINER: &str = "telemetry-system";

/// Name of the per-entry container holding the intended configuration.
pub const CONFIG_CONTAINER: &str = "config";

/// Configuration entities known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    SensorGroup,
    SensorPath,
    Subscription,
    SensorProfile,
}

/// YANG built-in type of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafType {
    String,
    Uint64,
    Boolean,
}

/// Value of a leaf as handed to the registry for checking and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafValue<'a> {
    Str(&'a str),
    U64(u64),
    Bool(bool),
}

impl LeafValue<'_> {
    pub fn leaf_type(&self) -> LeafType {
        match self {
            LeafValue::Str(_) => LeafType::String,
            LeafValue::U64(_) => LeafType::Uint64,
            LeafValue::Bool(_) => LeafType::Boolean,
        }
    }
}

/// Why a value does not satisfy a leaf definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    WrongType,
    Empty,
    BelowMinimum,
}

/// Definition of one config leaf.
#[derive(Debug, PartialEq, Eq)]
pub struct LeafDef {
    pub name: &'static str,
    pub leaf_type: LeafType,
    /// Strings must be non-empty.
    pub non_empty: bool,
    /// Inclusive lower bound for integers.
    pub min: Option<u64>,
}

impl LeafDef {
    const fn key(name: &'static str) -> Self {
        Self {
            name,
            leaf_type: LeafType::String,
            non_empty: true,
            min: None,
        }
    }

    const fn optional(name: &'static str, leaf_type: LeafType) -> Self {
        Self {
            name,
            leaf_type,
            non_empty: false,
            min: None,
        }
    }

    /// Check a value against this definition.
    pub fn check(&self, value: LeafValue<'_>) -> Result<(), Violation> {
        if value.leaf_type() != self.leaf_type {
            return Err(Violation::WrongType);
        }
        match value {
            LeafValue::Str(s) if self.non_empty && s.is_empty() => Err(Violation::Empty),
            LeafValue::U64(n) if self.min.is_some_and(|min| n < min) => {
                Err(Violation::BelowMinimum)
            }
            _ => Ok(()),
        }
    }
}

/// Definition of a keyed YANG list.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityDef {
    pub kind: EntityKind,
    /// Containers between the parent node and the list, outermost first.
    pub containers: &'static [&'static str],
    /// YANG list name.
    pub list: &'static str,
    /// Config leaves in schema order. The first one is the list key.
    pub config: &'static [LeafDef],
}

impl EntityDef {
    pub fn key(&self) -> &'static LeafDef {
        &self.config[0]
    }

    /// Look up a config leaf by name.
    pub fn leaf(&self, name: &str) -> Option<&'static LeafDef> {
        self.config.iter().find(|leaf| leaf.name == name)
    }
}

static SENSOR_GROUP: EntityDef = EntityDef {
    kind: EntityKind::SensorGroup,
    containers: &["sensor-groups"],
    list: "sensor-group",
    config: &[LeafDef::key("sensor-group-id")],
};

static SENSOR_PATH: EntityDef = EntityDef {
    kind: EntityKind::SensorPath,
    containers: &["sensor-paths"],
    list: "sensor-path",
    config: &[LeafDef::key("path")],
};

// Numeric subscription ids render as their decimal string, which is also the
// RFC 7951 form of a uint64, so one string key covers both id flavours.
static SUBSCRIPTION: EntityDef = EntityDef {
    kind: EntityKind::Subscription,
    containers: &["subscriptions", "persistent"],
    list: "subscription",
    config: &[LeafDef::key("subscription-id")],
};

static SENSOR_PROFILE: EntityDef = EntityDef {
    kind: EntityKind::SensorProfile,
    containers: &["sensor-profiles"],
    list: "sensor-profile",
    config: &[
        LeafDef::key("sensor-group"),
        LeafDef {
            name: "sample-interval",
            leaf_type: LeafType::Uint64,
            non_empty: false,
            min: Some(1),
        },
        LeafDef {
            name: "heartbeat-interval",
            leaf_type: LeafType::Uint64,
            non_empty: false,
            min: Some(1),
        },
        LeafDef::optional("suppress-redundant", LeafType::Boolean),
    ],
};

/// The fixed, pre-validated schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct Schema;

impl Schema {
    /// Definition of an entity.
    pub fn entity(kind: EntityKind) -> &'static EntityDef {
        match kind {
            EntityKind::SensorGroup => &SENSOR_GROUP,
            EntityKind::SensorPath => &SENSOR_PATH,
            EntityKind::Subscription => &SUBSCRIPTION,
            EntityKind::SensorProfile => &SENSOR_PROFILE,
        }
    }

    /// Qualified name of the root container, as used in JSON_IETF member names.
    pub fn root_member() -> String {
        format!("{}:{}", MODULE, ROOT_CONTAINER)
    }

    /// All entity definitions, parents before children.
    pub fn entities() -> [&'static EntityDef; 4] {
        [
            &SENSOR_GROUP,
            &SENSOR_PATH,
            &SUBSCRIPTION,
            &SENSOR_PROFILE,
        ]
    }
}
