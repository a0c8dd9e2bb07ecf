//! Schema-ordered JSON_IETF (RFC 7951) encoding of a configuration tree.
//!
//! The document has a single member, `openconfig-telemetry:telemetry-system`,
//! holding `sensor-groups` and `subscriptions/persistent`. Every list entry
//! carries its key leaf followed by a `config` container with the key and the
//! entry's config leaves, then its child containers. Member order always
//! follows the schema registry, so equal trees encode to equal bytes.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::EncodeError;
use crate::schema::{CONFIG_CONTAINER, EntityDef, EntityKind, LeafValue, Schema};
use crate::tree::{ConfigurationTree, SensorGroup, SensorProfile, Subscription, SubscriptionId};

/// Payload encoding understood by the remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// RFC 7951 JSON encoding of YANG data.
    JsonIetf,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::JsonIetf => "json_ietf",
        }
    }
}

/// Encoded configuration tree, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    encoding: Encoding,
    bytes: Vec<u8>,
}

impl Payload {
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The payload as text, for logging.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Encode a tree as compact JSON_IETF.
///
/// The tree is validated again first, since it may not come from the builder.
pub fn encode(tree: &ConfigurationTree) -> Result<Payload, EncodeError> {
    let document = document(tree)?;
    let bytes = serde_json::to_vec(&document)?;

    tracing::debug!(
        bytes = bytes.len(),
        sensor_groups = tree.sensor_groups().len(),
        subscriptions = tree.subscriptions().len(),
        "Encoded telemetry configuration"
    );

    Ok(Payload {
        encoding: Encoding::JsonIetf,
        bytes,
    })
}

/// Encode a tree as indented JSON_IETF, for display.
pub fn encode_pretty(tree: &ConfigurationTree) -> Result<String, EncodeError> {
    let document = document(tree)?;
    Ok(serde_json::to_string_pretty(&document)?)
}

fn document(tree: &ConfigurationTree) -> Result<Node<'_>, EncodeError> {
    tree.validate()?;

    let groups = tree
        .sensor_groups()
        .iter()
        .map(sensor_group_entry)
        .collect::<Result<Vec<_>, _>>()?;
    let subscriptions = tree
        .subscriptions()
        .iter()
        .map(subscription_entry)
        .collect::<Result<Vec<_>, _>>()?;

    let system = Node::Container(vec![
        wrap_list(Schema::entity(EntityKind::SensorGroup), groups),
        wrap_list(Schema::entity(EntityKind::Subscription), subscriptions),
    ]);

    Ok(Node::Container(vec![(
        Member::Owned(Schema::root_member()),
        system,
    )]))
}

fn sensor_group_entry(group: &SensorGroup) -> Result<Node<'_>, EncodeError> {
    let path_def = Schema::entity(EntityKind::SensorPath);
    let paths = group
        .paths()
        .iter()
        .map(|path| list_entry(path_def, &[Some(LeafValue::Str(path.as_str()))], Vec::new()))
        .collect::<Result<Vec<_>, _>>()?;

    list_entry(
        Schema::entity(EntityKind::SensorGroup),
        &[Some(LeafValue::Str(group.id()))],
        vec![wrap_list(path_def, paths)],
    )
}

fn subscription_entry(sub: &Subscription) -> Result<Node<'_>, EncodeError> {
    let profile_def = Schema::entity(EntityKind::SensorProfile);
    let profiles = sub
        .profiles()
        .iter()
        .map(|profile| list_entry(profile_def, &profile_leaves(profile), Vec::new()))
        .collect::<Result<Vec<_>, _>>()?;

    let key = match sub.id() {
        SubscriptionId::Numeric(n) => Leaf::Number(*n),
        SubscriptionId::Named(name) => Leaf::Value(LeafValue::Str(name.as_str())),
    };

    keyed_entry(
        Schema::entity(EntityKind::Subscription),
        key,
        Vec::new(),
        vec![wrap_list(profile_def, profiles)],
    )
}

// Aligned with the sensor-profile config leaves of the registry.
fn profile_leaves(profile: &SensorProfile) -> [Option<LeafValue<'_>>; 4] {
    [
        Some(LeafValue::Str(profile.sensor_group_id())),
        Some(LeafValue::U64(profile.sample_interval_ms())),
        profile.heartbeat_interval_ms().map(LeafValue::U64),
        profile.suppress_redundant().map(LeafValue::Bool),
    ]
}

/// Build a list entry whose values are aligned with `def.config`.
fn list_entry<'a>(
    def: &'static EntityDef,
    values: &[Option<LeafValue<'a>>],
    children: Vec<(Member, Node<'a>)>,
) -> Result<Node<'a>, EncodeError> {
    let Some(Some(key)) = values.first().copied() else {
        return Err(EncodeError::MissingKey(def.list));
    };
    keyed_entry(def, Leaf::Value(key), values[1..].to_vec(), children)
}

fn keyed_entry<'a>(
    def: &'static EntityDef,
    key: Leaf<'a>,
    rest: Vec<Option<LeafValue<'a>>>,
    children: Vec<(Member, Node<'a>)>,
) -> Result<Node<'a>, EncodeError> {
    let key_name = def.key().name;

    let mut config = vec![(Member::Static(key_name), Node::Leaf(key))];
    for (leaf, value) in def.config[1..].iter().zip(rest) {
        if let Some(value) = value {
            config.push((Member::Static(leaf.name), Node::Leaf(Leaf::Value(value))));
        }
    }

    let mut members = vec![
        (Member::Static(key_name), Node::Leaf(key)),
        (Member::Static(CONFIG_CONTAINER), Node::Container(config)),
    ];
    members.extend(children);
    Ok(Node::Container(members))
}

/// Nest list entries inside the entity's containers.
fn wrap_list<'a>(def: &'static EntityDef, entries: Vec<Node<'a>>) -> (Member, Node<'a>) {
    let list = Node::List(entries);
    let Some((outermost, inner)) = def.containers.split_first() else {
        return (Member::Static(def.list), list);
    };
    let mut node = Node::Container(vec![(Member::Static(def.list), list)]);
    for container in inner.iter().rev() {
        node = Node::Container(vec![(Member::Static(*container), node)]);
    }
    (Member::Static(*outermost), node)
}

enum Member {
    Static(&'static str),
    Owned(String),
}

impl Member {
    fn as_str(&self) -> &str {
        match self {
            Member::Static(s) => *s,
            Member::Owned(s) => s.as_str(),
        }
    }
}

#[derive(Clone, Copy)]
enum Leaf<'a> {
    Value(LeafValue<'a>),
    /// Numeric key rendered as a decimal string.
    Number(u64),
}

enum Node<'a> {
    Leaf(Leaf<'a>),
    Container(Vec<(Member, Node<'a>)>),
    List(Vec<Node<'a>>),
}

impl Serialize for Leaf<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Leaf::Value(LeafValue::Str(s)) => serializer.serialize_str(s),
            // RFC 7951 6.1: 64-bit integers are JSON strings.
            Leaf::Value(LeafValue::U64(n)) | Leaf::Number(n) => {
                serializer.collect_str(n)
            }
            Leaf::Value(LeafValue::Bool(b)) => serializer.serialize_bool(*b),
        }
    }
}

impl Serialize for Node<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Leaf(leaf) => leaf.serialize(serializer),
            Node::Container(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (name, node) in members {
                    map.serialize_entry(name.as_str(), node)?;
                }
                map.end()
            }
            Node::List(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for entry in entries {
                    seq.serialize_element(entry)?;
                }
                seq.end()
            }
        }
    }
}
