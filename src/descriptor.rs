//! Descriptor Model for the storyboard compiler.
//!
//! Build-time values produced by Node Lowering and consumed by the storyboard
//! serializer. Field names on the wire follow the renderer's storyboard format:
//! an element's kind serializes as `brick`, slot buckets as
//! `{ "type": "bricks", "bricks": [...] }` or `{ "type": "routes", "routes": [...] }`.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

pub type Properties = IndexMap<String, Value>;
pub type Slots = IndexMap<String, SlotBucket>;

pub const TEXT_BRICK: &str = "span";
pub const TEXT_CONTENT: &str = "textContent";

// ═══════════════════════════════════════════════════════════════════════════════
// BRICK
// ═══════════════════════════════════════════════════════════════════════════════

/// One declaratively described UI unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Brick {
    pub brick: String,
    /// Absent on control-flow nodes (`:forEach`, `:if`, `:switch`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Slots>,
    /// Pending placement in the parent's slot map. Moved out during bucketing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    /// Reserved configuration (`events`, `lifeCycle`, `if`, `portal`, `ref`, `conf:*`),
    /// or the pass-through configuration of a control-flow node.
    #[serde(flatten)]
    pub config: IndexMap<String, Value>,
}

impl Brick {
    pub fn new(brick: impl Into<String>) -> Self {
        Brick {
            brick: brick.into(),
            properties: Some(Properties::new()),
            data_source: None,
            slots: None,
            slot: None,
            config: IndexMap::new(),
        }
    }

    /// Synthetic inline leaf that carries a text child.
    pub fn text(text: impl Into<String>) -> Self {
        let mut brick = Brick::new(TEXT_BRICK);
        brick
            .properties
            .get_or_insert_with(Properties::new)
            .insert(TEXT_CONTENT.to_string(), Value::String(text.into()));
        brick
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|p| p.get(key))
    }

    pub fn text_content(&self) -> Option<&str> {
        self.property(TEXT_CONTENT).and_then(Value::as_str)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SLOT BUCKETS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Bricks,
    Routes,
}

/// Children attached under one slot name. All of them share one kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlotBucket {
    Bricks { bricks: Vec<Descriptor> },
    Routes { routes: Vec<Route> },
}

impl SlotBucket {
    pub fn empty(kind: SlotKind) -> Self {
        match kind {
            SlotKind::Bricks => SlotBucket::Bricks { bricks: vec![] },
            SlotKind::Routes => SlotBucket::Routes { routes: vec![] },
        }
    }

    pub fn kind(&self) -> SlotKind {
        match self {
            SlotBucket::Bricks { .. } => SlotKind::Bricks,
            SlotBucket::Routes { .. } => SlotKind::Routes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SlotBucket::Bricks { bricks } => bricks.len(),
            SlotBucket::Routes { routes } => routes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bricks(&self) -> Option<&[Descriptor]> {
        match self {
            SlotBucket::Bricks { bricks } => Some(bricks),
            SlotBucket::Routes { .. } => None,
        }
    }

    pub fn routes(&self) -> Option<&[Route]> {
        match self {
            SlotBucket::Routes { routes } => Some(routes),
            SlotBucket::Bricks { .. } => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTE
// ═══════════════════════════════════════════════════════════════════════════════

/// The three mutually exclusive route shapes, picked by the `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteBody {
    Redirect,
    Routes(Vec<Route>),
    Bricks(Vec<Descriptor>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Pass-through configuration (`path`, `type`, `redirect`, `exact`, ...).
    pub config: IndexMap<String, Value>,
    pub body: RouteBody,
    pub slot: Option<String>,
}

impl Route {
    pub fn path(&self) -> Option<&str> {
        self.config.get("path").and_then(Value::as_str)
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.config {
            map.serialize_entry(key, value)?;
        }
        match &self.body {
            RouteBody::Redirect => {}
            RouteBody::Routes(routes) => map.serialize_entry("routes", routes)?,
            RouteBody::Bricks(bricks) => map.serialize_entry("bricks", bricks)?,
        }
        if let Some(slot) = &self.slot {
            map.serialize_entry("slot", slot)?;
        }
        map.end()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A named reusable unit (`name`, `state`, `proxy`, ... pass through untouched).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    #[serde(flatten)]
    pub config: IndexMap<String, Value>,
    pub bricks: Vec<Descriptor>,
}

impl Component {
    pub fn name(&self) -> Option<&str> {
        self.config.get("name").and_then(Value::as_str)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOWERED VALUES
// ═══════════════════════════════════════════════════════════════════════════════

/// Anything that can sit in a slot bucket or a `bricks` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Descriptor {
    Brick(Brick),
    Route(Route),
    /// A legacy template or a pre-built object, carried verbatim.
    Raw(Value),
}

impl Descriptor {
    pub fn slot_kind(&self) -> SlotKind {
        match self {
            Descriptor::Route(_) => SlotKind::Routes,
            _ => SlotKind::Bricks,
        }
    }

    pub fn slot(&self) -> Option<&str> {
        match self {
            Descriptor::Brick(brick) => brick.slot.as_deref(),
            Descriptor::Route(route) => route.slot.as_deref(),
            Descriptor::Raw(value) => value.get("slot").and_then(Value::as_str),
        }
    }

    pub fn set_slot(&mut self, slot: &str) {
        match self {
            Descriptor::Brick(brick) => brick.slot = Some(slot.to_string()),
            Descriptor::Route(route) => route.slot = Some(slot.to_string()),
            Descriptor::Raw(Value::Object(map)) => {
                map.insert("slot".to_string(), Value::String(slot.to_string()));
            }
            Descriptor::Raw(_) => {}
        }
    }

    /// Remove and return the pending slot name.
    pub fn take_slot(&mut self) -> Option<String> {
        match self {
            Descriptor::Brick(brick) => brick.slot.take(),
            Descriptor::Route(route) => route.slot.take(),
            Descriptor::Raw(Value::Object(map)) => map.shift_remove("slot").and_then(slot_name),
            Descriptor::Raw(_) => None,
        }
    }

    pub fn as_brick(&self) -> Option<&Brick> {
        match self {
            Descriptor::Brick(brick) => Some(brick),
            _ => None,
        }
    }

    pub fn as_route(&self) -> Option<&Route> {
        match self {
            Descriptor::Route(route) => Some(route),
            _ => None,
        }
    }
}

/// Result of one element-construction call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Lowered {
    Descriptor(Descriptor),
    Fragment(Vec<Descriptor>),
    Component(Component),
}

impl Lowered {
    pub fn into_brick(self) -> Option<Brick> {
        match self {
            Lowered::Descriptor(Descriptor::Brick(brick)) => Some(brick),
            _ => None,
        }
    }

    pub fn into_route(self) -> Option<Route> {
        match self {
            Lowered::Descriptor(Descriptor::Route(route)) => Some(route),
            _ => None,
        }
    }

    pub fn into_component(self) -> Option<Component> {
        match self {
            Lowered::Component(component) => Some(component),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        // Descriptors only contain string-keyed maps, so this conversion can not fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<Brick> for Lowered {
    fn from(brick: Brick) -> Self {
        Lowered::Descriptor(Descriptor::Brick(brick))
    }
}

impl From<Route> for Lowered {
    fn from(route: Route) -> Self {
        Lowered::Descriptor(Descriptor::Route(route))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALL PROTOCOL INPUTS
// ═══════════════════════════════════════════════════════════════════════════════

/// The first argument of an element-construction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Fragment,
    Route,
    Component,
    ForEach,
    If,
    Switch,
    /// Deprecated escape hatch: the configuration is passed through untouched.
    LegacyTemplate,
    /// A plain element name such as `"my_tag"`.
    Tag(String),
    /// A callable component reference, resolved later by a component registry.
    Reference(String),
}

impl ElementType {
    pub fn tag(name: impl Into<String>) -> Self {
        ElementType::Tag(name.into())
    }
}

/// A child in the call tree, before flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Text(String),
    Lowered(Lowered),
    List(Vec<Child>),
    Empty,
}

impl Child {
    /// View plain JSON data in child position.
    pub fn from_value(value: Value) -> Child {
        match value {
            Value::String(text) => Child::Text(text),
            Value::Array(items) => Child::List(items.into_iter().map(Child::from_value).collect()),
            Value::Null | Value::Bool(_) => Child::Empty,
            // Numbers stay data: only a string child is text content.
            raw @ (Value::Number(_) | Value::Object(_)) => {
                Child::Lowered(Lowered::Descriptor(Descriptor::Raw(raw)))
            }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Child::Text(text) => Value::String(text),
            Child::Lowered(lowered) => lowered.to_value(),
            Child::List(items) => Value::Array(items.into_iter().map(Child::into_value).collect()),
            Child::Empty => Value::Null,
        }
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<Lowered> for Child {
    fn from(lowered: Lowered) -> Self {
        Child::Lowered(lowered)
    }
}

impl From<Brick> for Child {
    fn from(brick: Brick) -> Self {
        Child::Lowered(brick.into())
    }
}

impl From<Route> for Child {
    fn from(route: Route) -> Self {
        Child::Lowered(route.into())
    }
}

impl From<Vec<Child>> for Child {
    fn from(items: Vec<Child>) -> Self {
        Child::List(items)
    }
}

/// One configuration value: plain data or a subtree of the call tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Data(Value),
    Tree(Child),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Data(Value::String(s)) => Some(s),
            ConfigValue::Tree(Child::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Host-language truthiness, used to decide whether children are present.
    pub fn is_truthy(&self) -> bool {
        match self {
            ConfigValue::Data(Value::Null) | ConfigValue::Data(Value::Bool(false)) => false,
            ConfigValue::Data(Value::String(s)) => !s.is_empty(),
            ConfigValue::Data(Value::Number(n)) => n.as_f64().map_or(true, |n| n != 0.0),
            ConfigValue::Tree(Child::Empty) => false,
            ConfigValue::Tree(Child::Text(s)) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ConfigValue::Data(value) => value,
            ConfigValue::Tree(child) => child.into_value(),
        }
    }

    pub fn into_child(self) -> Child {
        match self {
            ConfigValue::Data(value) => Child::from_value(value),
            ConfigValue::Tree(child) => child,
        }
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        ConfigValue::Data(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Data(Value::String(value.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Data(Value::String(value))
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Data(Value::Bool(value))
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Data(Value::from(value))
    }
}

impl From<Child> for ConfigValue {
    fn from(child: Child) -> Self {
        ConfigValue::Tree(child)
    }
}

impl From<Lowered> for ConfigValue {
    fn from(lowered: Lowered) -> Self {
        ConfigValue::Tree(Child::Lowered(lowered))
    }
}

impl From<Vec<Child>> for ConfigValue {
    fn from(items: Vec<Child>) -> Self {
        ConfigValue::Tree(Child::List(items))
    }
}

/// The second argument of an element-construction call, in author order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    entries: IndexMap<String, ConfigValue>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn children(self, children: impl Into<Child>) -> Self {
        self.with("children", ConfigValue::Tree(children.into()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry as plain data, in order.
    pub fn into_values(self) -> IndexMap<String, Value> {
        self.entries
            .into_iter()
            .map(|(key, value)| (key, value.into_value()))
            .collect()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.into_values().into_iter().collect())
    }
}

impl IntoIterator for Config {
    type Item = (String, ConfigValue);
    type IntoIter = indexmap::map::IntoIter<String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, ConfigValue)> for Config {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Config {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Slot names are object keys on the wire; non-string values use their JSON spelling.
pub(crate) fn slot_name(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slot_bucket_wire_shape() {
        let bucket = SlotBucket::Bricks {
            bricks: vec![Descriptor::Brick(Brick::text("Hi"))],
        };
        assert_eq!(
            serde_json::to_value(&bucket).unwrap(),
            json!({ "type": "bricks", "bricks": [{ "brick": "span", "properties": { "textContent": "Hi" } }] })
        );
    }

    #[test]
    fn test_route_serializes_body_by_shape() {
        let mut config = IndexMap::new();
        config.insert("path".to_string(), json!("/home"));
        let route = Route {
            config,
            body: RouteBody::Bricks(vec![]),
            slot: None,
        };
        assert_eq!(
            serde_json::to_value(&route).unwrap(),
            json!({ "path": "/home", "bricks": [] })
        );
        assert_eq!(route.path(), Some("/home"));
    }

    #[test]
    fn test_raw_descriptor_slot_is_taken() {
        let mut raw = Descriptor::Raw(json!({ "template": "x", "slot": "footer" }));
        assert_eq!(raw.take_slot().as_deref(), Some("footer"));
        assert_eq!(raw, Descriptor::Raw(json!({ "template": "x" })));
    }

    #[test]
    fn test_data_in_child_position() {
        assert_eq!(Child::from_value(json!("a")), Child::Text("a".to_string()));
        assert_eq!(
            Child::from_value(json!(2)),
            Child::Lowered(Lowered::Descriptor(Descriptor::Raw(json!(2))))
        );
        assert_eq!(Child::from_value(json!(null)), Child::Empty);
        assert_eq!(
            Child::from_value(json!(["a", false])),
            Child::List(vec![Child::Text("a".to_string()), Child::Empty])
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!ConfigValue::from("").is_truthy());
        assert!(!ConfigValue::Data(json!(0)).is_truthy());
        assert!(!ConfigValue::Tree(Child::Empty).is_truthy());
        assert!(ConfigValue::Tree(Child::List(vec![])).is_truthy());
        assert!(ConfigValue::from("x").is_truthy());
    }
}
