//! Node Lowering Module for the storyboard compiler.
//!
//! Turns the nested element-construction calls of a component tree
//! (`jsx(type, config)`) into storyboard descriptors. Every call is pure and
//! returns its descriptor synchronously; children are lowered before their parent.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use serde_json::Value;
use std::collections::HashSet;
use tracing::trace;

use crate::descriptor::{
    slot_name, Brick, Child, Component, Config, ConfigValue, Descriptor, ElementType, Lowered,
    Properties, Route, RouteBody, SlotBucket, Slots, TEXT_CONTENT,
};
use crate::error::LowerError;

const PROP_NAMESPACE: &str = "prop:";
const CONF_NAMESPACE: &str = "conf:";

lazy_static! {
    /// Keys that belong to the descriptor itself rather than to its properties.
    pub static ref RESERVED_KEYS: HashSet<&'static str> =
        ["events", "lifeCycle", "if", "portal", "ref"].into_iter().collect();
}

/// Where one configuration key of a generic element goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigKey<'k> {
    Property(&'k str),
    Reserved(&'k str),
    Slot,
    Children,
}

fn classify_key(key: &str) -> Result<ConfigKey<'_>, LowerError> {
    if key.contains(':') {
        if let Some(name) = key.strip_prefix(PROP_NAMESPACE) {
            return Ok(ConfigKey::Property(name));
        }
        if let Some(name) = key.strip_prefix(CONF_NAMESPACE) {
            return Ok(ConfigKey::Reserved(name));
        }
        return Err(LowerError::UnsupportedNamespace(key.to_string()));
    }
    Ok(match key {
        "slot" => ConfigKey::Slot,
        "children" => ConfigKey::Children,
        k if RESERVED_KEYS.contains(k) => ConfigKey::Reserved(k),
        k => ConfigKey::Property(k),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lower one element-construction call.
pub fn jsx(element_type: ElementType, config: Config) -> Result<Lowered, LowerError> {
    match element_type {
        ElementType::Fragment => lower_fragment(config),
        ElementType::Route => lower_route(config).map(Lowered::from),
        ElementType::Component => lower_component(config).map(Lowered::Component),
        ElementType::LegacyTemplate => Ok(Lowered::Descriptor(Descriptor::Raw(config.into_value()))),
        ElementType::Tag(name) => lower_element(name.replace('_', "."), config).map(Lowered::from),
        ElementType::Reference(name) => lower_element(name, config).map(Lowered::from),
        ElementType::ForEach => lower_control(":forEach", config).map(Lowered::from),
        ElementType::If => lower_control(":if", config).map(Lowered::from),
        ElementType::Switch => lower_control(":switch", config).map(Lowered::from),
    }
}

/// Static-children variant of [`jsx`]; the lowering is identical.
pub fn jsxs(element_type: ElementType, config: Config) -> Result<Lowered, LowerError> {
    jsx(element_type, config)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHILDREN
// ═══════════════════════════════════════════════════════════════════════════════

/// Flatten arbitrarily nested children into one descriptor list.
///
/// Text becomes a `span` leaf, fragments are spliced in place, and when `slot`
/// is given it overrides the slot of every resulting child.
pub fn fix_brick_children(children: Child, slot: Option<&str>) -> Result<Vec<Descriptor>, LowerError> {
    let mut flat = Vec::new();
    flatten_into(children, &mut flat)?;
    if let Some(slot) = slot {
        for child in &mut flat {
            child.set_slot(slot);
        }
    }
    Ok(flat)
}

fn flatten_into(child: Child, out: &mut Vec<Descriptor>) -> Result<(), LowerError> {
    match child {
        Child::Empty => {}
        Child::Text(text) => out.push(Descriptor::Brick(Brick::text(text))),
        Child::Lowered(Lowered::Descriptor(descriptor)) => out.push(descriptor),
        Child::Lowered(Lowered::Fragment(descriptors)) => out.extend(descriptors),
        Child::Lowered(Lowered::Component(_)) => return Err(LowerError::ComponentChild),
        Child::List(items) => {
            for item in items {
                flatten_into(item, out)?;
            }
        }
    }
    Ok(())
}

/// Group children into slot buckets, first-seen slot order, author order inside a bucket.
///
/// The pending slot name is moved off each child, so no descriptor in the
/// result still carries one.
pub fn children_to_slots(children: Vec<Descriptor>) -> Result<Slots, LowerError> {
    let mut slots = Slots::new();
    for mut child in children {
        let slot = child.take_slot().unwrap_or_default();
        let bucket = slots
            .entry(slot.clone())
            .or_insert_with(|| SlotBucket::empty(child.slot_kind()));
        match (bucket, child) {
            (SlotBucket::Routes { routes }, Descriptor::Route(route)) => routes.push(route),
            (SlotBucket::Bricks { .. }, Descriptor::Route(_)) | (SlotBucket::Routes { .. }, _) => {
                return Err(LowerError::MixedSlot { slot });
            }
            (SlotBucket::Bricks { bricks }, child) => bricks.push(child),
        }
    }
    Ok(slots)
}

fn children_of(value: Option<ConfigValue>) -> Child {
    value.map(ConfigValue::into_child).unwrap_or(Child::Empty)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT KINDS
// ═══════════════════════════════════════════════════════════════════════════════

fn lower_fragment(mut config: Config) -> Result<Lowered, LowerError> {
    let slot = config.remove("slot").and_then(|v| slot_name(v.into_value()));
    let children = children_of(config.remove("children"));
    fix_brick_children(children, slot.as_deref()).map(Lowered::Fragment)
}

fn lower_element(brick: String, config: Config) -> Result<Brick, LowerError> {
    let mut properties = Properties::new();
    let mut reserved = IndexMap::new();
    let mut slot = None;
    let mut children = None;

    for (key, value) in config {
        match classify_key(&key)? {
            ConfigKey::Property(name) => {
                properties.insert(name.to_string(), value.into_value());
            }
            ConfigKey::Reserved(name) => {
                reserved.insert(name.to_string(), value.into_value());
            }
            ConfigKey::Slot => slot = slot_name(value.into_value()),
            ConfigKey::Children => children = Some(value),
        }
    }

    let mut slots = None;
    if let Some(children) = children.filter(ConfigValue::is_truthy) {
        match children.into_child() {
            Child::Text(text) => {
                properties.insert(TEXT_CONTENT.to_string(), Value::String(text));
            }
            other => {
                properties.shift_remove(TEXT_CONTENT);
                slots = Some(children_to_slots(fix_brick_children(other, None)?)?);
            }
        }
    }

    trace!(brick = %brick, properties = properties.len(), "lowered element");
    Ok(Brick {
        brick,
        properties: Some(properties),
        data_source: None,
        slots,
        slot,
        config: reserved,
    })
}

fn lower_control(tag: &str, config: Config) -> Result<Brick, LowerError> {
    let mut rest = IndexMap::new();
    let mut data_source = None;
    let mut slot = None;
    let mut children = None;

    for (key, value) in config {
        match key.as_str() {
            "children" => children = Some(value),
            "value" => data_source = Some(value.into_value()),
            "slot" => slot = slot_name(value.into_value()),
            _ => {
                rest.insert(key, value.into_value());
            }
        }
    }

    let bricks = fix_brick_children(children_of(children), None)?;
    Ok(Brick {
        brick: tag.to_string(),
        properties: None,
        data_source,
        slots: Some(children_to_slots(bricks)?),
        slot,
        config: rest,
    })
}

fn lower_route(mut config: Config) -> Result<Route, LowerError> {
    let route_type = config.get("type").and_then(ConfigValue::as_str).map(str::to_string);
    let slot = config.remove("slot").and_then(|v| slot_name(v.into_value()));

    let body = match route_type.as_deref() {
        Some("redirect") => RouteBody::Redirect,
        Some("routes") => {
            let children = children_of(config.remove("children"));
            let routes = fix_brick_children(children, None)?
                .into_iter()
                .map(|child| match child {
                    Descriptor::Route(route) => Ok(route),
                    _ => Err(LowerError::NonRouteChild),
                })
                .collect::<Result<Vec<_>, _>>()?;
            RouteBody::Routes(routes)
        }
        _ => {
            let view = children_of(config.remove("view"));
            RouteBody::Bricks(fix_brick_children(view, None)?)
        }
    };

    Ok(Route {
        config: config.into_values(),
        body,
        slot,
    })
}

fn lower_component(mut config: Config) -> Result<Component, LowerError> {
    let children = children_of(config.remove("children"));
    let bricks = fix_brick_children(children, None)?;
    Ok(Component {
        config: config.into_values(),
        bricks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_key() {
        assert_eq!(classify_key("label").unwrap(), ConfigKey::Property("label"));
        assert_eq!(classify_key("prop:if").unwrap(), ConfigKey::Property("if"));
        assert_eq!(classify_key("conf:foo").unwrap(), ConfigKey::Reserved("foo"));
        assert_eq!(classify_key("events").unwrap(), ConfigKey::Reserved("events"));
        assert_eq!(classify_key("slot").unwrap(), ConfigKey::Slot);
        assert_eq!(classify_key("children").unwrap(), ConfigKey::Children);
        assert_eq!(
            classify_key("on:click"),
            Err(LowerError::UnsupportedNamespace("on:click".to_string()))
        );
    }

    #[test]
    fn test_fix_children_flattens_nested_lists() {
        let children = Child::List(vec![
            Child::from("a"),
            Child::List(vec![Child::Empty, Child::from("b")]),
        ]);
        let flat = fix_brick_children(children, Some("x")).unwrap();
        assert_eq!(flat.len(), 2);
        assert!(flat.iter().all(|c| c.slot() == Some("x")));
        assert_eq!(flat[1].as_brick().unwrap().text_content(), Some("b"));
    }
}
