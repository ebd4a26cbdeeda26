//! Event construction and click classification.

use crate::core::page::Location;
use crate::core::state::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Stamps raw interactions into typed events.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    user_agent: String,
}

impl EventBuffer {
    /// Create a buffer stamping `user_agent` onto every event.
    #[must_use]
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
        }
    }

    /// Build an event with the denormalized context attached.
    #[must_use]
    pub fn stamp(
        &self,
        session_id: &str,
        location: &Location,
        event_type: &str,
        fields: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Event {
        Event {
            event_type: event_type.to_string(),
            ts: now.timestamp(),
            url: location.href.clone(),
            session_id: session_id.to_string(),
            page_type: location.category(),
            ua: self.user_agent.clone(),
            fields,
        }
    }
}

/// Semantic label for a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    /// Product added to cart.
    AddToCart,
    /// Product saved to a wishlist.
    Wishlist,
    /// Listing filter toggled.
    Filter,
}

impl ClickAction {
    /// Wire label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddToCart => "add_to_cart",
            Self::Wishlist => "wishlist",
            Self::Filter => "filter",
        }
    }
}

/// One DOM element as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,

    /// `id` attribute.
    pub id: Option<String>,

    /// Class list.
    pub classes: Vec<String>,

    /// Other attributes (`name`, `type`, `action`, `aria-label`, `data-*`).
    pub attributes: BTreeMap<String, String>,

    /// Text content.
    pub text: Option<String>,
}

impl Element {
    fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn text_contains(&self, needle: &str) -> bool {
        self.text
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(needle))
    }
}

/// Clicked element followed by its ancestors up to the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClickTarget {
    /// Target first.
    pub path: Vec<Element>,
}

impl ClickTarget {
    /// Closest element (self or ancestor) matching `pred`.
    fn closest(&self, pred: impl Fn(&Element) -> bool) -> Option<(usize, &Element)> {
        self.path.iter().enumerate().find(|&(_, e)| pred(e))
    }

    fn any(&self, pred: impl Fn(&Element) -> bool) -> bool {
        self.closest(pred).is_some()
    }

    /// Text check on the nearest button or link.
    fn control_text_contains(&self, needle: &str) -> bool {
        self.closest(|e| e.is("button") || e.is("a"))
            .is_some_and(|(_, e)| e.text_contains(needle))
    }
}

/// Turns a click target into a semantic action.
pub trait ClickClassifier: Send + Sync {
    /// `None` means the click is not recorded.
    fn classify(&self, target: &ClickTarget) -> Option<ClickAction>;
}

/// Heuristics for common storefront themes. First match wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThemeClassifier;

impl ThemeClassifier {
    fn is_add_to_cart(target: &ClickTarget) -> bool {
        let submit_in_cart_form = target.path.iter().enumerate().any(|(i, e)| {
            e.is("button")
                && e.attr("type") == Some("submit")
                && target.path[i + 1..].iter().any(|a| {
                    a.is("form") && a.attr("action").is_some_and(|act| act.contains("/cart/add"))
                })
        });
        submit_in_cart_form
            || target.any(|e| {
                e.is("button")
                    && (e.attr("name") == Some("add")
                        || e.has_class("add-to-cart")
                        || e.id.as_deref() == Some("AddToCart"))
            })
            || target.control_text_contains("add to cart")
    }

    fn is_wishlist(target: &ClickTarget) -> bool {
        target.any(|e| {
            e.attributes.contains_key("data-wishlist")
                || e.has_class("wishlist")
                || (e.is("button")
                    && e
                        .attr("aria-label")
                        .is_some_and(|l| l.to_lowercase().contains("wishlist")))
        }) || target.control_text_contains("wishlist")
    }

    fn is_filter(target: &ClickTarget) -> bool {
        target.any(|e| {
            e.attributes.contains_key("data-filter")
                || e.has_class("facets__item")
                || e.has_class("filter")
                || e.attr("name").is_some_and(|n| n.contains("filter"))
        })
    }
}

impl ClickClassifier for ThemeClassifier {
    fn classify(&self, target: &ClickTarget) -> Option<ClickAction> {
        if Self::is_add_to_cart(target) {
            Some(ClickAction::AddToCart)
        } else if Self::is_wishlist(target) {
            Some(ClickAction::Wishlist)
        } else if Self::is_filter(target) {
            Some(ClickAction::Filter)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(tag: &str) -> Element {
        Element {
            tag: tag.to_string(),
            ..Element::default()
        }
    }

    fn with_attr(mut e: Element, name: &str, value: &str) -> Element {
        e.attributes.insert(name.to_string(), value.to_string());
        e
    }

    fn target(path: Vec<Element>) -> ClickTarget {
        ClickTarget { path }
    }

    #[test]
    fn submit_inside_cart_form_is_add_to_cart() {
        let span = element("span");
        let button = with_attr(element("button"), "type", "submit");
        let form = with_attr(element("form"), "action", "/cart/add");
        let click = target(vec![span, button, form, element("body")]);
        assert_eq!(ThemeClassifier.classify(&click), Some(ClickAction::AddToCart));
    }

    #[test]
    fn submit_outside_cart_form_is_not_add_to_cart() {
        let button = with_attr(element("button"), "type", "submit");
        let form = with_attr(element("form"), "action", "/search");
        let click = target(vec![button, form]);
        assert_eq!(ThemeClassifier.classify(&click), None);
    }

    #[test]
    fn add_to_cart_by_id_and_text() {
        let mut by_id = element("button");
        by_id.id = Some("AddToCart".to_string());
        assert_eq!(
            ThemeClassifier.classify(&target(vec![by_id])),
            Some(ClickAction::AddToCart)
        );

        let mut link = element("a");
        link.text = Some("  Add to Cart  ".to_string());
        assert_eq!(
            ThemeClassifier.classify(&target(vec![element("span"), link])),
            Some(ClickAction::AddToCart)
        );
    }

    #[test]
    fn wishlist_by_aria_label_is_case_insensitive() {
        let button = with_attr(element("button"), "aria-label", "Add to WishList");
        assert_eq!(
            ThemeClassifier.classify(&target(vec![button])),
            Some(ClickAction::Wishlist)
        );
    }

    #[test]
    fn wishlist_by_data_attribute_on_ancestor() {
        let icon = element("svg");
        let wrapper = with_attr(element("div"), "data-wishlist", "");
        assert_eq!(
            ThemeClassifier.classify(&target(vec![icon, wrapper])),
            Some(ClickAction::Wishlist)
        );
    }

    #[test]
    fn filter_by_class_or_name() {
        let mut facet = element("li");
        facet.classes = vec!["facets__item".to_string()];
        assert_eq!(
            ThemeClassifier.classify(&target(vec![facet])),
            Some(ClickAction::Filter)
        );

        let input = with_attr(element("input"), "name", "filter.v.price");
        assert_eq!(
            ThemeClassifier.classify(&target(vec![input])),
            Some(ClickAction::Filter)
        );
    }

    #[test]
    fn add_to_cart_wins_over_wishlist() {
        let mut button = element("button");
        button.classes = vec!["add-to-cart".to_string(), "wishlist".to_string()];
        assert_eq!(
            ThemeClassifier.classify(&target(vec![button])),
            Some(ClickAction::AddToCart)
        );
    }

    #[test]
    fn unclassified_click_is_ignored() {
        let click = target(vec![element("img"), element("div"), element("body")]);
        assert_eq!(ThemeClassifier.classify(&click), None);
    }

    #[test]
    fn click_target_deserializes_from_path() {
        let click: ClickTarget = serde_json::from_value(json!([
            {"tag": "span"},
            {"tag": "button", "attributes": {"name": "add"}}
        ]))
        .unwrap();
        assert_eq!(click.path.len(), 2);
        assert_eq!(ThemeClassifier.classify(&click), Some(ClickAction::AddToCart));
    }

    #[test]
    fn stamp_attaches_context() {
        let buffer = EventBuffer::new("Mozilla/5.0");
        let location = Location::from_href("https://shop.example.com/cart");
        let now = DateTime::from_timestamp(1_700_000_123, 0).unwrap();
        let mut fields = Map::new();
        fields.insert("state".to_string(), json!("hidden"));

        let event = buffer.stamp("s-1", &location, "visibility", fields, now);
        assert_eq!(event.ts, 1_700_000_123);
        assert_eq!(event.session_id, "s-1");
        assert_eq!(event.page_type, crate::core::page::PageCategory::Cart);
        assert_eq!(event.ua, "Mozilla/5.0");
        assert_eq!(event.fields["state"], "hidden");
    }
}
