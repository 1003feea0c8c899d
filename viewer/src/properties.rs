use serde::Serialize;
use watchless::frontmatter::{PropertyMap, PropertyValue};

/// Marker that makes a scalar render as an internal link.
const WIKI_MARKER: &str = "[[";

/// Icon category shown next to a property key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyIcon {
    TagLike,
    LinkSource,
    Generic,
}

impl PropertyIcon {
    pub fn for_key(key: &str) -> Self {
        match key {
            "tags" | "categories" => PropertyIcon::TagLike,
            "url" => PropertyIcon::LinkSource,
            _ => PropertyIcon::Generic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValueView {
    /// One pill per list element, verbatim.
    Pills(Vec<String>),
    /// A scalar containing `[[`, shown verbatim with link styling.
    InternalLink(String),
    Plain(String),
}

impl PropertyValueView {
    pub fn for_value(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::List(items) => PropertyValueView::Pills(items.clone()),
            PropertyValue::Scalar(s) if s.contains(WIKI_MARKER) => {
                PropertyValueView::InternalLink(s.clone())
            }
            PropertyValue::Scalar(s) => PropertyValueView::Plain(s.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRow {
    pub key: String,
    pub icon: PropertyIcon,
    pub value: PropertyValueView,
}

/// The properties panel: one row per front-matter entry, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyPanel {
    pub rows: Vec<PropertyRow>,
}

/// Build the properties panel, or `None` when there are no properties.
pub fn render_properties(properties: &PropertyMap) -> Option<PropertyPanel> {
    if properties.is_empty() {
        return None;
    }
    let rows = properties
        .iter()
        .map(|(key, value)| PropertyRow {
            key: key.to_string(),
            icon: PropertyIcon::for_key(key),
            value: PropertyValueView::for_value(value),
        })
        .collect();
    Some(PropertyPanel { rows })
}

#[cfg(test)]
mod tests {
    use watchless::frontmatter::split;

    use super::*;

    #[test]
    fn empty_map_renders_nothing() {
        assert_eq!(render_properties(&PropertyMap::new()), None);
    }

    #[test]
    fn rows_follow_declaration_order_with_icons() {
        let split = split(
            "---\ntitle: \"Talk\"\ntags: [rust, video]\nurl: https://youtu.be/x\ncategories: ['notes']\nrelated: \"[[Other Note]]\"\n---\n",
        );
        let panel = render_properties(&split.properties).unwrap();
        let rows: Vec<_> = panel
            .rows
            .iter()
            .map(|r| (r.key.as_str(), r.icon, r.value.clone()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("title", PropertyIcon::Generic, PropertyValueView::Plain("Talk".into())),
                (
                    "tags",
                    PropertyIcon::TagLike,
                    PropertyValueView::Pills(vec!["rust".into(), "video".into()])
                ),
                (
                    "url",
                    PropertyIcon::LinkSource,
                    PropertyValueView::Plain("https://youtu.be/x".into())
                ),
                (
                    "categories",
                    PropertyIcon::TagLike,
                    PropertyValueView::Pills(vec!["notes".into()])
                ),
                (
                    "related",
                    PropertyIcon::Generic,
                    PropertyValueView::InternalLink("[[Other Note]]".into())
                ),
            ]
        );
    }

    #[test]
    fn icon_classification_is_exact_match() {
        assert_eq!(PropertyIcon::for_key("Tags"), PropertyIcon::Generic);
        assert_eq!(PropertyIcon::for_key("urls"), PropertyIcon::Generic);
    }

    #[test]
    fn list_items_with_wiki_markers_stay_pills() {
        let value = PropertyValue::List(vec!["[[A]]".into()]);
        assert_eq!(
            PropertyValueView::for_value(&value),
            PropertyValueView::Pills(vec!["[[A]]".into()])
        );
    }
}
