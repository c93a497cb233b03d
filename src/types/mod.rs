//! 类型模块：Overpass JSON 输出的强类型表示。
//!
//! # Types Module
//!
//! Strongly-typed representations of the `[out:json]` response format.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`OverpassJson`] | Top-level response document, including the `remark` error channel |
//! | [`Element`] | Node, way, relation, area, timeline or count element |
//! | [`PointGeom`] / [`Bbox`] | Geometry emitted by `out geom;`, `out center;` and `out bb;` |
//!
//! ## Example
//!
//! ```rust
//! use overpass_lib_rust::types::{Element, OverpassJson};
//!
//! let doc: OverpassJson = serde_json::from_str(r#"{
//!     "version": 0.6,
//!     "generator": "Overpass API",
//!     "elements": [{"type": "node", "id": 1, "lat": 51.5, "lon": -0.1}]
//! }"#).unwrap();
//!
//! assert!(matches!(doc.elements[0], Element::Node(_)));
//! ```

pub mod element;

pub use element::{
    Area, Bbox, Count, CountTags, Element, Node, OsmMeta, PointGeom, Relation, RelationMember,
    Timeline, TimelineTags, Way,
};

use serde::{Deserialize, Serialize};

/// Parsed `[out:json]` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverpassJson {
    #[serde(default)]
    pub version: f64,
    #[serde(default)]
    pub generator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm3s: Option<Osm3s>,
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Set when the server failed after the 200 status line was already sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Osm3s {
    pub timestamp_osm_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_areas_base: Option<String>,
    pub copyright: String,
}

impl OverpassJson {
    /// The remark, if it carries anything besides whitespace.
    pub fn runtime_remark(&self) -> Option<&str> {
        self.remark
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.elements.iter().filter_map(|e| match e {
            Element::Node(n) => Some(n),
            _ => None,
        })
    }

    pub fn ways(&self) -> impl Iterator<Item = &Way> {
        self.elements.iter().filter_map(|e| match e {
            Element::Way(w) => Some(w),
            _ => None,
        })
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.elements.iter().filter_map(|e| match e {
            Element::Relation(r) => Some(r),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_remark_is_not_a_runtime_error() {
        let doc: OverpassJson =
            serde_json::from_str(r#"{"version":0.6,"generator":"x","elements":[],"remark":"  "}"#)
                .unwrap();
        assert_eq!(doc.runtime_remark(), None);
    }

    #[test]
    fn filters_elements_by_kind() {
        let doc: OverpassJson = serde_json::from_str(
            r#"{
                "version": 0.6,
                "generator": "Overpass API 0.7.62",
                "osm3s": {"timestamp_osm_base": "2024-05-01T10:00:00Z", "copyright": "ODbL"},
                "elements": [
                    {"type": "node", "id": 1, "lat": 1.0, "lon": 2.0},
                    {"type": "way", "id": 2, "nodes": [1, 3]},
                    {"type": "relation", "id": 3, "members": [{"type": "way", "ref": 2, "role": "outer"}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.nodes().count(), 1);
        assert_eq!(doc.ways().next().map(|w| w.nodes.clone()), Some(vec![1, 3]));
        assert_eq!(doc.relations().next().map(|r| r.members.len()), Some(1));
        assert_eq!(
            doc.osm3s.as_ref().map(|o| o.copyright.as_str()),
            Some("ODbL")
        );
    }
}
