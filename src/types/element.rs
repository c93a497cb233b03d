//! Element records of the `[out:json]` format.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry of `elements`, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
    Area(Area),
    Timeline(Timeline),
    Count(Count),
    /// Element kinds this crate does not model yet.
    #[serde(other)]
    Unknown,
}

impl Element {
    pub fn id(&self) -> Option<u64> {
        match self {
            Element::Node(n) => Some(n.id),
            Element::Way(w) => Some(w.id),
            Element::Relation(r) => Some(r.id),
            Element::Area(a) => Some(a.id),
            Element::Timeline(t) => Some(t.id),
            Element::Count(c) => Some(c.id),
            Element::Unknown => None,
        }
    }

    pub fn tags(&self) -> Option<&HashMap<String, String>> {
        match self {
            Element::Node(n) => n.meta.tags.as_ref(),
            Element::Way(w) => w.meta.tags.as_ref(),
            Element::Relation(r) => r.meta.tags.as_ref(),
            Element::Area(a) => a.tags.as_ref(),
            _ => None,
        }
    }
}

/// Metadata shared by OSM primitives (present with `out meta;`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsmMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changeset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    // `out ids;` and `out tags;` omit coordinates
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(flatten)]
    pub meta: OsmMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub id: u64,
    #[serde(default)]
    pub nodes: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<PointGeom>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bbox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Option<PointGeom>>>,
    #[serde(flatten)]
    pub meta: OsmMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: u64,
    #[serde(default)]
    pub members: Vec<RelationMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<PointGeom>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bbox>,
    #[serde(flatten)]
    pub meta: OsmMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationMember {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub reference: u64,
    #[serde(default)]
    pub role: String,
    // node members under `out geom;`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    // way members under `out geom;`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Option<PointGeom>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub id: u64,
    pub tags: TimelineTags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineTags {
    pub reftype: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub refversion: String,
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Count {
    pub id: u64,
    pub tags: CountTags,
}

/// Counters are reported as strings by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTags {
    #[serde(default)]
    pub nodes: String,
    #[serde(default)]
    pub ways: String,
    #[serde(default)]
    pub relations: String,
    #[serde(default)]
    pub areas: Option<String>,
    #[serde(default)]
    pub total: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointGeom {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub minlat: f64,
    pub minlon: f64,
    pub maxlat: f64,
    pub maxlon: f64,
}
