//! Minimal GeoJSON shapes the service reads and writes.
//!
//! Geometries are kept as raw JSON values: the service never inspects them
//! beyond handing them to the store, which owns the spatial index.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureCollectionType {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureType {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointType {
    #[default]
    Point,
}


#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    pub kind: FeatureCollectionType,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: FeatureCollectionType::FeatureCollection,
            features,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    pub kind: FeatureType,
    #[serde(default, deserialize_with = "nullable_map")]
    pub properties: Map<String, JsonValue>,
    #[serde(default)]
    pub geometry: Option<JsonValue>,
}

impl Feature {
    pub fn new(properties: Map<String, JsonValue>, geometry: Option<JsonValue>) -> Self {
        Feature {
            kind: FeatureType::Feature,
            properties,
            geometry,
        }
    }

    /// The `id` member of the feature's properties, if any.
    pub fn property_id(&self) -> Option<&JsonValue> {
        self.properties.get("id").filter(|id| !id.is_null())
    }
}


/// GeoJSON Point; coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "type", default)]
    pub kind: PointType,
    pub coordinates: [f64; 2],
}

impl Point {
    pub fn from_lat_lon(latitude: f64, longitude: f64) -> Self {
        Point {
            kind: PointType::Point,
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({
            "type": "Point",
            "coordinates": [self.longitude(), self.latitude()],
        })
    }
}


// GeoJSON allows `"properties": null`.
fn nullable_map<'de, D>(deserializer: D) -> Result<Map<String, JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, JsonValue>>::deserialize(deserializer)?.unwrap_or_default())
}
