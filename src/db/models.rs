use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use serde::Serialize;
use serde_json::{json, Value as JsonValue, Map};

use super::schema::{layer_features, user_reports};
use crate::geojson::{Feature, Point};


pub const REPORT_ID_LENGTH: usize = 24;
pub const DEFAULT_REPORT_STATUS: &str = "pending";


#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = layer_features)]
pub struct LayerFeature {
    pub id: i64,
    pub layer_name: String,
    pub description: Option<String>,
    pub feature_id: Option<JsonValue>,
    pub properties: JsonValue,
    pub geometry: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl LayerFeature {
    pub fn to_feature(&self) -> Feature {
        let properties = match &self.properties {
            JsonValue::Object(map) => map.clone(),
            _ => Map::new(),
        };
        Feature::new(properties, Some(self.geometry.clone()))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = layer_features)]
pub struct NewLayerFeature {
    pub layer_name: String,
    pub description: Option<String>,
    pub feature_id: Option<JsonValue>,
    pub properties: JsonValue,
    pub geometry: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl NewLayerFeature {
    /// Builds the record for one source feature, or `None` when it has no geometry.
    pub fn from_feature(layer_name: &str, description: Option<&str>, feature: &Feature,
        created_at: DateTime<Utc>) -> Option<Self> {

        let geometry = feature.geometry.clone()?;

        Some(NewLayerFeature {
            layer_name: layer_name.to_owned(),
            description: description.map(str::to_owned),
            feature_id: feature.property_id().cloned(),
            properties: JsonValue::Object(feature.properties.clone()),
            geometry,
            created_at,
        })
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Queryable, QueryableByName, Selectable, Insertable)]
#[diesel(table_name = user_reports)]
pub struct Report {
    pub id: String,
    pub location: JsonValue,
    pub latitude: f64,
    pub longitude: f64,
    pub report_type: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub status: String,
}

impl Report {
    pub fn from_new(id: String, report: &NewReport, created_at: DateTime<Utc>) -> Self {
        Report {
            id,
            location: Point::from_lat_lon(report.latitude, report.longitude).to_json(),
            latitude: report.latitude,
            longitude: report.longitude,
            report_type: report.report_type.clone(),
            description: report.description.clone(),
            date: report.date.clone(),
            time: report.time.clone(),
            created_at: Some(created_at),
            status: DEFAULT_REPORT_STATUS.to_owned(),
        }
    }

    pub fn to_feature(&self) -> Feature {
        let created_at = self.created_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true));

        let properties = json!({
            "id": self.id,
            "report_type": self.report_type,
            "description": self.description,
            "date": self.date,
            "time": self.time,
            "created_at": created_at,
            "status": self.status,
        });

        let properties = match properties {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };

        Feature::new(properties, Some(self.location.clone()))
    }
}

/// A validated report submission.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub latitude: f64,
    pub longitude: f64,
    pub report_type: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}
