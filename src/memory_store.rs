use std::collections::BTreeSet;

use chrono::Utc;
use log::debug;
use parking_lot::RwLock;

use crate::db::models::{LayerFeature, NewLayerFeature, NewReport, Report, REPORT_ID_LENGTH};
use crate::geojson::FeatureCollection;
use crate::store::{km_to_m, GeoStore, StoreResult};
use crate::util;


#[derive(Default)]
struct Tables {
    next_feature_id: i64,
    features: Vec<LayerFeature>,
    reports: Vec<Report>,
}


/// Process-local store with the same semantics as the PostGIS one.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl GeoStore for MemoryStore {
    fn check_connection(&self) -> StoreResult<()> {
        Ok(())
    }

    fn ensure_indexes(&self) {
        debug!("Memory store needs no indexes");
    }

    fn insert_layer_features(&self, layer_name: &str, description: Option<&str>,
        collection: &FeatureCollection) -> StoreResult<usize> {

        let now = Utc::now();
        let rows = collection.features.iter()
            .filter_map(|f| NewLayerFeature::from_feature(layer_name, description, f, now))
            .collect::<Vec<_>>();
        let count = rows.len();

        let mut tables = self.tables.write();
        for row in rows {
            tables.next_feature_id += 1;
            let id = tables.next_feature_id;
            tables.features.push(LayerFeature {
                id,
                layer_name: row.layer_name,
                description: row.description,
                feature_id: row.feature_id,
                properties: row.properties,
                geometry: row.geometry,
                created_at: row.created_at,
            });
        }

        Ok(count)
    }

    fn get_layer(&self, layer_name: &str) -> StoreResult<Option<FeatureCollection>> {
        let tables = self.tables.read();
        let features = tables.features.iter()
            .filter(|f| f.layer_name == layer_name)
            .map(LayerFeature::to_feature)
            .collect::<Vec<_>>();

        if features.is_empty() {
            Ok(None)
        }
        else {
            Ok(Some(FeatureCollection::new(features)))
        }
    }

    fn list_layers(&self) -> StoreResult<Vec<String>> {
        let tables = self.tables.read();
        let names = tables.features.iter()
            .map(|f| f.layer_name.clone())
            .collect::<BTreeSet<_>>();

        Ok(names.into_iter().collect())
    }

    fn delete_layer(&self, layer_name: &str) -> StoreResult<usize> {
        let mut tables = self.tables.write();
        let before = tables.features.len();
        tables.features.retain(|f| f.layer_name != layer_name);

        Ok(before - tables.features.len())
    }

    fn create_report(&self, report: &NewReport) -> StoreResult<String> {
        let id = util::generate_rand_id(REPORT_ID_LENGTH);
        let row = Report::from_new(id.clone(), report, Utc::now());

        self.tables.write().reports.push(row);

        Ok(id)
    }

    fn list_reports(&self) -> StoreResult<FeatureCollection> {
        let tables = self.tables.read();
        let features = tables.reports.iter()
            .map(Report::to_feature)
            .collect();

        Ok(FeatureCollection::new(features))
    }

    fn reports_near(&self, latitude: f64, longitude: f64, max_distance_km: f64)
        -> StoreResult<Vec<Report>> {

        let max_distance = km_to_m(max_distance_km);
        let tables = self.tables.read();

        let mut found = tables.reports.iter()
            .map(|r| (util::distance_m((latitude, longitude), (r.latitude, r.longitude)), r))
            .filter(|(d, _)| *d <= max_distance)
            .collect::<Vec<_>>();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(found.into_iter().map(|(_, r)| r.clone()).collect())
    }
}
