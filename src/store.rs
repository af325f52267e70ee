use crate::db::models::{NewReport, Report};
use crate::geojson::FeatureCollection;


pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle given to request handlers and the importer.
pub type StoreHandle = Box<dyn GeoStore>;


#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("{0}")]
    Query(#[from] diesel::result::Error),

    #[error("{0}")]
    Connection(String),
}


/// Persistence for layer features and user reports.
///
/// Layers have no header record: a layer exists while at least one feature
/// carries its name. Replacing a layer is `delete_layer` followed by
/// `insert_layer_features` and is not atomic.
pub trait GeoStore: Send + Sync {
    /// Fails when the backing store cannot currently be reached.
    fn check_connection(&self) -> StoreResult<()>;

    /// Creates tables and spatial indexes. Failures are logged, not returned.
    fn ensure_indexes(&self);

    /// Stores one record per feature that has a geometry and returns how many were written.
    fn insert_layer_features(&self, layer_name: &str, description: Option<&str>,
        collection: &FeatureCollection) -> StoreResult<usize>;

    /// `None` when no feature carries `layer_name`.
    fn get_layer(&self, layer_name: &str) -> StoreResult<Option<FeatureCollection>>;

    /// Distinct layer names, ascending.
    fn list_layers(&self) -> StoreResult<Vec<String>>;

    fn delete_layer(&self, layer_name: &str) -> StoreResult<usize>;

    /// Stores a report with status "pending" and returns its generated id.
    fn create_report(&self, report: &NewReport) -> StoreResult<String>;

    fn list_reports(&self) -> StoreResult<FeatureCollection>;

    /// Reports within `max_distance_km` of the point, nearest first.
    fn reports_near(&self, latitude: f64, longitude: f64, max_distance_km: f64)
        -> StoreResult<Vec<Report>>;
}


pub fn km_to_m(km: f64) -> f64 {
    km * 1000.0
}
