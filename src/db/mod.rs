pub mod models;
pub mod schema;


use std::time::Duration;

use chrono::Utc;
use diesel::prelude::*;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sql_types::Float8;
use log::{info, warn};

use crate::config::Config;
use crate::geojson::FeatureCollection;
use crate::store::{km_to_m, GeoStore, StoreError, StoreResult};
use crate::util;
use models::*;
use schema::layer_features::dsl::{self as lf_dsl};
use schema::user_reports::dsl::{self as ur_dsl};


type PgPool = Pool<ConnectionManager<PgConnection>>;

// Postgres caps a statement at 65535 bind parameters.
const INSERT_CHUNK: usize = 1000;

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS postgis SCHEMA public",
    "CREATE TABLE IF NOT EXISTS layer_features (
        id BIGSERIAL PRIMARY KEY,
        layer_name TEXT NOT NULL,
        description TEXT,
        feature_id JSONB,
        properties JSONB NOT NULL DEFAULT '{}'::jsonb,
        geometry JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        geog GEOGRAPHY GENERATED ALWAYS AS (ST_GeomFromGeoJSON(geometry)::geography) STORED
    )",
    "CREATE TABLE IF NOT EXISTS user_reports (
        id TEXT PRIMARY KEY,
        location JSONB NOT NULL,
        latitude DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        report_type TEXT NOT NULL,
        description TEXT,
        \"date\" TEXT,
        \"time\" TEXT,
        created_at TIMESTAMPTZ DEFAULT now(),
        status TEXT NOT NULL DEFAULT 'pending',
        geog GEOGRAPHY(Point, 4326) GENERATED ALWAYS AS
            (ST_SetSRID(ST_MakePoint(longitude, latitude), 4326)::geography) STORED
    )",
    "CREATE INDEX IF NOT EXISTS layer_features_layer_name_idx ON layer_features (layer_name)",
    "CREATE INDEX IF NOT EXISTS layer_features_geog_idx ON layer_features USING GIST (geog)",
    "CREATE INDEX IF NOT EXISTS user_reports_geog_idx ON user_reports USING GIST (geog)",
];

const REPORTS_NEAR_QUERY: &str = "
    SELECT id, location, latitude, longitude, report_type, description,
        \"date\", \"time\", created_at, status
    FROM user_reports
    WHERE ST_DWithin(geog, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)
    ORDER BY ST_Distance(geog, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography), id";


/// Points every pooled connection at the configured schema.
#[derive(Debug)]
struct SearchPath {
    schema: String,
}

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for SearchPath {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!("SET search_path TO \"{}\", public", self.schema))
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

fn is_valid_schema_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}


/// PostgreSQL/PostGIS backed store.
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn connect(config: &Config) -> StoreResult<Self> {
        if !is_valid_schema_name(&config.database_name) {
            return Err(StoreError::Connection(
                format!("Invalid database name: {}", config.database_name)));
        }

        // Connections are opened lazily, so an unreachable database shows up
        // as per-request errors instead of a startup failure.
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connection_customizer(Box::new(SearchPath {
                schema: config.database_name.clone(),
            }))
            .build_unchecked(manager);

        info!("Database pool ready (schema {})", config.database_name);

        Ok(PgStore {
            pool,
            schema: config.database_name.clone(),
        })
    }

    fn conn(&self) -> StoreResult<PooledConnection<ConnectionManager<PgConnection>>> {
        Ok(self.pool.get()?)
    }
}

impl GeoStore for PgStore {
    fn check_connection(&self) -> StoreResult<()> {
        self.conn().map(|_| ())
    }

    fn ensure_indexes(&self) {
        let mut conn = match self.conn() {
            Ok(conn) => conn,
            Err(err) => {
                warn!("Index creation skipped: {}", err);
                return;
            },
        };

        let create_schema = format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", self.schema);
        let statements = std::iter::once(create_schema.as_str())
            .chain(SCHEMA_STATEMENTS.iter().copied());

        for stmt in statements {
            if let Err(err) = conn.batch_execute(stmt) {
                warn!("Index creation warning: {}", err);
            }
        }
    }

    fn insert_layer_features(&self, layer_name: &str, description: Option<&str>,
        collection: &FeatureCollection) -> StoreResult<usize> {

        let now = Utc::now();
        let rows = collection.features.iter()
            .filter_map(|f| NewLayerFeature::from_feature(layer_name, description, f, now))
            .collect::<Vec<_>>();

        let mut conn = self.conn()?;
        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_CHUNK) {
            inserted += diesel::insert_into(schema::layer_features::table)
                .values(chunk)
                .execute(&mut conn)?;
        }

        Ok(inserted)
    }

    fn get_layer(&self, layer_name: &str) -> StoreResult<Option<FeatureCollection>> {
        let mut conn = self.conn()?;
        let rows = lf_dsl::layer_features
            .filter(lf_dsl::layer_name.eq(layer_name))
            .order(lf_dsl::id.asc())
            .select(LayerFeature::as_select())
            .load::<LayerFeature>(&mut conn)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let features = rows.iter()
            .map(LayerFeature::to_feature)
            .collect();

        Ok(Some(FeatureCollection::new(features)))
    }

    fn list_layers(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.conn()?;
        let names = lf_dsl::layer_features
            .select(lf_dsl::layer_name)
            .distinct()
            .order(lf_dsl::layer_name.asc())
            .load::<String>(&mut conn)?;

        Ok(names)
    }

    fn delete_layer(&self, layer_name: &str) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(lf_dsl::layer_features.filter(lf_dsl::layer_name.eq(layer_name)))
            .execute(&mut conn)?;

        Ok(deleted)
    }

    fn create_report(&self, report: &NewReport) -> StoreResult<String> {
        let row = Report::from_new(util::generate_rand_id(REPORT_ID_LENGTH), report, Utc::now());

        let mut conn = self.conn()?;
        diesel::insert_into(schema::user_reports::table)
            .values(&row)
            .execute(&mut conn)?;

        Ok(row.id)
    }

    fn list_reports(&self) -> StoreResult<FeatureCollection> {
        let mut conn = self.conn()?;
        let reports = ur_dsl::user_reports
            .order(ur_dsl::created_at.asc())
            .select(Report::as_select())
            .load::<Report>(&mut conn)?;

        Ok(FeatureCollection::new(reports.iter().map(Report::to_feature).collect()))
    }

    fn reports_near(&self, latitude: f64, longitude: f64, max_distance_km: f64)
        -> StoreResult<Vec<Report>> {

        let mut conn = self.conn()?;
        let reports = diesel::sql_query(REPORTS_NEAR_QUERY)
            .bind::<Float8, _>(longitude)
            .bind::<Float8, _>(latitude)
            .bind::<Float8, _>(km_to_m(max_distance_km))
            .load::<Report>(&mut conn)?;

        Ok(reports)
    }
}
