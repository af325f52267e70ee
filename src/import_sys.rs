use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use log::{info, warn};
use serde_json::error::Category;
use walkdir::WalkDir;

use crate::geojson::FeatureCollection;
use crate::store::{GeoStore, StoreError};


const GEOJSON_EXTENSION: &str = "geojson";


pub struct LayerSource {
    pub file_name: &'static str,
    pub layer_name: &'static str,
    pub description: &'static str,
}

pub const LAYER_SOURCES: &[LayerSource] = &[
    LayerSource {
        file_name: "Districts.geojson",
        layer_name: "districts",
        description: "District boundaries of Sri Lanka",
    },
    LayerSource {
        file_name: "DSDs.geojson",
        layer_name: "dsds",
        description: "Divisional Secretariat Division boundaries",
    },
    LayerSource {
        file_name: "All Elephant Deaths from 2018 - 2023.geojson",
        layer_name: "elephant_deaths",
        description: "Elephant death incidents from 2018-2023",
    },
    LayerSource {
        file_name: "Forest Cover.geojson",
        layer_name: "forest_cover",
        description: "Forest cover areas in Sri Lanka",
    },
    LayerSource {
        file_name: "Forests.geojson",
        layer_name: "forests",
        description: "Forest areas with food sources for elephants",
    },
    LayerSource {
        file_name: "Habitat Area 1960.geojson",
        layer_name: "habitat_1960",
        description: "Elephant habitat areas in 1960",
    },
    LayerSource {
        file_name: "Habitat Area 2020.geojson",
        layer_name: "habitat_2020",
        description: "Elephant habitat areas in 2020",
    },
    LayerSource {
        file_name: "HEC Density.geojson",
        layer_name: "hec_density",
        description: "Human-Elephant Conflict density areas",
    },
    LayerSource {
        file_name: "All Human Deaths from 2018 - 2020.geojson",
        layer_name: "human_deaths",
        description: "Human death incidents from 2018-2020",
    },
];

pub fn find_source(file_name: &str) -> Option<&'static LayerSource> {
    LAYER_SOURCES.iter().find(|s| s.file_name == file_name)
}


#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Data directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid JSON in file {path}: {source}")]
    InvalidJson { path: PathBuf, source: serde_json::Error },

    #[error("Invalid GeoJSON in file {path}: {source}")]
    InvalidGeoJson { path: PathBuf, source: serde_json::Error },

    #[error("Error reading {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Error importing {path}: {source}")]
    Store { path: PathBuf, source: StoreError },
}


#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: Vec<String>,
    pub failed: Vec<(PathBuf, String)>,
    pub skipped: Vec<PathBuf>,
}

impl ImportSummary {
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }
}


/// Imports every configured layer file found under `data_dir`.
///
/// Each file is independent: a failure is logged and recorded and the run
/// moves on. Only a missing `data_dir` aborts the run.
pub fn import_all(store: &dyn GeoStore, data_dir: &Path) -> Result<ImportSummary, ImportError> {
    if !data_dir.is_dir() {
        return Err(ImportError::DirectoryNotFound(data_dir.to_path_buf()));
    }

    info!("Starting data import from: {}", data_dir.display());

    let mut summary = ImportSummary::default();

    let entries = WalkDir::new(data_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                None
            },
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == GEOJSON_EXTENSION));

    for entry in entries {
        let path = entry.path();
        let source = match entry.file_name().to_str().and_then(find_source) {
            Some(source) => source,
            None => {
                info!("Skipping unconfigured file: {}", path.display());
                summary.skipped.push(path.to_path_buf());
                continue;
            },
        };

        match import_file(store, path, source) {
            Ok(_) => summary.imported.push(source.layer_name.to_owned()),
            Err(err) => {
                warn!("{}", err);
                summary.failed.push((path.to_path_buf(), err.to_string()));
            },
        }
    }

    info!("Import completed. Successfully imported {} layers.", summary.imported_count());

    match store.list_layers() {
        Ok(layers) => info!("Available layers in database: {:?}", layers),
        Err(err) => warn!("Fail to list layers: {}", err),
    }

    Ok(summary)
}

/// Replaces one layer with the contents of `path`; returns the imported feature count.
pub fn import_file(store: &dyn GeoStore, path: &Path, source: &LayerSource)
    -> Result<usize, ImportError> {

    let collection = read_feature_collection(path)?;

    let store_err = |source| ImportError::Store { path: path.to_path_buf(), source };

    let deleted = store.delete_layer(source.layer_name).map_err(store_err)?;
    if deleted > 0 {
        info!("Deleted {} existing features for layer: {}", deleted, source.layer_name);
    }

    let inserted = store.insert_layer_features(source.layer_name, Some(source.description), &collection)
        .map_err(store_err)?;
    info!("Successfully imported {} features for layer: {}", inserted, source.layer_name);

    Ok(inserted)
}

fn read_feature_collection(path: &Path) -> Result<FeatureCollection, ImportError> {
    let file = File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ImportError::FileNotFound(path.to_path_buf()),
        _ => ImportError::Io { path: path.to_path_buf(), source: err },
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|err| {
        let path = path.to_path_buf();
        match err.classify() {
            Category::Data => ImportError::InvalidGeoJson { path, source: err },
            Category::Io => ImportError::Io { path, source: err.into() },
            Category::Syntax | Category::Eof => ImportError::InvalidJson { path, source: err },
        }
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::memory_store::MemoryStore;

    const DISTRICTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "id": 1, "name": "Colombo" },
              "geometry": { "type": "Point", "coordinates": [79.86, 6.93] } },
            { "type": "Feature", "properties": { "id": 2, "name": "Kandy" },
              "geometry": { "type": "Point", "coordinates": [80.63, 7.29] } },
            { "type": "Feature", "properties": { "id": 3, "name": "unlocated" }, "geometry": null }
        ]
    }"#;

    const FORESTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "name": "Sinharaja" },
              "geometry": { "type": "Polygon", "coordinates": [[[80.4, 6.4], [80.5, 6.4], [80.5, 6.5], [80.4, 6.4]]] } }
        ]
    }"#;

    #[test]
    fn source_table_lookup() {
        assert_eq!(find_source("Districts.geojson").map(|s| s.layer_name), Some("districts"));
        assert_eq!(find_source("HEC Density.geojson").map(|s| s.layer_name), Some("hec_density"));
        assert!(find_source("districts.geojson").is_none());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let store = MemoryStore::new();
        let res = import_all(&store, Path::new("/definitely/not/here"));
        assert!(matches!(res, Err(ImportError::DirectoryNotFound(_))));
    }

    #[test]
    fn imports_configured_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Districts.geojson"), DISTRICTS).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("Forests.geojson"), FORESTS).unwrap();
        fs::write(dir.path().join("Roads.geojson"), FORESTS).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a layer").unwrap();

        let store = MemoryStore::new();
        let summary = import_all(&store, dir.path()).unwrap();

        assert_eq!(summary.imported_count(), 2);
        assert!(summary.failed.is_empty());
        assert_eq!(summary.skipped, vec![dir.path().join("Roads.geojson")]);
        assert_eq!(store.list_layers().unwrap(), vec!["districts".to_owned(), "forests".to_owned()]);
        assert_eq!(store.get_layer("districts").unwrap().unwrap().features.len(), 2);
    }

    #[test]
    fn reimport_replaces_layer() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Districts.geojson"), DISTRICTS).unwrap();

        let store = MemoryStore::new();
        import_all(&store, dir.path()).unwrap();
        import_all(&store, dir.path()).unwrap();

        assert_eq!(store.get_layer("districts").unwrap().unwrap().features.len(), 2);
    }

    #[test]
    fn bad_files_fail_independently() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("DSDs.geojson"), "{ broken").unwrap();
        fs::write(dir.path().join("Forests.geojson"), r#"{ "type": "FeatureCollection", "features": 3 }"#).unwrap();
        fs::write(dir.path().join("Districts.geojson"), DISTRICTS).unwrap();

        let store = MemoryStore::new();
        let summary = import_all(&store, dir.path()).unwrap();

        assert_eq!(summary.imported, vec!["districts".to_owned()]);
        assert_eq!(summary.failed.len(), 2);
        assert!(summary.failed.iter().any(|(p, e)| p.ends_with("DSDs.geojson") && e.starts_with("Invalid JSON")));
        assert!(summary.failed.iter().any(|(p, e)| p.ends_with("Forests.geojson") && e.starts_with("Invalid GeoJSON")));
    }

    #[test]
    fn import_file_reports_missing_file() {
        let store = MemoryStore::new();
        let source = find_source("Districts.geojson").unwrap();
        let res = import_file(&store, Path::new("/nope/Districts.geojson"), source);
        assert!(matches!(res, Err(ImportError::FileNotFound(_))));
    }
}
