#[macro_use] extern crate rocket;


mod api;
mod config;
mod cors;
mod db;
mod geojson;
mod import_sys;
mod layer_route;
mod logger;
mod memory_store;
mod report_route;
mod store;
mod util;


use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use rocket::{Build, Rocket, serde::json::{Json, Value as JsonValue, json}};

use config::Config;
use cors::Cors;
use memory_store::MemoryStore;
use store::{GeoStore, StoreHandle};


#[derive(Parser)]
#[command(name = "hec-map-server")]
#[command(about = "Serves map layers and incident reports for the HEC map", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Load the configured GeoJSON layer files found under a directory
    Import {
        /// Directory to search for layer files
        data_directory: PathBuf,
    },
}


#[get("/")]
fn index() -> &'static str {
    "HEC Map Server"
}

#[get("/health")]
fn health() -> Json<JsonValue> {
    api::success(json!({
        "message": "HEC-SL API is running",
        "status": "healthy",
    }))
}


pub fn build_rocket(store: StoreHandle, cors_origins: Vec<String>) -> Rocket<Build> {
    rocket::build()
        .manage(store)
        .attach(Cors::new(cors_origins))
        .mount("/", routes![
            index,
            health,
        ])
        .mount("/", routes![
            layer_route::get_layers,
            layer_route::get_layer,
        ])
        .mount("/", routes![
            report_route::post_report,
            report_route::get_reports,
            report_route::get_reports_near,
        ])
        .register("/", catchers![
            api::bad_request,
            api::not_found,
            api::unprocessable,
            api::internal_error,
        ])
}

fn open_store(config: &Config) -> Result<StoreHandle, store::StoreError> {
    let store: StoreHandle = if config.uses_memory_store() {
        info!("Using in-memory store");
        Box::new(MemoryStore::new())
    }
    else {
        Box::new(db::PgStore::connect(config)?)
    };

    store.ensure_indexes();

    Ok(store)
}

fn serve(config: Config, store: StoreHandle) -> Result<(), rocket::Error> {
    let mut rocket = build_rocket(store, config.cors_origins.clone());
    if let Some(key) = &config.secret_key {
        rocket = rocket.configure(rocket::Config::figment().merge(("secret_key", key.as_str())));
    }

    rocket::execute(async move {
        rocket.launch().await.map(|_| ())
    })
}

fn import(store: &dyn GeoStore, data_directory: &Path) -> i32 {
    if let Err(err) = store.check_connection() {
        error!("Fail to reach store: {}", err);
        return 1;
    }

    match import_sys::import_all(store, data_directory) {
        Ok(summary) => {
            if !summary.failed.is_empty() {
                warn!("{} layer file(s) could not be imported", summary.failed.len());
            }
            0
        },
        Err(err) => {
            error!("{}", err);
            error!("Usage: hec-map-server import <data_directory>");
            1
        },
    }
}


fn main() {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env();

    let _sentry = match logger::init(&config) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Fail to initialize logger: {}", err);
            None
        },
    };

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(err) => {
            error!("Fail to open store: {}", err);
            process::exit(1);
        },
    };

    let code = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => match serve(config, store) {
            Ok(()) => 0,
            Err(err) => {
                error!("Server failed: {}", err);
                1
            },
        },
        Command::Import { data_directory } => import(store.as_ref(), &data_directory),
    };

    process::exit(code);
}
