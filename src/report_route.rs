use log::info;
use rocket::{
    State,
    serde::json::{self, Json, Value as JsonValue, json},
};

use crate::api::{self, ApiError, JsonResult};
use crate::db::models::NewReport;
use crate::store::StoreHandle;


const DEFAULT_NEAR_DISTANCE_KM: f64 = 10.0;
const REQUIRED_FIELDS: [&str; 3] = ["latitude", "longitude", "report_type"];


#[derive(Debug, Default)]
pub struct ReportForm {
    latitude: Option<JsonValue>,
    longitude: Option<JsonValue>,
    report_type: Option<JsonValue>,
    description: Option<JsonValue>,
    date: Option<JsonValue>,
    time: Option<JsonValue>,
}

impl ReportForm {
    /// Only a JSON object is a report; `null` members count as absent.
    fn from_json(body: JsonValue) -> Result<Self, ApiError> {
        let mut map = match body {
            JsonValue::Object(map) => map,
            _ => return Err(ApiError::BadRequest("Request body must be a JSON object".into())),
        };

        let mut take = |key: &str| map.remove(key).filter(|v| !v.is_null());

        Ok(ReportForm {
            latitude: take("latitude"),
            longitude: take("longitude"),
            report_type: take("report_type"),
            description: take("description"),
            date: take("date"),
            time: take("time"),
        })
    }

    fn field(&self, name: &str) -> Option<&JsonValue> {
        match name {
            "latitude" => self.latitude.as_ref(),
            "longitude" => self.longitude.as_ref(),
            "report_type" => self.report_type.as_ref(),
            _ => None,
        }
    }

    fn into_new_report(self) -> Result<NewReport, ApiError> {
        if let Some(missing) = REQUIRED_FIELDS.iter().find(|&&f| self.field(f).is_none()) {
            return Err(ApiError::BadRequest(format!("Missing required field: {}", missing)));
        }

        let (latitude, longitude) = match (
            self.latitude.as_ref().and_then(coerce_float),
            self.longitude.as_ref().and_then(coerce_float),
        ) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err(ApiError::BadRequest("Invalid latitude or longitude format".into())),
        };

        if !is_valid_lat_lon(latitude, longitude) {
            return Err(ApiError::BadRequest("Latitude or longitude out of range".into()));
        }

        let report_type = match self.report_type {
            Some(JsonValue::String(t)) if !t.trim().is_empty() => t,
            _ => return Err(ApiError::BadRequest("Invalid report_type".into())),
        };

        Ok(NewReport {
            latitude,
            longitude,
            report_type,
            description: Some(optional_text("description", self.description)?.unwrap_or_default()),
            date: optional_text("date", self.date)?,
            time: optional_text("time", self.time)?,
        })
    }
}


/// Scalars are stored as their text form; arrays and objects are rejected.
fn optional_text(name: &str, value: Option<JsonValue>) -> Result<Option<String>, ApiError> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(v @ JsonValue::Number(_)) | Some(v @ JsonValue::Bool(_)) => Ok(Some(v.to_string())),
        Some(_) => Err(ApiError::BadRequest(format!("Invalid {}", name))),
    }
}

/// Accepts a JSON number or a numeric string.
fn coerce_float(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => parse_float(s),
        _ => None,
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

fn is_valid_lat_lon(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite() && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}


#[post("/reports", data = "<body>")]
pub fn post_report(body: Result<Json<JsonValue>, json::Error<'_>>,
    store: &State<StoreHandle>) -> JsonResult {

    let body = match body {
        Ok(body) => body.into_inner(),
        Err(err) => return Err(ApiError::BadRequest(format!("Invalid JSON body: {}", err))),
    };

    let report = ReportForm::from_json(body)?.into_new_report()?;
    let report_id = store.create_report(&report)?;

    info!("New {} report {} at ({}, {})",
        report.report_type, report_id, report.latitude, report.longitude);

    Ok(api::success(json!({
        "report_id": report_id,
        "message": "Report created successfully",
    })))
}

#[get("/reports")]
pub fn get_reports(store: &State<StoreHandle>) -> JsonResult {
    let reports = store.list_reports()?;

    Ok(api::success(json!({
        "data": reports,
    })))
}

#[get("/reports/near?<lat>&<lng>&<distance>")]
pub fn get_reports_near(lat: Option<&str>, lng: Option<&str>, distance: Option<&str>,
    store: &State<StoreHandle>) -> JsonResult {

    let distance = match distance {
        Some(d) => parse_float(d),
        None => Some(DEFAULT_NEAR_DISTANCE_KM),
    };

    let (latitude, longitude, distance) = match (
        lat.and_then(parse_float),
        lng.and_then(parse_float),
        distance,
    ) {
        (Some(lat), Some(lng), Some(d))
            if is_valid_lat_lon(lat, lng) && d.is_finite() && d >= 0.0 => (lat, lng, d),
        _ => return Err(ApiError::BadRequest(
            "Invalid latitude, longitude, or distance parameters".into())),
    };

    let reports = store.reports_near(latitude, longitude, distance)?;

    Ok(api::success(json!({
        "data": reports,
    })))
}


#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::{ContentType, Status};
    use rocket::local::blocking::Client;

    use crate::memory_store::MemoryStore;

    fn client() -> Client {
        Client::tracked(crate::build_rocket(Box::new(MemoryStore::new()), vec![])).unwrap()
    }

    fn post_json(client: &Client, body: JsonValue) -> (Status, JsonValue) {
        let res = client.post("/reports")
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch();
        let status = res.status();
        (status, res.into_json().unwrap())
    }

    #[test]
    fn coerces_numbers_and_numeric_strings() {
        assert_eq!(coerce_float(&json!(6.9)), Some(6.9));
        assert_eq!(coerce_float(&json!(" 79.8 ")), Some(79.8));
        assert_eq!(coerce_float(&json!("north")), None);
        assert_eq!(coerce_float(&json!(true)), None);
    }

    #[test]
    fn form_requires_fields_in_order() {
        let form = ReportForm {
            longitude: Some(json!(79.8)),
            ..Default::default()
        };
        let err = form.into_new_report().unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: latitude");
    }

    #[test]
    fn form_treats_null_as_missing() {
        let err = ReportForm::from_json(json!({
            "latitude": null, "longitude": 79.8, "report_type": "sighting",
        })).unwrap().into_new_report().unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: latitude");
    }

    #[test]
    fn optional_fields_keep_scalar_text() {
        let report = ReportForm::from_json(json!({
            "latitude": 6.9, "longitude": 79.8, "report_type": "sighting",
            "description": 5, "date": "2024-05-01", "time": true,
        })).unwrap().into_new_report().unwrap();

        assert_eq!(report.description.as_deref(), Some("5"));
        assert_eq!(report.date.as_deref(), Some("2024-05-01"));
        assert_eq!(report.time.as_deref(), Some("true"));
    }

    #[test]
    fn form_defaults_description() {
        let form = ReportForm {
            latitude: Some(json!("6.9")),
            longitude: Some(json!(79.8)),
            report_type: Some(json!("sighting")),
            ..Default::default()
        };
        let report = form.into_new_report().unwrap();
        assert_eq!(report.latitude, 6.9);
        assert_eq!(report.description.as_deref(), Some(""));
        assert_eq!(report.date, None);
    }

    #[test]
    fn create_then_find_nearby() {
        let client = client();
        let (status, body) = post_json(&client, json!({
            "latitude": 6.9, "longitude": 79.8, "report_type": "sighting",
        }));

        assert_eq!(status, Status::Ok);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("Report created successfully"));
        let id = body["report_id"].as_str().unwrap().to_owned();
        assert!(!id.is_empty());

        let res = client.get("/reports/near?lat=6.9&lng=79.8&distance=1").dispatch();
        assert_eq!(res.status(), Status::Ok);
        let body: JsonValue = res.into_json().unwrap();
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], json!(id));
        assert_eq!(data[0]["location"], json!({ "type": "Point", "coordinates": [79.8, 6.9] }));
        assert_eq!(data[0]["status"], json!("pending"));
    }

    #[test]
    fn near_defaults_to_ten_km() {
        let client = client();
        post_json(&client, json!({ "latitude": 6.95, "longitude": 79.8, "report_type": "crop damage" }));
        post_json(&client, json!({ "latitude": 7.5, "longitude": 79.8, "report_type": "sighting" }));

        let res = client.get("/reports/near?lat=6.9&lng=79.8").dispatch();
        let body: JsonValue = res.into_json().unwrap();
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["report_type"], json!("crop damage"));
    }

    #[test]
    fn missing_latitude_is_400() {
        let (status, body) = post_json(&client(), json!({ "longitude": 79.8, "report_type": "sighting" }));

        assert_eq!(status, Status::BadRequest);
        assert_eq!(body, json!({ "success": false, "error": "Missing required field: latitude" }));
    }

    #[test]
    fn unparsable_coordinates_are_400() {
        let (status, body) = post_json(&client(), json!({
            "latitude": "six", "longitude": 79.8, "report_type": "sighting",
        }));

        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["error"], json!("Invalid latitude or longitude format"));
    }

    #[test]
    fn out_of_range_coordinates_are_400() {
        let (status, _) = post_json(&client(), json!({
            "latitude": 79.8, "longitude": 200.0, "report_type": "sighting",
        }));
        assert_eq!(status, Status::BadRequest);
    }

    #[test]
    fn malformed_body_is_400() {
        let client = client();
        let res = client.post("/reports")
            .header(ContentType::JSON)
            .body("{ not json")
            .dispatch();

        assert_eq!(res.status(), Status::BadRequest);
        let body: JsonValue = res.into_json().unwrap();
        assert_eq!(body["success"], json!(false));
    }

    #[test]
    fn non_object_bodies_are_400() {
        let client = client();
        for body in [json!([6.9, 79.8, "sighting", null, null, null]), json!("sighting"), json!(6.9)] {
            let (status, res) = post_json(&client, body.clone());
            assert_eq!(status, Status::BadRequest, "{}", body);
            assert_eq!(res, json!({ "success": false, "error": "Request body must be a JSON object" }));
        }

        let res = client.get("/reports").dispatch();
        let listed: JsonValue = res.into_json().unwrap();
        assert_eq!(listed["data"]["features"], json!([]));
    }

    #[test]
    fn structured_optional_fields_are_400() {
        let (status, body) = post_json(&client(), json!({
            "latitude": 6.9, "longitude": 79.8, "report_type": "sighting",
            "description": { "text": "herd" },
        }));

        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["error"], json!("Invalid description"));
    }

    #[test]
    fn bad_near_parameters_are_400() {
        let client = client();
        for uri in [
            "/reports/near?lng=79.8",
            "/reports/near?lat=north&lng=79.8",
            "/reports/near?lat=6.9&lng=79.8&distance=-1",
        ] {
            let res = client.get(uri).dispatch();
            assert_eq!(res.status(), Status::BadRequest, "{}", uri);
            let body: JsonValue = res.into_json().unwrap();
            assert_eq!(body["error"], json!("Invalid latitude, longitude, or distance parameters"));
        }
    }

    #[test]
    fn lists_reports_as_feature_collection() {
        let client = client();
        post_json(&client, json!({
            "latitude": 6.9, "longitude": 79.8, "report_type": "sighting",
            "description": "herd crossing", "date": "2024-05-01", "time": "18:30",
        }));

        let res = client.get("/reports").dispatch();
        assert_eq!(res.status(), Status::Ok);
        let body: JsonValue = res.into_json().unwrap();
        assert_eq!(body["data"]["type"], json!("FeatureCollection"));

        let feature = &body["data"]["features"][0];
        assert_eq!(feature["geometry"], json!({ "type": "Point", "coordinates": [79.8, 6.9] }));
        assert_eq!(feature["properties"]["description"], json!("herd crossing"));
        assert_eq!(feature["properties"]["time"], json!("18:30"));
        assert!(feature["properties"]["created_at"].is_string());
    }
}
