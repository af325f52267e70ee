use rocket::{
    State,
    serde::json::json,
};

use crate::api::{self, ApiError, JsonResult};
use crate::store::StoreHandle;


#[get("/layers")]
pub fn get_layers(store: &State<StoreHandle>) -> JsonResult {
    let layers = store.list_layers()?;

    Ok(api::success(json!({
        "layers": layers,
    })))
}

#[get("/layers/<name>")]
pub fn get_layer(name: &str, store: &State<StoreHandle>) -> JsonResult {
    match store.get_layer(name)? {
        Some(layer) => Ok(api::success(json!({
            "data": layer,
        }))),
        None => Err(ApiError::NotFound("Layer not found".into())),
    }
}
