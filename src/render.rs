// src/render.rs
//! Rendering seam. Page templates live outside this crate; handlers hand a
//! view name plus its data to whatever `Render` is installed.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

pub trait Render: Send + Sync {
    fn render(&self, view: &str, data: Value) -> Response;
}

/// Default renderer: the view model as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl Render for JsonRenderer {
    fn render(&self, view: &str, data: Value) -> Response {
        Json(json!({ "view": view, "data": data })).into_response()
    }
}
