//! WASM bindings for the htmpl template renderer.
//!
//! Exposes `render()` and `renderTemplate()` to JavaScript via wasm-bindgen.
//! Both return the rendered markup or throw on error.

use htmpl_ast::builder::text;
use htmpl_ast::Insertion;
use htmpl_parser::ParseError;
use wasm_bindgen::prelude::*;

/// Parse and render template source that has no insertions.
#[wasm_bindgen]
pub fn render(source: &str) -> Result<String, JsError> {
    render_with(source, &[])
}

/// Render a tagged-template call: `strings` around `values`.
///
/// Strings and numbers become text, entity-encoded when rendered.
/// Throws on any other value.
#[wasm_bindgen(js_name = renderTemplate)]
pub fn render_template(strings: Vec<String>, values: js_sys::Array) -> Result<String, JsError> {
    let texts = values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .as_string()
                .or_else(|| value.as_f64().map(|n| n.to_string()))
                .ok_or_else(|| JsError::new(&format!("Unsupported value for insertion {i}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    render_texts(&strings, texts)
}

/// Get the renderer version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn render_with(source: &str, insertions: &[Insertion]) -> Result<String, JsError> {
    let html = htmpl_parser::parse(source, insertions).map_err(to_js_error)?;
    html.render().map_err(|e| JsError::new(&e.to_string()))
}

fn render_texts(strings: &[String], values: Vec<String>) -> Result<String, JsError> {
    let insertions = values.into_iter().map(|value| text(value).into()).collect();
    let html = htmpl_parser::template(strings, insertions).map_err(to_js_error)?;
    html.render().map_err(|e| JsError::new(&e.to_string()))
}

fn to_js_error(err: ParseError) -> JsError {
    JsError::new(&format!("{}: {err}", err.kind()))
}
