//! Huddle App — WASM entry point.
//!
//! This crate is the composition root (DI wiring layer).
//! It assembles all platform adapters and hands them to the egui UI.

pub mod config_store;

#[cfg(target_arch = "wasm32")]
mod app;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{prelude::*, JsCast};

/// WASM entry point — called from index.html
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Huddle starting...");

    let web_options = eframe::WebOptions::default();

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let canvas = document
        .get_element_by_id("huddle_canvas")
        .ok_or_else(|| JsValue::from_str("No canvas element with id 'huddle_canvas'"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str("Element is not a canvas"))?;

    wasm_bindgen_futures::spawn_local(async move {
        let started = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(app::HuddleApp::new(cc)))),
            )
            .await;
        if let Err(e) = started {
            log::error!("Failed to start eframe: {:?}", e);
        }
    });
    Ok(())
}
