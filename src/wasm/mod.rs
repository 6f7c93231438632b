//! WASM bindings for the pagination engine
//!
//! The browser side owns the DOM: it measures a `GeometrySnapshot` each tick,
//! asks the engine what to do, and applies the returned spacer ops and chrome
//! counts itself.

use crate::document::{BreakId, Direction};
use crate::layout::{estimate, GeometryReader, PaginationEngine, RenderedExtent};
use crate::render::{
    page_chrome, GeometrySnapshot, LayoutSource, OverlayWidget, PageChromeEntry, SpacerOp,
};
use crate::{PaginationError, PaginationOptions};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js_error(err: PaginationError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn from_js<T: for<'de> Deserialize<'de>>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| js_sys::Error::new(&e.to_string()).into())
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

/// WASM-exposed engine wrapper
#[wasm_bindgen]
pub struct WasmPaginator {
    options: PaginationOptions,
    engine: PaginationEngine,
}

#[wasm_bindgen]
impl WasmPaginator {
    /// Create an engine from a (partial) options object
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WasmPaginator, JsValue> {
        let options: PaginationOptions = if options.is_undefined() || options.is_null() {
            PaginationOptions::default()
        } else {
            from_js(options)?
        };
        let engine = PaginationEngine::new(&options).map_err(to_js_error)?;
        Ok(Self { options, engine })
    }

    /// Replace the options; all break records are dropped
    #[wasm_bindgen(js_name = setOptions)]
    pub fn set_options(&mut self, options: JsValue) -> Result<(), JsValue> {
        let options: PaginationOptions = from_js(options)?;
        self.engine.reconfigure(&options).map_err(to_js_error)?;
        self.options = options;
        Ok(())
    }

    /// Classify a tick: `"recompute"`, `"pageCount"` or `"idle"`
    pub fn classify(&self, snapshot: JsValue, targets_root: bool) -> Result<String, JsValue> {
        let snapshot: GeometrySnapshot = from_js(snapshot)?;
        let class = self.engine.classify_external(&snapshot, targets_root);
        Ok(class.as_str().to_string())
    }

    /// Run the read phase of a pass and return the writes to perform
    #[wasm_bindgen(js_name = planBreaks)]
    pub fn plan_breaks(&mut self, snapshot: JsValue) -> Result<JsValue, JsValue> {
        let snapshot: GeometrySnapshot = from_js(snapshot)?;
        let pass = self.engine.plan_external(&snapshot);
        let result = PlanResult {
            provisional_pages: pass.provisional_pages,
            ops: pass.ops.to_vec(),
            breaks: pass
                .plan
                .breaks()
                .iter()
                .map(|b| BreakData {
                    break_id: b.break_id(),
                    direction: b.marker.direction,
                    height: b.height,
                    predicted_top: b.predicted_top,
                })
                .collect(),
        };
        Ok(to_js(&result))
    }

    /// Estimate the page count of a snapshot without recording it
    #[wasm_bindgen(js_name = estimatePageCount)]
    pub fn estimate_page_count(&self, snapshot: JsValue) -> Result<usize, JsValue> {
        let snapshot: GeometrySnapshot = from_js(snapshot)?;
        Ok(estimate(
            RenderedExtent::read(&snapshot),
            snapshot.chrome_entries(),
            self.engine.metrics(),
        ))
    }

    /// Record the page count of a snapshot. Returns true when the chrome
    /// must be re-rendered.
    #[wasm_bindgen(js_name = checkPageCount)]
    pub fn check_page_count(&mut self, snapshot: JsValue) -> Result<bool, JsValue> {
        let snapshot: GeometrySnapshot = from_js(snapshot)?;
        Ok(self.engine.observe_page_count(&snapshot).is_some())
    }

    /// Minimum root height: bottom of the last chrome breaker
    #[wasm_bindgen(js_name = minHeight)]
    pub fn min_height(&self, snapshot: JsValue) -> Result<Option<f32>, JsValue> {
        let snapshot: GeometrySnapshot = from_js(snapshot)?;
        Ok(snapshot
            .chrome_breakers()
            .last()
            .map(|&b| GeometryReader::new(&snapshot).measure(b).bottom()))
    }

    #[wasm_bindgen(js_name = getPageCount)]
    pub fn get_page_count(&self) -> usize {
        self.engine.state().page_count()
    }

    /// Chrome entries for the recorded page count
    #[wasm_bindgen(js_name = getPageChrome)]
    pub fn get_page_chrome(&self) -> JsValue {
        let entries: Vec<PageChromeEntry> = page_chrome(self.engine.state(), &self.options)
            .into_iter()
            .find_map(|o| match o.widget {
                OverlayWidget::PageChrome { entries } => Some(entries),
                _ => None,
            })
            .unwrap_or_default();
        to_js(&entries)
    }

    /// Break records keyed by break id
    #[wasm_bindgen(js_name = getBreakRecords)]
    pub fn get_break_records(&self) -> JsValue {
        let mut records: Vec<RecordData> = self
            .engine
            .state()
            .records()
            .map(|(break_id, record)| RecordData {
                break_id,
                direction: record.direction,
                height: record.height,
            })
            .collect();
        records.sort_by_key(|r| r.break_id);
        to_js(&records)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub provisional_pages: usize,
    pub ops: Vec<SpacerOp>,
    pub breaks: Vec<BreakData>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakData {
    pub break_id: BreakId,
    pub direction: Direction,
    pub height: f32,
    pub predicted_top: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordData {
    pub break_id: BreakId,
    pub direction: Direction,
    pub height: f32,
}
