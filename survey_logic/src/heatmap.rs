//! Extraction of geographic points from stored response locations.
//!
//! The location payload has no fixed shape: it may be a flat `{lat, lng}`
//! object when the client captured one fix per survey, or a map keyed by
//! question id to such objects when it captured one fix per answer. The
//! extractor finds the first usable pair, in the payload's own key order.

use log::debug;

use serde::Serialize;
use serde_json::Value as JSValue;

use crate::model::{Response, ResponseFilter};

/// One heatmap point.
#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Finds the first usable coordinate pair in a raw location payload.
///
/// The payload itself is checked first; failing that, its values are scanned
/// in key enumeration order and the first nested pair wins. A coordinate is
/// usable when numeric (or a numeric string) and non-zero, matching the
/// platform's stored truthiness.
pub fn extract_location(payload: &JSValue) -> Option<GeoPoint> {
    if let Some(point) = point_of(payload) {
        return Some(point);
    }
    payload.as_object()?.values().find_map(point_of)
}

fn point_of(v: &JSValue) -> Option<GeoPoint> {
    let obj = v.as_object()?;
    let lat = coord(obj.get("lat")?)?;
    let lng = coord(obj.get("lng")?)?;
    Some(GeoPoint { lat, lng })
}

fn coord(v: &JSValue) -> Option<f64> {
    let x = match v {
        JSValue::Number(n) => n.as_f64()?,
        JSValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if x == 0.0 {
        return None;
    }
    Some(x)
}

/// Collects the heatmap point set for a response collection. Responses with
/// no usable location are silently skipped; the optional filter uses the same
/// contains-for-arrays semantics as report filtering.
pub fn run_heatmap(responses: &[Response], filter: Option<&ResponseFilter>) -> Vec<GeoPoint> {
    let mut points: Vec<GeoPoint> = Vec::new();
    for r in responses {
        if let Some(f) = filter {
            if !f.matches(r) {
                continue;
            }
        }
        match extract_location(&r.location) {
            Some(point) => points.push(point),
            None => {
                debug!("run_heatmap: response {} has no usable location", r.id);
            }
        }
    }
    points
}
