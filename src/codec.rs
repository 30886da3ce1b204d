//! Payload codec: argument bags in, typed commands out.
//!
//! DESIGN
//! ======
//! Every handler goes through this one boundary. `Args` wraps a flat bag
//! (top-level `Data` or a nested JSON object) and offers typed accessors:
//!
//! - `opt_*` returns `Ok(None)` for an absent or `null` field and
//!   `Err(DecodeError::Type)` only when a present field has the wrong type.
//! - `req_*` additionally fails with `DecodeError::Missing`.
//!
//! Nested scopes carry a dotted path (`annotationsToAdd[2].position`) so
//! errors name the exact field. Decoding is pure; no engine access.

use serde_json::{Map, Value};

use crate::camera::CameraUpdate;
use crate::frame::{Data, ErrorCode};
use crate::gateway::scene::PoiCategory;
use crate::gateway::snapshot::SnapshotOptions;
use crate::geo::LatLng;
use crate::options::MapOptions;
use crate::overlay::{Annotation, BatchUpdate, Circle, Polygon, Polyline};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing required field: {0}")]
    Missing(String),
    #[error("field {field} has wrong type: expected {expected}")]
    Type { field: String, expected: &'static str },
}

impl ErrorCode for DecodeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing(_) => "E_DECODE_MISSING",
            Self::Type { .. } => "E_DECODE_TYPE",
        }
    }
}

fn type_error(field: String, expected: &'static str) -> DecodeError {
    DecodeError::Type { field, expected }
}

// =============================================================================
// ARGS
// =============================================================================

enum Bag<'a> {
    Top(&'a Data),
    Nested(&'a Map<String, Value>),
}

/// Read-only view over one argument bag.
pub struct Args<'a> {
    bag: Bag<'a>,
    scope: String,
}

/// Types decodable from one argument bag.
pub trait Decode: Sized {
    /// # Errors
    ///
    /// Returns `DecodeError` naming the missing or mistyped field.
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError>;
}

impl<'a> Args<'a> {
    #[must_use]
    pub fn top(data: &'a Data) -> Self {
        Self { bag: Bag::Top(data), scope: String::new() }
    }

    /// Open a JSON object value as a nested scope named `path`.
    ///
    /// # Errors
    ///
    /// `DecodeError::Type` when the value is not an object.
    pub fn object(value: &'a Value, path: impl Into<String>) -> Result<Self, DecodeError> {
        let path = path.into();
        match value {
            Value::Object(map) => Ok(Self { bag: Bag::Nested(map), scope: path }),
            _ => Err(type_error(path, "object")),
        }
    }

    /// Fully-qualified name of a field in this scope.
    #[must_use]
    pub fn path(&self, key: &str) -> String {
        if self.scope.is_empty() { key.to_string() } else { format!("{}.{key}", self.scope) }
    }

    /// Raw field access. `null` counts as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        let value = match self.bag {
            Bag::Top(data) => data.get(key),
            Bag::Nested(map) => map.get(key),
        };
        value.filter(|v| !v.is_null())
    }

    fn required(&self, key: &str) -> Result<&'a Value, DecodeError> {
        self.get(key).ok_or_else(|| DecodeError::Missing(self.path(key)))
    }

    // -------------------------------------------------------------------------
    // scalars
    // -------------------------------------------------------------------------

    pub fn opt_str(&self, key: &str) -> Result<Option<&'a str>, DecodeError> {
        self.get(key)
            .map(|v| v.as_str().ok_or_else(|| type_error(self.path(key), "string")))
            .transpose()
    }

    pub fn req_str(&self, key: &str) -> Result<&'a str, DecodeError> {
        let v = self.required(key)?;
        v.as_str().ok_or_else(|| type_error(self.path(key), "string"))
    }

    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, DecodeError> {
        self.get(key).map(|v| number(v, || self.path(key))).transpose()
    }

    pub fn req_f64(&self, key: &str) -> Result<f64, DecodeError> {
        number(self.required(key)?, || self.path(key))
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>, DecodeError> {
        self.get(key)
            .map(|v| v.as_bool().ok_or_else(|| type_error(self.path(key), "bool")))
            .transpose()
    }

    pub fn opt_i64(&self, key: &str) -> Result<Option<i64>, DecodeError> {
        self.get(key).map(|v| integer(v, || self.path(key))).transpose()
    }

    /// ARGB color stored as an integer (Dart `Color.value`).
    pub fn opt_color(&self, key: &str) -> Result<Option<u32>, DecodeError> {
        let Some(raw) = self.opt_i64(key)? else {
            return Ok(None);
        };
        u32::try_from(raw)
            .map(Some)
            .map_err(|_| type_error(self.path(key), "32-bit ARGB color"))
    }

    // -------------------------------------------------------------------------
    // composites
    // -------------------------------------------------------------------------

    pub fn opt_list(&self, key: &str) -> Result<Option<&'a Vec<Value>>, DecodeError> {
        self.get(key)
            .map(|v| v.as_array().ok_or_else(|| type_error(self.path(key), "list")))
            .transpose()
    }

    pub fn req_list(&self, key: &str) -> Result<&'a Vec<Value>, DecodeError> {
        let v = self.required(key)?;
        v.as_array().ok_or_else(|| type_error(self.path(key), "list"))
    }

    pub fn opt_object(&self, key: &str) -> Result<Option<Args<'a>>, DecodeError> {
        self.get(key).map(|v| Args::object(v, self.path(key))).transpose()
    }

    pub fn req_object(&self, key: &str) -> Result<Args<'a>, DecodeError> {
        Args::object(self.required(key)?, self.path(key))
    }

    /// A two-number list such as an anchor `[u, v]`.
    pub fn opt_pair(&self, key: &str) -> Result<Option<(f64, f64)>, DecodeError> {
        self.get(key).map(|v| pair(v, &self.path(key), "[number, number]")).transpose()
    }

    pub fn opt_lat_lng(&self, key: &str) -> Result<Option<LatLng>, DecodeError> {
        self.get(key).map(|v| lat_lng(v, &self.path(key))).transpose()
    }

    pub fn req_lat_lng(&self, key: &str) -> Result<LatLng, DecodeError> {
        lat_lng(self.required(key)?, &self.path(key))
    }

    pub fn opt_lat_lng_list(&self, key: &str) -> Result<Option<Vec<LatLng>>, DecodeError> {
        let Some(items) = self.opt_list(key)? else {
            return Ok(None);
        };
        let path = self.path(key);
        items
            .iter()
            .enumerate()
            .map(|(i, v)| lat_lng(v, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Decode every element of a list of objects. Absent list → empty.
    pub fn list_of<T: Decode>(&self, key: &str) -> Result<Vec<T>, DecodeError> {
        let Some(items) = self.opt_list(key)? else {
            return Ok(Vec::new());
        };
        let path = self.path(key);
        items
            .iter()
            .enumerate()
            .map(|(i, v)| T::decode(&Args::object(v, format!("{path}[{i}]"))?))
            .collect()
    }

    /// A list of strings. Absent list → empty.
    pub fn strings(&self, key: &str) -> Result<Vec<String>, DecodeError> {
        let Some(items) = self.opt_list(key)? else {
            return Ok(Vec::new());
        };
        let path = self.path(key);
        items
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| type_error(format!("{path}[{i}]"), "string"))
            })
            .collect()
    }
}

fn number(v: &Value, path: impl FnOnce() -> String) -> Result<f64, DecodeError> {
    v.as_f64().ok_or_else(|| type_error(path(), "number"))
}

#[allow(clippy::cast_possible_truncation)]
fn integer(v: &Value, path: impl FnOnce() -> String) -> Result<i64, DecodeError> {
    if let Some(i) = v.as_i64() {
        return Ok(i);
    }
    match v.as_f64() {
        Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
        _ => Err(type_error(path(), "integer")),
    }
}

/// Decode a `[lat, lng]` pair.
///
/// # Errors
///
/// `DecodeError::Type` unless the value is a list of at least two numbers.
pub fn lat_lng(v: &Value, path: &str) -> Result<LatLng, DecodeError> {
    let (lat, lng) = pair(v, path, "[lat, lng]")?;
    Ok(LatLng::new(lat, lng))
}

fn pair(v: &Value, path: &str, expected: &'static str) -> Result<(f64, f64), DecodeError> {
    let bad = || type_error(path.to_string(), expected);
    let items = v.as_array().filter(|a| a.len() >= 2).ok_or_else(bad)?;
    match (items[0].as_f64(), items[1].as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(bad()),
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Argument-free queries answered straight from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    VisibleRegion,
    CompassEnabled,
    PitchGesturesEnabled,
    ScrollGesturesEnabled,
    ZoomGesturesEnabled,
    RotateGesturesEnabled,
    MyLocationButtonEnabled,
    MinMaxZoomLevels,
    ZoomLevel,
}

/// One decoded inbound method call.
#[derive(Debug, Clone)]
pub enum Command {
    UpdateAnnotations(BatchUpdate<Annotation>),
    ShowInfoWindow(String),
    HideInfoWindow(String),
    IsInfoWindowShown(String),
    UpdatePolylines(BatchUpdate<Polyline>),
    UpdatePolygons(BatchUpdate<Polygon>),
    UpdateCircles(BatchUpdate<Circle>),
    UpdateOptions(MapOptions),
    AnimateCamera(CameraUpdate),
    MoveCamera(CameraUpdate),
    /// `None` when the `annotation` field is absent or malformed.
    Convert(Option<LatLng>),
    TakeSnapshot(SnapshotOptions),
    LookAround { target: LatLng, categories: Vec<PoiCategory> },
    IsLookAroundAvailable(LatLng),
    Query(Query),
}

/// Decode one method call. `Ok(None)` means the method is unknown.
///
/// # Errors
///
/// Returns `DecodeError` when a required argument is missing or a present
/// argument has the wrong type.
pub fn decode(method: &str, data: &Data) -> Result<Option<Command>, DecodeError> {
    let args = Args::top(data);
    let cmd = match method {
        "annotations#update" => Command::UpdateAnnotations(BatchUpdate::decode(&args)?),
        "annotations#showInfoWindow" => Command::ShowInfoWindow(args.req_str("annotationId")?.to_string()),
        "annotations#hideInfoWindow" => Command::HideInfoWindow(args.req_str("annotationId")?.to_string()),
        "annotations#isInfoWindowShown" => Command::IsInfoWindowShown(args.req_str("annotationId")?.to_string()),
        "polylines#update" => Command::UpdatePolylines(BatchUpdate::decode(&args)?),
        "polygons#update" => Command::UpdatePolygons(BatchUpdate::decode(&args)?),
        "circles#update" => Command::UpdateCircles(BatchUpdate::decode(&args)?),
        "map#update" => Command::UpdateOptions(MapOptions::decode(&args.req_object("options")?)?),
        "camera#animate" => Command::AnimateCamera(CameraUpdate::decode_field(&args, "cameraUpdate")?),
        "camera#move" => Command::MoveCamera(CameraUpdate::decode_field(&args, "cameraUpdate")?),
        "camera#convert" => Command::Convert(args.opt_lat_lng("annotation").ok().flatten()),
        "map#takeSnapshot" => Command::TakeSnapshot(SnapshotOptions::decode(&args)?),
        "map#lookAround" => Command::LookAround {
            target: coordinate(&args)?,
            categories: args
                .strings("poi_filter")?
                .iter()
                .map(|name| PoiCategory::from_name(name))
                .collect(),
        },
        "map#isLookAroundAvailable" => Command::IsLookAroundAvailable(coordinate(&args)?),
        "map#getVisibleRegion" => Command::Query(Query::VisibleRegion),
        "map#isCompassEnabled" => Command::Query(Query::CompassEnabled),
        "map#isPitchGesturesEnabled" => Command::Query(Query::PitchGesturesEnabled),
        "map#isScrollGesturesEnabled" => Command::Query(Query::ScrollGesturesEnabled),
        "map#isZoomGesturesEnabled" => Command::Query(Query::ZoomGesturesEnabled),
        "map#isRotateGesturesEnabled" => Command::Query(Query::RotateGesturesEnabled),
        "map#isMyLocationButtonEnabled" => Command::Query(Query::MyLocationButtonEnabled),
        "map#getMinMaxZoomLevels" => Command::Query(Query::MinMaxZoomLevels),
        "camera#getZoomLevel" => Command::Query(Query::ZoomLevel),
        _ => return Ok(None),
    };
    Ok(Some(cmd))
}

fn coordinate(args: &Args<'_>) -> Result<LatLng, DecodeError> {
    Ok(LatLng::new(args.req_f64("latitude")?, args.req_f64("longitude")?))
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;
