//! Map options (`map#update`) and the engine settings they drive.
//!
//! Every option is optional: an update touches only the fields it names.

use serde_json::{Value, json};

use crate::codec::{Args, Decode, DecodeError};
use crate::geo::ZoomRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapType {
    #[default]
    Standard,
    Satellite,
    Hybrid,
}

impl MapType {
    fn from_index(i: i64) -> Self {
        match i {
            1 => Self::Satellite,
            2 => Self::Hybrid,
            _ => Self::Standard,
        }
    }
}

/// User-location tracking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    #[default]
    None,
    Follow,
    FollowWithHeading,
}

impl TrackingMode {
    fn from_index(i: i64) -> Self {
        match i {
            1 => Self::Follow,
            2 => Self::FollowWithHeading,
            _ => Self::None,
        }
    }
}

/// Edge insets in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

/// A partial options update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapOptions {
    pub compass_enabled: Option<bool>,
    pub traffic_enabled: Option<bool>,
    pub map_type: Option<MapType>,
    /// `[min, max]`; a `None` bound means unbounded on that side.
    pub min_max_zoom: Option<(Option<f64>, Option<f64>)>,
    pub rotate_gestures_enabled: Option<bool>,
    pub scroll_gestures_enabled: Option<bool>,
    pub pitch_gestures_enabled: Option<bool>,
    pub zoom_gestures_enabled: Option<bool>,
    pub my_location_enabled: Option<bool>,
    pub my_location_button_enabled: Option<bool>,
    pub padding: Option<Padding>,
    pub tracking_mode: Option<TrackingMode>,
    pub insets_layout_margins_from_safe_area: Option<bool>,
}

impl Decode for MapOptions {
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError> {
        let min_max_zoom = args
            .opt_list("minMaxZoomPreference")?
            .map(|bounds| {
                let bound = |i: usize| -> Result<Option<f64>, DecodeError> {
                    match bounds.get(i) {
                        None | Some(Value::Null) => Ok(None),
                        Some(v) => v.as_f64().map(Some).ok_or_else(|| DecodeError::Type {
                            field: format!("{}[{i}]", args.path("minMaxZoomPreference")),
                            expected: "number or null",
                        }),
                    }
                };
                Ok::<_, DecodeError>((bound(0)?, bound(1)?))
            })
            .transpose()?;

        let padding = args
            .opt_list("padding")?
            .map(|edges| {
                let edge = |i: usize| -> Result<f64, DecodeError> {
                    edges.get(i).and_then(Value::as_f64).ok_or_else(|| DecodeError::Type {
                        field: args.path("padding"),
                        expected: "[top, left, bottom, right]",
                    })
                };
                Ok::<_, DecodeError>(Padding { top: edge(0)?, left: edge(1)?, bottom: edge(2)?, right: edge(3)? })
            })
            .transpose()?;

        Ok(Self {
            compass_enabled: args.opt_bool("compassEnabled")?,
            traffic_enabled: args.opt_bool("trafficEnabled")?,
            map_type: args.opt_i64("mapType")?.map(MapType::from_index),
            min_max_zoom,
            rotate_gestures_enabled: args.opt_bool("rotateGesturesEnabled")?,
            scroll_gestures_enabled: args.opt_bool("scrollGesturesEnabled")?,
            pitch_gestures_enabled: args.opt_bool("pitchGesturesEnabled")?,
            zoom_gestures_enabled: args.opt_bool("zoomGesturesEnabled")?,
            my_location_enabled: args.opt_bool("myLocationEnabled")?,
            my_location_button_enabled: args.opt_bool("myLocationButtonEnabled")?,
            padding,
            tracking_mode: args.opt_i64("trackingMode")?.map(TrackingMode::from_index),
            insets_layout_margins_from_safe_area: args.opt_bool("insetsLayoutMarginsFromSafeArea")?,
        })
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Effective engine settings. Answers the `map#is*Enabled` queries.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub compass_enabled: bool,
    pub traffic_enabled: bool,
    pub map_type: MapType,
    pub zoom_range: ZoomRange,
    pub rotate_gestures_enabled: bool,
    pub scroll_gestures_enabled: bool,
    pub pitch_gestures_enabled: bool,
    pub zoom_gestures_enabled: bool,
    pub my_location_enabled: bool,
    pub my_location_button_enabled: bool,
    pub padding: Padding,
    pub tracking_mode: TrackingMode,
    pub insets_layout_margins_from_safe_area: bool,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            compass_enabled: true,
            traffic_enabled: false,
            map_type: MapType::Standard,
            zoom_range: ZoomRange::default(),
            rotate_gestures_enabled: true,
            scroll_gestures_enabled: true,
            pitch_gestures_enabled: true,
            zoom_gestures_enabled: true,
            my_location_enabled: false,
            my_location_button_enabled: false,
            padding: Padding::default(),
            tracking_mode: TrackingMode::None,
            insets_layout_margins_from_safe_area: true,
        }
    }
}

impl MapSettings {
    /// Merge a partial update. Fields absent from `options` are untouched.
    pub fn apply(&mut self, options: &MapOptions) {
        fn set<T: Copy>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        set(&mut self.compass_enabled, options.compass_enabled);
        set(&mut self.traffic_enabled, options.traffic_enabled);
        set(&mut self.map_type, options.map_type);
        set(&mut self.rotate_gestures_enabled, options.rotate_gestures_enabled);
        set(&mut self.scroll_gestures_enabled, options.scroll_gestures_enabled);
        set(&mut self.pitch_gestures_enabled, options.pitch_gestures_enabled);
        set(&mut self.zoom_gestures_enabled, options.zoom_gestures_enabled);
        set(&mut self.my_location_enabled, options.my_location_enabled);
        set(&mut self.my_location_button_enabled, options.my_location_button_enabled);
        set(&mut self.padding, options.padding);
        set(&mut self.tracking_mode, options.tracking_mode);
        set(&mut self.insets_layout_margins_from_safe_area, options.insets_layout_margins_from_safe_area);

        if let Some((min, max)) = options.min_max_zoom {
            let defaults = ZoomRange::default();
            let min = min.unwrap_or(defaults.min);
            let max = max.unwrap_or(defaults.max);
            // An inverted preference is ignored rather than producing an empty range.
            if min <= max {
                self.zoom_range = ZoomRange { min, max };
            }
        }
    }

    /// Protocol shape for `map#getMinMaxZoomLevels`.
    #[must_use]
    pub fn zoom_levels_value(&self) -> Value {
        json!([self.zoom_range.min, self.zoom_range.max])
    }
}

#[cfg(test)]
#[path = "options_test.rs"]
mod tests;
