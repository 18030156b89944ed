//! Normalize GPS tracks into a small SVG viewBox polyline

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::models::{Activity, Coordinate};

/// Target box of the projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub width: f64,
    pub height: f64,
    /// Inset applied on every side
    pub padding: f64,
}

impl Default for ViewBox {
    fn default() -> Self {
        ViewBox {
            width: 100.0,
            height: 40.0,
            padding: 0.0,
        }
    }
}

impl ViewBox {
    pub fn new(width: f64, height: f64, padding: f64) -> Self {
        ViewBox { width, height, padding }
    }

    fn inner_width(&self) -> f64 {
        (self.width - 2.0 * self.padding).max(0.0)
    }

    fn inner_height(&self) -> f64 {
        (self.height - 2.0 * self.padding).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// `None` for an empty track
    pub fn from_coordinates(coordinates: &[Coordinate]) -> Option<Self> {
        let first = coordinates.first()?;
        let init = BoundingBox {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lng: first.lng,
            max_lng: first.lng,
        };

        Some(coordinates.iter().fold(init, |b, c| BoundingBox {
            min_lat: b.min_lat.min(c.lat),
            max_lat: b.max_lat.max(c.lat),
            min_lng: b.min_lng.min(c.lng),
            max_lng: b.max_lng.max(c.lng),
        }))
    }

    /// Latitude range, 1 when all points share a latitude
    pub fn lat_range(&self) -> f64 {
        non_zero(self.max_lat - self.min_lat)
    }

    /// Longitude range, 1 when all points share a longitude
    pub fn lng_range(&self) -> f64 {
        non_zero(self.max_lng - self.min_lng)
    }
}

fn non_zero(range: f64) -> f64 {
    if range == 0.0 {
        1.0
    } else {
        range
    }
}

/// Point in viewBox space, y grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Project a track into the view box. North is up.
pub fn project(coordinates: &[Coordinate], view: ViewBox) -> Vec<Point> {
    let Some(bounds) = BoundingBox::from_coordinates(coordinates) else {
        return Vec::new();
    };

    coordinates
        .iter()
        .map(|c| Point {
            x: view.padding + (c.lng - bounds.min_lng) / bounds.lng_range() * view.inner_width(),
            y: view.padding + (1.0 - (c.lat - bounds.min_lat) / bounds.lat_range()) * view.inner_height(),
        })
        .collect()
}

/// SVG path data `M x y L x y ...` with one decimal. Tracks with fewer than two
/// points have no path.
pub fn svg_path(coordinates: &[Coordinate], view: ViewBox) -> Option<String> {
    if coordinates.len() < 2 {
        return None;
    }

    let mut path = String::new();
    for (idx, point) in project(coordinates, view).iter().enumerate() {
        if idx > 0 {
            path.push(' ');
        }
        let command = if idx == 0 { 'M' } else { 'L' };
        // Writing into a String cannot fail
        let _ = write!(path, "{} {:.1} {:.1}", command, point.x, point.y);
    }
    Some(path)
}

/// Fractional part of `sin(seed) * 10000`, a repeatable value in `[0, 1)`
fn noise(seed: f64) -> f64 {
    let x = seed.sin() * 10_000.0;
    x - x.floor()
}

/// Stand-in squiggle for activities without a usable track. The same `seed`
/// always yields the same path. Drawn in a 100x40 reference box, then scaled.
pub fn placeholder_path(seed: &str, view: ViewBox) -> String {
    let seed: f64 = seed.chars().map(|c| f64::from(u32::from(c))).sum();
    let (scale_x, scale_y) = (view.width / 100.0, view.height / 40.0);

    let mut x = 10.0 + noise(seed) * 20.0;
    let mut y = 10.0 + noise(seed + 1.0) * 20.0;
    let mut path = format!("M {:.1} {:.1}", x * scale_x, y * scale_y);

    for step in 0..8 {
        let offset = seed + f64::from(step) * 2.0;
        x = (x + (noise(offset) - 0.5) * 40.0).clamp(5.0, 95.0);
        y = (y + (noise(offset + 1.0) - 0.5) * 20.0).clamp(5.0, 35.0);
        let _ = write!(path, " L {:.1} {:.1}", x * scale_x, y * scale_y);
    }
    path
}

/// Route sketch of one activity: its projected GPS track, or a placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSketch {
    pub activity_id: String,
    /// Track bounds, absent for placeholders
    pub bounds: Option<BoundingBox>,
    pub path: String,
    pub placeholder: bool,
}

impl RouteSketch {
    /// Sketch of the recorded track, `None` with fewer than two points
    pub fn from_track(activity: &Activity, view: ViewBox) -> Option<Self> {
        let coordinates = activity.coordinates.as_deref()?;
        let path = svg_path(coordinates, view)?;
        let bounds = BoundingBox::from_coordinates(coordinates)?;

        Some(RouteSketch {
            activity_id: activity.id.clone(),
            bounds: Some(bounds),
            path,
            placeholder: false,
        })
    }

    /// Track sketch, falling back to a placeholder seeded by the activity id
    pub fn for_activity(activity: &Activity, view: ViewBox) -> Self {
        Self::from_track(activity, view).unwrap_or_else(|| RouteSketch {
            activity_id: activity.id.clone(),
            bounds: None,
            path: placeholder_path(&activity.id, view),
            placeholder: true,
        })
    }
}

/// One sketch per activity
pub fn route_sketches(activities: &[Activity], view: ViewBox) -> Vec<RouteSketch> {
    let sketches: Vec<RouteSketch> = activities
        .iter()
        .map(|a| RouteSketch::for_activity(a, view))
        .collect();

    tracing::debug!(
        activities = activities.len(),
        placeholders = sketches.iter().filter(|s| s.placeholder).count(),
        "Projected route sketches"
    );

    sketches
}
