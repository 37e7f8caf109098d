// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Geometry helpers for text regions
//!
//! All coordinates are pixel coordinates stored as `[x, y]`. A [`Quad`] produced
//! by this module is ordered clockwise starting at the top-left corner.

use image::{imageops, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use super::error::OcrError;

/// Crops at least this many times taller than wide are treated as vertical text
pub const VERTICAL_TEXT_RATIO: f32 = 1.5;

/// Boxes whose top-left corners are closer than this (vertically) share a line
pub const SAME_LINE_TOLERANCE: f32 = 10.0;

/// Boxes with an edge at or below this length after clipping are dropped
pub const MIN_BOX_EDGE: i32 = 3;

/// Replicated border around a crop source; bicubic reads two pixels past the sample
const CROP_MARGIN: u32 = 3;

/// Upper bound for the detection resize multiplier
const MAX_SCALE_FACTOR: u32 = 3;

/// Four-point polygon around a text region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub points: [[f32; 2]; 4],
}

impl Quad {
    pub const fn new(points: [[f32; 2]; 4]) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle as a quad
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new([
            [x, y],
            [x + width, y],
            [x + width, y + height],
            [x, y + height],
        ])
    }

    pub fn top_left(&self) -> [f32; 2] {
        self.points[0]
    }

    /// Length of the edge from the first to the second point
    pub fn top_edge(&self) -> f32 {
        distance(self.points[0], self.points[1])
    }

    /// Length of the edge from the first to the fourth point
    pub fn left_edge(&self) -> f32 {
        distance(self.points[0], self.points[3])
    }

    pub fn min_x(&self) -> f32 {
        self.points.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min)
    }

    pub fn max_x(&self) -> f32 {
        self.points.iter().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn min_y(&self) -> f32 {
        self.points.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min)
    }

    pub fn max_y(&self) -> f32 {
        self.points.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Rectangle summary of a quad, rounded to two decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Rotated rectangle described by its center, first-axis direction and half sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: [f32; 2],
    /// Unit vector along the first side
    pub axis: [f32; 2],
    /// Half lengths along `axis` and its perpendicular
    pub half_extents: [f32; 2],
}

impl RotatedRect {
    pub fn min_side(&self) -> f32 {
        2.0 * self.half_extents[0].min(self.half_extents[1])
    }

    pub fn area(&self) -> f32 {
        4.0 * self.half_extents[0] * self.half_extents[1]
    }

    pub fn perimeter(&self) -> f32 {
        4.0 * (self.half_extents[0] + self.half_extents[1])
    }

    /// Moves every side outward by `distance`
    pub fn expanded(&self, distance: f32) -> Self {
        Self {
            half_extents: [
                self.half_extents[0] + distance,
                self.half_extents[1] + distance,
            ],
            ..*self
        }
    }

    /// Corner points ordered clockwise from the top-left
    pub fn corners(&self) -> Quad {
        let [cx, cy] = self.center;
        let [ux, uy] = self.axis;
        let (vx, vy) = (-uy, ux);
        let [hu, hv] = self.half_extents;

        order_points_clockwise([
            [cx - ux * hu - vx * hv, cy - uy * hu - vy * hv],
            [cx + ux * hu - vx * hv, cy + uy * hu - vy * hv],
            [cx + ux * hu + vx * hv, cy + uy * hu + vy * hv],
            [cx - ux * hu + vx * hv, cy - uy * hu + vy * hv],
        ])
    }
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

fn round_half_even(value: f64) -> u32 {
    let floor = value.floor();
    let diff = value - floor;
    let rounded = if diff > 0.5 || (diff == 0.5 && floor % 2.0 != 0.0) {
        floor + 1.0
    } else {
        floor
    };
    rounded.max(0.0) as u32
}

/// Target dimensions for the detection resize
///
/// The long side becomes `base_size` times a multiplier in `1..=3`; the short side
/// is derived from the rounded aspect ratio and snapped toward a multiple of
/// `base_size`.
pub fn resize_target_dimensions(
    width: u32,
    height: u32,
    base_size: u32,
) -> Result<(u32, u32), OcrError> {
    if width == 0 || height == 0 || base_size == 0 {
        return Err(OcrError::InvalidDimensions(width, height));
    }

    let long_side = width.max(height);
    let scale = round_half_even(long_side as f64 / base_size as f64).clamp(1, MAX_SCALE_FACTOR);
    let new_long = base_size * scale;

    if width > height {
        Ok((new_long, snapped_short_side(new_long, width, height, base_size)))
    } else {
        Ok((snapped_short_side(new_long, height, width, base_size), new_long))
    }
}

fn snapped_short_side(new_long: u32, long: u32, short: u32, base_size: u32) -> u32 {
    let aspect = round_half_even(long as f64 / short as f64).max(1);
    let short_side = (new_long / aspect).max(base_size);
    if short_side % base_size > 0 && aspect > 1 {
        (new_long / (aspect - 1)).max(base_size)
    } else {
        short_side
    }
}

/// Orders four points as top-left, top-right, bottom-right, bottom-left
///
/// Points are split into a left and right pair by x; within each pair the
/// smaller y comes first.
pub fn order_points_clockwise(points: [[f32; 2]; 4]) -> Quad {
    let mut sorted = points;
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]));

    let (top_left, bottom_left) = if sorted[0][1] <= sorted[1][1] {
        (sorted[0], sorted[1])
    } else {
        (sorted[1], sorted[0])
    };
    let (top_right, bottom_right) = if sorted[2][1] <= sorted[3][1] {
        (sorted[2], sorted[3])
    } else {
        (sorted[3], sorted[2])
    };

    Quad::new([top_left, top_right, bottom_right, bottom_left])
}

/// Clamps every point into `[0, width-1] x [0, height-1]`
pub fn clip_quad(quad: &Quad, width: u32, height: u32) -> Quad {
    let max_x = width.saturating_sub(1) as f32;
    let max_y = height.saturating_sub(1) as f32;
    Quad::new(
        quad.points
            .map(|[x, y]| [x.clamp(0.0, max_x), y.clamp(0.0, max_y)]),
    )
}

/// Orders, clips and filters raw detections, then sorts them into reading order
pub fn filter_and_order_boxes(boxes: Vec<Quad>, width: u32, height: u32) -> Vec<Quad> {
    let kept = boxes
        .into_iter()
        .map(|quad| clip_quad(&order_points_clockwise(quad.points), width, height))
        .filter(|quad| {
            (quad.top_edge() as i32) > MIN_BOX_EDGE && (quad.left_edge() as i32) > MIN_BOX_EDGE
        })
        .collect();

    sort_reading_order(kept)
}

/// Sorts boxes top-to-bottom, then left-to-right within a line
///
/// After the primary (y, x) sort a single backward bubble pass swaps neighbors
/// whose tops are within [`SAME_LINE_TOLERANCE`] but whose x order is reversed.
pub fn sort_reading_order(mut boxes: Vec<Quad>) -> Vec<Quad> {
    boxes.sort_by(|a, b| {
        let [ax, ay] = a.top_left();
        let [bx, by] = b.top_left();
        ay.total_cmp(&by).then(ax.total_cmp(&bx))
    });

    for i in 0..boxes.len().saturating_sub(1) {
        for j in (0..=i).rev() {
            let [x_next, y_next] = boxes[j + 1].top_left();
            let [x_cur, y_cur] = boxes[j].top_left();
            if (y_next - y_cur).abs() < SAME_LINE_TOLERANCE && x_next < x_cur {
                boxes.swap(j, j + 1);
            } else {
                break;
            }
        }
    }

    boxes
}

/// Smallest-area rectangle enclosing `points` (rotating calipers over the hull)
pub fn min_area_rect(points: &[Point<i32>]) -> Option<RotatedRect> {
    let hull: Vec<[f64; 2]> = convex_hull(points)
        .into_iter()
        .map(|p| [p.x as f64, p.y as f64])
        .collect();

    match hull.len() {
        0 => None,
        1 => Some(RotatedRect {
            center: [hull[0][0] as f32, hull[0][1] as f32],
            axis: [1.0, 0.0],
            half_extents: [0.0, 0.0],
        }),
        n => {
            let mut best: Option<(f64, RotatedRect)> = None;
            for i in 0..n {
                let (a, b) = (hull[i], hull[(i + 1) % n]);
                let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
                let len = dx.hypot(dy);
                if len == 0.0 {
                    continue;
                }
                let u = [dx / len, dy / len];
                let v = [-u[1], u[0]];

                let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
                let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
                for p in &hull {
                    let pu = p[0] * u[0] + p[1] * u[1];
                    let pv = p[0] * v[0] + p[1] * v[1];
                    min_u = min_u.min(pu);
                    max_u = max_u.max(pu);
                    min_v = min_v.min(pv);
                    max_v = max_v.max(pv);
                }

                let area = (max_u - min_u) * (max_v - min_v);
                if best.as_ref().map_or(true, |(best_area, _)| area < *best_area) {
                    let (cu, cv) = ((min_u + max_u) / 2.0, (min_v + max_v) / 2.0);
                    let rect = RotatedRect {
                        center: [
                            (u[0] * cu + v[0] * cv) as f32,
                            (u[1] * cu + v[1] * cv) as f32,
                        ],
                        axis: [u[0] as f32, u[1] as f32],
                        half_extents: [
                            ((max_u - min_u) / 2.0) as f32,
                            ((max_v - min_v) / 2.0) as f32,
                        ],
                    };
                    best = Some((area, rect));
                }
            }
            best.map(|(_, rect)| rect)
        }
    }
}

/// Rectifies the quad region into an upright crop
///
/// Crop size is the longer of each pair of opposite edges, truncated. Crops
/// at least [`VERTICAL_TEXT_RATIO`] times taller than wide are rotated 90°
/// counter-clockwise. Samples past the image edge repeat the nearest edge
/// pixel. Degenerate quads yield a 0x0 image.
pub fn perspective_crop(image: &RgbImage, quad: &Quad) -> RgbImage {
    let [p0, p1, p2, p3] = quad.points;
    let crop_width = distance(p0, p1).max(distance(p2, p3)) as u32;
    let crop_height = distance(p0, p3).max(distance(p1, p2)) as u32;
    if crop_width == 0 || crop_height == 0 {
        return RgbImage::new(0, 0);
    }

    let Some((window, [ox, oy])) = replicated_window(image, quad) else {
        return RgbImage::new(0, 0);
    };

    let (w, h) = (crop_width as f32, crop_height as f32);
    let from = [p0, p1, p2, p3].map(|[x, y]| (x - ox, y - oy));
    let to = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let Some(projection) = Projection::from_control_points(from, to) else {
        return RgbImage::new(0, 0);
    };

    let mut crop = RgbImage::new(crop_width, crop_height);
    warp_into(&window, &projection, Interpolation::Bicubic, Rgb([0, 0, 0]), &mut crop);

    if h / w >= VERTICAL_TEXT_RATIO {
        imageops::rotate270(&crop)
    } else {
        crop
    }
}

/// Copy of the quad's surroundings with edge pixels repeated past the image border
///
/// Returns the window and its offset in image coordinates.
fn replicated_window(image: &RgbImage, quad: &Quad) -> Option<(RgbImage, [f32; 2])> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || quad.points.iter().flatten().any(|v| !v.is_finite()) {
        return None;
    }

    let margin = i64::from(CROP_MARGIN);
    let x0 = quad.min_x().floor() as i64 - margin;
    let y0 = quad.min_y().floor() as i64 - margin;
    let x1 = quad.max_x().ceil() as i64 + margin;
    let y1 = quad.max_y().ceil() as i64 + margin;
    let (max_x, max_y) = (i64::from(width) - 1, i64::from(height) - 1);

    let window = RgbImage::from_fn((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32, |x, y| {
        let sx = (x0 + i64::from(x)).clamp(0, max_x) as u32;
        let sy = (y0 + i64::from(y)).clamp(0, max_y) as u32;
        *image.get_pixel(sx, sy)
    });

    Some((window, [x0 as f32, y0 as f32]))
}

/// Bounding rectangle reported for a quad
///
/// Origin is the quad's first (top-left) point; width and height are the
/// extents of all four points. Values are rounded to two decimals.
pub fn bounding_rect(quad: &Quad) -> BoundingBox {
    let [x, y] = quad.top_left();
    BoundingBox {
        x: round2(x as f64),
        y: round2(y as f64),
        width: round2((quad.max_x() - quad.min_x()) as f64),
        height: round2((quad.max_y() - quad.min_y()) as f64),
    }
}

/// Rounds half away from zero at the second decimal
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fixed two-decimal rendering used in responses
pub fn to_fixed(value: f64) -> String {
    format!("{:.2}", round2(value))
}
