//! Detection annotator
//!
//! Draws boxes, corner accents and disease labels onto a copy of the input
//! frame and enriches every detection with its resolved disease profile.

use crate::processing::text::{draw_text_mut, text_size};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use leafscan_core::{DetectionSettings, EnrichedDetection, RawDetection, Rgb as RgbTriple};
use tracing::debug;

/// Label text color
pub const TEXT_COLOR: [u8; 3] = [240, 237, 230];
/// Length of each corner accent stroke
pub const CORNER_LENGTH: i32 = 15;
/// Label glyph scale (8px font cells)
pub const LABEL_SCALE: u32 = 2;
/// Padding around label text
const LABEL_PADDING: i32 = 5;
/// Box coordinates are clamped this far outside the frame before drawing
const COORD_MARGIN: f32 = 65_536.0;
/// Upper bound on drawn line thickness
const MAX_THICKNESS: u32 = 64;

pub const HUD_HEIGHT: u32 = 36;
pub const HUD_COLOR: [u8; 3] = [26, 42, 26];
pub const HUD_ALPHA: f32 = 0.6;
pub const HUD_TEXT_COLOR: [u8; 3] = [180, 220, 180];
const HUD_SCALE: u32 = 1;

/// Display options for one annotation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayOptions {
    pub show_labels: bool,
    pub show_confidence: bool,
    pub box_color: RgbTriple,
    pub line_thickness: u32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::from(&DetectionSettings::default())
    }
}

impl From<&DetectionSettings> for DisplayOptions {
    fn from(settings: &DetectionSettings) -> Self {
        Self {
            show_labels: settings.show_labels,
            show_confidence: settings.show_confidence,
            box_color: settings.box_color,
            line_thickness: settings.line_thickness,
        }
    }
}

/// Annotated frame and the detections drawn on it, in input order
#[derive(Debug, Clone)]
pub struct Annotation {
    pub image: RgbImage,
    pub detections: Vec<EnrichedDetection>,
}

/// Compose a label from the enabled parts, or `None` when both are off
pub fn compose_label(display_name: &str, confidence: f32, show_labels: bool, show_confidence: bool) -> Option<String> {
    match (show_labels, show_confidence) {
        (true, true) => Some(format!("{}  {:.2}", display_name, confidence)),
        (true, false) => Some(display_name.to_string()),
        (false, true) => Some(format!("{:.2}", confidence)),
        (false, false) => None,
    }
}

/// Annotate `image` with `detections`. The input is never modified.
pub fn annotate(image: &RgbImage, detections: &[RawDetection], options: &DisplayOptions) -> Annotation {
    let mut canvas = image.clone();
    let mut enriched = Vec::with_capacity(detections.len());

    for raw in detections {
        let detection = EnrichedDetection::from_raw(raw);
        draw_detection(&mut canvas, &detection, options);
        enriched.push(detection);
    }

    debug!("Annotated {} detections", enriched.len());
    Annotation {
        image: canvas,
        detections: enriched,
    }
}

fn draw_detection(canvas: &mut RgbImage, detection: &EnrichedDetection, options: &DisplayOptions) {
    let color = Rgb(options.box_color);
    let thickness = options.line_thickness.clamp(1, MAX_THICKNESS) as i32;

    let (width, height) = canvas.dimensions();
    let x1 = to_pixel(detection.bbox.x1, width);
    let y1 = to_pixel(detection.bbox.y1, height);
    let x2 = to_pixel(detection.bbox.x2, width);
    let y2 = to_pixel(detection.bbox.y2, height);

    draw_outline(canvas, (x1, y1, x2, y2), thickness, color);

    let accent = thickness + 1;
    for (corner, dx, dy) in [
        ((x1, y1), 1, 1),
        ((x2, y1), -1, 1),
        ((x1, y2), 1, -1),
        ((x2, y2), -1, -1),
    ] {
        stroke(canvas, corner, dx * CORNER_LENGTH, 0, accent, color);
        stroke(canvas, corner, 0, dy * CORNER_LENGTH, accent, color);
    }

    if let Some(label) = compose_label(
        detection.display_name(),
        detection.confidence,
        options.show_labels,
        options.show_confidence,
    ) {
        let (lw, lh) = text_size(&label, LABEL_SCALE);
        let (lw, lh) = (lw as i32, lh as i32);
        let background_top = y1 - lh - 2 * LABEL_PADDING;
        fill(canvas, x1, background_top, lw + 2 * LABEL_PADDING, lh + 2 * LABEL_PADDING, color);
        draw_text_mut(
            canvas,
            Rgb(TEXT_COLOR),
            x1 + LABEL_PADDING,
            y1 - LABEL_PADDING - lh,
            LABEL_SCALE,
            &label,
        );
    }
}

/// Model coordinate to a pixel coordinate the drawing arithmetic can hold.
/// NaN maps to 0.
fn to_pixel(value: f32, limit: u32) -> i32 {
    value.clamp(-COORD_MARGIN, limit as f32 + COORD_MARGIN) as i32
}

/// Rectangle outline growing inward from the box edges
fn draw_outline(canvas: &mut RgbImage, (x1, y1, x2, y2): (i32, i32, i32, i32), thickness: i32, color: Rgb<u8>) {
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));

    for inset in 0..thickness {
        let width = right - left - 2 * inset + 1;
        let height = bottom - top - 2 * inset + 1;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(left + inset, top + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Axis-aligned stroke starting at `from`, extending `dx` or `dy` pixels
fn stroke(canvas: &mut RgbImage, from: (i32, i32), dx: i32, dy: i32, width: i32, color: Rgb<u8>) {
    let half = width / 2;
    let (x, y) = from;
    if dy == 0 {
        fill(canvas, x.min(x + dx), y - half, dx.abs() + 1, width, color);
    } else {
        fill(canvas, x - half, y.min(y + dy), width, dy.abs() + 1, color);
    }
}

fn fill(canvas: &mut RgbImage, x: i32, y: i32, width: i32, height: i32, color: Rgb<u8>) {
    if width <= 0 || height <= 0 {
        return;
    }
    draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(width as u32, height as u32), color);
}

/// Status line shown on camera frames
pub fn hud_status(time: &str, fps: f64, detections: usize) -> String {
    format!("LeafScan  |  {}  |  {:.1} fps  |  {} det", time, fps, detections)
}

/// Blend a translucent status bar over the bottom of `image` and write
/// `text` on it.
pub fn draw_hud(image: &mut RgbImage, text: &str) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let bar_height = HUD_HEIGHT.min(height);
    let top = height - bar_height;
    for y in top..height {
        for x in 0..width {
            let pixel = image.get_pixel_mut(x, y);
            for (channel, overlay) in pixel.0.iter_mut().zip(HUD_COLOR) {
                let blended = HUD_ALPHA * overlay as f32 + (1.0 - HUD_ALPHA) * *channel as f32;
                *channel = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let (_, text_height) = text_size(text, HUD_SCALE);
    let text_top = height as i32 - 10 - text_height as i32;
    draw_text_mut(image, Rgb(HUD_TEXT_COLOR), 10, text_top, HUD_SCALE, text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafscan_core::BoundingBox;

    fn raw(label: &str, confidence: f32, bbox: (f32, f32, f32, f32)) -> RawDetection {
        RawDetection::new(0, label, confidence, BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3))
    }

    fn gray(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([128, 128, 128]))
    }

    #[test]
    fn test_compose_label() {
        assert_eq!(compose_label("Black Rot", 0.92, true, true).unwrap(), "Black Rot  0.92");
        assert_eq!(compose_label("Black Rot", 0.92, true, false).unwrap(), "Black Rot");
        assert_eq!(compose_label("Black Rot", 0.915, false, true).unwrap(), "0.92");
        assert!(compose_label("Black Rot", 0.92, false, false).is_none());
    }

    #[test]
    fn test_zero_detections_copy_input() {
        let image = gray(50, 40);
        let annotation = annotate(&image, &[], &DisplayOptions::default());
        assert_eq!(annotation.image, image);
        assert!(annotation.detections.is_empty());
    }

    #[test]
    fn test_input_not_mutated() {
        let image = gray(120, 120);
        let before = image.clone();
        let annotation = annotate(&image, &[raw("black rot", 0.9, (20.0, 40.0, 90.0, 100.0))], &DisplayOptions::default());
        assert_eq!(image, before);
        assert_ne!(annotation.image, image);
    }

    #[test]
    fn test_box_outline_uses_color() {
        let image = gray(100, 100);
        let options = DisplayOptions {
            show_labels: false,
            show_confidence: false,
            box_color: [201, 168, 80],
            line_thickness: 2,
        };
        let annotation = annotate(&image, &[raw("healthy", 0.8, (30.0, 30.0, 80.0, 80.0))], &options);
        let out = &annotation.image;
        assert_eq!(out.get_pixel(55, 30).0, [201, 168, 80]);
        assert_eq!(out.get_pixel(55, 31).0, [201, 168, 80]);
        assert_eq!(out.get_pixel(80, 55).0, [201, 168, 80]);
        // Interior untouched
        assert_eq!(out.get_pixel(55, 55).0, [128, 128, 128]);
    }

    #[test]
    fn test_corner_accent_is_drawn() {
        let image = gray(100, 100);
        let options = DisplayOptions {
            show_labels: false,
            show_confidence: false,
            box_color: [210, 64, 46],
            line_thickness: 1,
        };
        let annotation = annotate(&image, &[raw("scab", 0.8, (40.0, 40.0, 90.0, 90.0))], &options);
        // Accent runs 15px along the top edge and is thicker than the outline.
        assert_eq!(annotation.image.get_pixel(52, 39).0, [210, 64, 46]);
        assert_eq!(annotation.image.get_pixel(65, 39).0, [128, 128, 128]);
    }

    #[test]
    fn test_label_background_above_box() {
        let image = gray(200, 200);
        let options = DisplayOptions::default();
        let annotation = annotate(&image, &[raw("black rot", 0.92, (10.0, 60.0, 100.0, 150.0))], &options);
        let out = &annotation.image;
        let (_, lh) = text_size("Black Rot  0.92", LABEL_SCALE);
        let background_top = 60 - lh as i32 - 10;
        let mut found_text = false;
        for y in background_top.max(0) as u32..60 {
            for x in 10..120 {
                let p = out.get_pixel(x, y).0;
                assert_ne!(p, [128, 128, 128], "label background left a gap at ({}, {})", x, y);
                if p == TEXT_COLOR {
                    found_text = true;
                }
            }
        }
        assert!(found_text);
    }

    #[test]
    fn test_enriched_in_input_order() {
        let image = gray(300, 300);
        let detections = vec![
            raw("Apple___Black_rot", 0.7, (10.0, 30.0, 50.0, 60.0)),
            raw("rust", 0.6, (100.0, 130.0, 150.0, 160.0)),
            raw("banana", 0.5, (200.0, 230.0, 250.0, 260.0)),
        ];
        let annotation = annotate(&image, &detections, &DisplayOptions::default());
        let keys: Vec<&str> = annotation.detections.iter().map(|d| d.profile.key).collect();
        assert_eq!(keys, vec!["black_rot", "cedar_apple_rust", "unknown"]);
        assert_eq!(annotation.detections[2].display_name(), "banana");
    }

    #[test]
    fn test_out_of_bounds_box_is_clipped() {
        let image = gray(64, 64);
        let annotation = annotate(&image, &[raw("healthy", 0.9, (-40.0, -40.0, 500.0, 500.0))], &DisplayOptions::default());
        assert_eq!(annotation.image.dimensions(), (64, 64));
        assert_eq!(annotation.detections.len(), 1);
    }

    #[test]
    fn test_extreme_box_coordinates() {
        let image = gray(64, 64);
        let options = DisplayOptions::default();
        for bbox in [
            (-1e10, -1e10, 1e10, 1e10),
            (f32::NEG_INFINITY, 10.0, f32::INFINITY, 50.0),
            (f32::NAN, f32::NAN, 30.0, 30.0),
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        ] {
            let annotation = annotate(&image, &[raw("black rot", 0.9, bbox)], &options);
            assert_eq!(annotation.image.dimensions(), (64, 64));
            assert_eq!(annotation.detections.len(), 1);
        }
    }

    #[test]
    fn test_huge_box_still_outlines_visible_edges() {
        let image = gray(64, 64);
        let options = DisplayOptions {
            show_labels: false,
            show_confidence: false,
            box_color: [201, 168, 80],
            line_thickness: 1,
        };
        let annotation = annotate(&image, &[raw("healthy", 0.9, (20.0, 20.0, 1e10, 1e10))], &options);
        assert_eq!(annotation.image.get_pixel(40, 20).0, [201, 168, 80]);
        assert_eq!(annotation.image.get_pixel(40, 40).0, [128, 128, 128]);
    }

    #[test]
    fn test_oversized_thickness_is_bounded() {
        let options = DisplayOptions {
            line_thickness: u32::MAX,
            ..DisplayOptions::default()
        };
        let annotation = annotate(&gray(32, 32), &[raw("scab", 0.5, (4.0, 4.0, 28.0, 28.0))], &options);
        assert_eq!(annotation.detections.len(), 1);
    }

    #[test]
    fn test_hud_blends_bottom_bar() {
        let mut image = RgbImage::from_pixel(200, 80, Rgb([255, 255, 255]));
        draw_hud(&mut image, "");
        // 0.6 * 26 + 0.4 * 255 = 117.6
        assert_eq!(image.get_pixel(5, 79).0, [118, 127, 118]);
        assert_eq!(image.get_pixel(5, 10).0, [255, 255, 255]);
    }

    #[test]
    fn test_hud_status() {
        assert_eq!(
            hud_status("14:03:09", 12.345, 2),
            "LeafScan  |  14:03:09  |  12.3 fps  |  2 det"
        );
    }
}
