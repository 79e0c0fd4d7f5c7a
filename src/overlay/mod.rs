//! Overlay rendering: composes the latest source frame with bounding boxes
//! and emotion labels from the latest classification. Runs as its own
//! periodic task at display cadence, decoupled from the 1 Hz analysis
//! cadence so playback stays smooth while results trickle in.

use std::sync::{Arc, RwLock};

use image::{Rgba, RgbaImage, RgbImage};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::model::{BoundingBox, EmotionReading};
use crate::timeline::SharedTimeline;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::log_info;

pub const RENDER_INTERVAL: Duration = Duration::from_millis(33);

const BOX_STROKE: Rgba<u8> = Rgba([59, 130, 246, 255]);
const PLATE_FILL: Rgba<u8> = Rgba([59, 130, 246, 204]);
const PLATE_HEIGHT: f32 = 20.0;
// Rough advance width for the 13px label font.
const GLYPH_WIDTH: f32 = 7.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlate {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Box(BoundingBox),
    Label(LabelPlate),
}

/// A composed display frame: the rasterized image plus the scene that was
/// burned into it (label text included, for presentation layers that render
/// their own type).
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub image: RgbaImage,
    pub scene: Vec<OverlayShape>,
}

/// Build the overlay scene for one reading: a stroked rectangle per face
/// and, where the face carries scores, a label plate above the box with the
/// dominant emotion and its percentage. No faces, nothing to draw.
pub fn build_scene(reading: Option<&EmotionReading>) -> Vec<OverlayShape> {
    let mut scene = Vec::new();
    let Some(reading) = reading else {
        return scene;
    };

    for face in &reading.faces {
        let bbox = face.bounding_box;
        scene.push(OverlayShape::Box(bbox));

        if let Some(dominant) = face.dominant() {
            let text = format!(
                "{} {}%",
                dominant.label,
                (dominant.score * 100.0).round() as u32
            );
            let width = text.len() as f32 * GLYPH_WIDTH + 10.0;
            scene.push(OverlayShape::Label(LabelPlate {
                text,
                x: bbox.x,
                y: bbox.y - PLATE_HEIGHT - 2.0,
                width,
                height: PLATE_HEIGHT,
            }));
        }
    }
    scene
}

/// Rasterize the scene over a copy of the source frame at its native pixel
/// dimensions: 2px rectangle strokes and filled label plates. Label glyphs
/// themselves are left to the presentation layer.
pub fn compose(frame: &RgbImage, scene: &[OverlayShape]) -> RgbaImage {
    let mut canvas = RgbaImage::from_fn(frame.width(), frame.height(), |x, y| {
        let pixel = frame.get_pixel(x, y);
        Rgba([pixel[0], pixel[1], pixel[2], 255])
    });

    for shape in scene {
        match shape {
            OverlayShape::Box(bbox) => stroke_rect(&mut canvas, bbox, 2, BOX_STROKE),
            OverlayShape::Label(plate) => fill_rect(
                &mut canvas,
                plate.x,
                plate.y,
                plate.width,
                plate.height,
                PLATE_FILL,
            ),
        }
    }
    canvas
}

fn stroke_rect(canvas: &mut RgbaImage, bbox: &BoundingBox, stroke: u32, color: Rgba<u8>) {
    let (x0, y0) = (bbox.x.max(0.0) as u32, bbox.y.max(0.0) as u32);
    let x1 = ((bbox.x + bbox.width) as i64).max(0) as u32;
    let y1 = ((bbox.y + bbox.height) as i64).max(0) as u32;

    for y in y0..y1.min(canvas.height()) {
        for x in x0..x1.min(canvas.width()) {
            let on_edge = x < x0 + stroke
                || x + stroke >= x1.max(stroke)
                || y < y0 + stroke
                || y + stroke >= y1.max(stroke);
            if on_edge {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: f32, y: f32, width: f32, height: f32, color: Rgba<u8>) {
    let x0 = x.max(0.0) as u32;
    let y0 = y.max(0.0) as u32;
    let x1 = ((x + width).max(0.0) as u32).min(canvas.width());
    let y1 = ((y + height).max(0.0) as u32).min(canvas.height());

    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px, py, color);
        }
    }
}

/// Display-cadence render loop: every tick, redraw the latest captured
/// frame with the latest timeline reading overlaid and push it to the sink.
/// Frames are dropped when the sink is full rather than stalling the loop.
pub async fn render_loop(
    latest_frame: Arc<RwLock<Option<RgbImage>>>,
    timeline: SharedTimeline,
    sink: mpsc::Sender<RenderedFrame>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(RENDER_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = { latest_frame.read().unwrap().clone() };
                let Some(frame) = frame else { continue };

                let scene = {
                    let timeline = timeline.read().unwrap();
                    build_scene(timeline.latest())
                };
                let image = compose(&frame, &scene);
                let _ = sink.try_send(RenderedFrame { image, scene });
            }
            _ = cancel.cancelled() => {
                log_info!("render loop shutting down");
                break;
            }
        }
    }
}
