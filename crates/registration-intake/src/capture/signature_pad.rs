use std::io::Cursor;

use image::{ImageError, ImageFormat, Rgba, RgbaImage};

const STROKE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LINE_WIDTH: f32 = 2.0;
const SAMPLE_SPACING: f32 = 0.5;

/// A position on the canvas, or in client space for touch events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Top-left corner of the canvas in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
}

/// Input delivered to the pad. Mouse points are canvas-relative; touch points
/// are client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadEvent {
    MouseDown(Point),
    MouseMove(Point),
    MouseUp,
    MouseLeave,
    TouchStart(Point),
    TouchMove(Point),
    TouchEnd,
}

/// Whether the host should suppress the event's default action (scrolling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Default,
    PreventDefault,
}

/// Freehand drawing surface backed by an RGBA bitmap.
#[derive(Debug, Clone)]
pub struct SignaturePad {
    canvas: RgbaImage,
    bounds: CanvasRect,
    drawing: bool,
    cursor: Option<Point>,
}

impl SignaturePad {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
            bounds: CanvasRect::default(),
            drawing: false,
            cursor: None,
        }
    }

    /// Starts from an existing bitmap, e.g. a signature drawn elsewhere.
    pub fn from_image(canvas: RgbaImage) -> Self {
        Self {
            canvas,
            bounds: CanvasRect::default(),
            drawing: false,
            cursor: None,
        }
    }

    pub fn with_bounds(mut self, bounds: CanvasRect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn handle(&mut self, event: PadEvent) -> EventDisposition {
        match event {
            PadEvent::MouseDown(point) => {
                self.begin(point);
                EventDisposition::Default
            }
            PadEvent::MouseMove(point) => {
                self.extend(point);
                EventDisposition::Default
            }
            PadEvent::MouseUp | PadEvent::MouseLeave => {
                self.drawing = false;
                EventDisposition::Default
            }
            PadEvent::TouchStart(point) => {
                self.begin(self.to_canvas(point));
                EventDisposition::PreventDefault
            }
            PadEvent::TouchMove(point) => {
                self.extend(self.to_canvas(point));
                EventDisposition::PreventDefault
            }
            PadEvent::TouchEnd => {
                self.drawing = false;
                EventDisposition::PreventDefault
            }
        }
    }

    /// Erases every stroke. Drawing state is left untouched.
    pub fn clear(&mut self) {
        self.canvas = RgbaImage::new(self.canvas.width(), self.canvas.height());
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        self.canvas.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// True when the encoded canvas equals that of a fresh canvas of the same
    /// size.
    pub fn is_blank(&self) -> Result<bool, ImageError> {
        let blank = SignaturePad::new(self.width(), self.height());
        Ok(self.to_png()? == blank.to_png()?)
    }

    fn to_canvas(&self, client: Point) -> Point {
        Point::new(client.x - self.bounds.left, client.y - self.bounds.top)
    }

    fn begin(&mut self, point: Point) {
        self.drawing = true;
        self.cursor = Some(point);
    }

    fn extend(&mut self, point: Point) {
        if !self.drawing {
            return;
        }
        let from = self.cursor.unwrap_or(point);
        self.stroke_segment(from, point);
        self.cursor = Some(point);
    }

    fn stroke_segment(&mut self, from: Point, to: Point) {
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let length = (dx * dx + dy * dy).sqrt();
        let steps = (length / SAMPLE_SPACING).ceil().max(1.0) as u32;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.stamp(Point::new(from.x + dx * t, from.y + dy * t));
        }
    }

    /// Fills every pixel whose centre lies within half the line width.
    fn stamp(&mut self, centre: Point) {
        let radius = LINE_WIDTH / 2.0;
        let (width, height) = (self.canvas.width() as i64, self.canvas.height() as i64);
        let x_range = (centre.x - radius).floor() as i64..=(centre.x + radius).ceil() as i64;
        let y_range = (centre.y - radius).floor() as i64..=(centre.y + radius).ceil() as i64;

        for y in y_range.clone().filter(|y| (0..height).contains(y)) {
            for x in x_range.clone().filter(|x| (0..width).contains(x)) {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let distance = ((px - centre.x).powi(2) + (py - centre.y).powi(2)).sqrt();
                if distance <= radius {
                    self.canvas.put_pixel(x as u32, y as u32, STROKE_COLOR);
                }
            }
        }
    }
}
