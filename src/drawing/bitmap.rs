//! Bitmap image pasted over the video.
//!
//! Overlays are render-only: they are not persisted to KVA. The image file
//! itself stays on disk and is blitted by the canvas backend.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::canvas::{Canvas, ImageTransform, Stroke};
use crate::color::Color;
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{BoundingBox, Point, PointF, Rect, RectF, Size};
use crate::kva::writer::KvaWriter;
use crate::kva::KvaError;
use crate::style::DrawingStyle;

pub struct ImageOverlay {
    path: PathBuf,
    original_size: Size,
    bounding_box: BoundingBox,
    fading: Fading,
}

impl ImageOverlay {
    /// Loads image dimensions from disk and centers the overlay in the
    /// frame. Images taller than three quarters of the frame are scaled
    /// down to fit.
    pub fn open(
        path: &Path,
        frame_size: Size,
        timestamp: i64,
        average_tpf: i64,
    ) -> Result<Self, KvaError> {
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| KvaError::invalid_document(format!("Cannot read image: {}", e)))?;
        Ok(Self::with_size(
            path,
            Size::new(width as i32, height as i32),
            frame_size,
            timestamp,
            average_tpf,
        ))
    }

    pub fn with_size(
        path: &Path,
        image_size: Size,
        frame_size: Size,
        timestamp: i64,
        average_tpf: i64,
    ) -> Self {
        let mut original_size = image_size;
        let initial_scale = frame_size.height as f64 * 0.75 / image_size.height.max(1) as f64;
        if initial_scale < 1.0 {
            original_size = Size::new(
                (image_size.width as f64 * initial_scale) as i32,
                (image_size.height as f64 * initial_scale) as i32,
            );
        }

        let mut fading = Fading::new(timestamp, average_tpf);
        fading.use_default = false;
        fading.always_visible = true;

        Self {
            path: path.to_path_buf(),
            original_size,
            bounding_box: BoundingBox::new(Rect::new(
                (frame_size.width - original_size.width) / 2,
                (frame_size.height - original_size.height) / 2,
                original_size.width,
                original_size.height,
            )),
            fading,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rectangle(&self) -> Rect {
        self.bounding_box.rectangle()
    }
}

impl Drawing for ImageOverlay {
    fn xml_type(&self) -> Option<&'static str> {
        None
    }

    fn display_name(&self) -> String {
        String::from("Image")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            fading: false,
            opacity: true,
            style: false,
        }
    }

    fn fading(&self) -> &Fading {
        &self.fading
    }

    fn fading_mut(&mut self) -> &mut Fading {
        &mut self.fading
    }

    fn draw(
        &self,
        canvas: &mut dyn Canvas,
        transform: &ImageTransform,
        selected: bool,
        timestamp: i64,
    ) {
        let opacity = self.fading.opacity_at(timestamp);
        if opacity <= 0.0 {
            return;
        }

        let rect = transform.transform_rect(self.bounding_box.rectangle());
        canvas.image(&self.path, rect, opacity);
        if selected {
            draw_selection_frame(canvas, rect);
        }
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if self.fading.opacity_at(timestamp) <= 0.0 {
            return Hit::Miss;
        }
        Hit::from_index(self.bounding_box.hit_test(point))
    }

    fn move_handle(&mut self, point: Point, handle: u8, _modifiers: Modifiers) {
        self.bounding_box
            .move_handle(point, handle, self.original_size);
    }

    fn move_drawing(&mut self, dx: f64, dy: f64, _modifiers: Modifiers) {
        self.bounding_box.move_by(dx as i32, dy as i32);
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.path.hash(&mut hasher);
        self.bounding_box.rectangle().hash(&mut hasher);
        hasher.finish()
    }

    fn write_kva(&self, _writer: &mut KvaWriter) -> Result<(), KvaError> {
        Ok(())
    }

    fn style(&self) -> Option<&DrawingStyle> {
        None
    }
}

/// Dashed white frame with corner dots, drawn around a selected overlay.
pub(crate) fn draw_selection_frame(canvas: &mut dyn Canvas, rect: RectF) {
    let mut pen = Stroke::solid(Color::WHITE, 1.0);
    pen.dashed = true;
    let corners = [
        PointF::new(rect.x, rect.y),
        PointF::new(rect.x + rect.width, rect.y),
        PointF::new(rect.x + rect.width, rect.y + rect.height),
        PointF::new(rect.x, rect.y + rect.height),
        PointF::new(rect.x, rect.y),
    ];
    canvas.polyline(&pen, &corners);

    let widen = 4.0;
    for corner in &corners[..4] {
        canvas.fill_ellipse(
            Color::WHITE,
            RectF::new(corner.x - widen, corner.y - widen, widen * 2.0, widen * 2.0),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay() -> ImageOverlay {
        ImageOverlay::with_size(
            Path::new("logo.png"),
            Size::new(200, 100),
            Size::new(800, 600),
            1000,
            10,
        )
    }

    #[test]
    fn test_centered_in_frame() {
        let o = overlay();
        assert_eq!(o.rectangle(), Rect::new(300, 250, 200, 100));
    }

    #[test]
    fn test_large_image_scaled_to_fit() {
        let o = ImageOverlay::with_size(
            Path::new("big.jpg"),
            Size::new(1600, 1200),
            Size::new(800, 600),
            0,
            10,
        );
        // Scaled to 75% of the frame height.
        assert_eq!(o.rectangle().height, 450);
        assert_eq!(o.rectangle().width, 600);
    }

    #[test]
    fn test_corner_resize_preserves_aspect() {
        let mut o = overlay();
        // Bottom-right corner of (300,250,200,100) is (500,350).
        assert_eq!(o.hit_test(Point::new(500, 350), 1000), Hit::Handle(3));
        o.move_handle(Point::new(600, 400), 3, Modifiers::NONE);
        let r = o.rectangle();
        assert_eq!(r.width, 300);
        assert_eq!(r.height, 150);
    }

    #[test]
    fn test_always_visible() {
        let o = overlay();
        assert_eq!(o.hit_test(Point::new(400, 300), 999_999), Hit::Body);
    }

    #[test]
    fn test_not_serialized() {
        let o = overlay();
        assert!(o.xml_type().is_none());
    }
}
