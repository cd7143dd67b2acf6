//! Vector image pasted over the video.
//!
//! The crate does not rasterize SVG itself; the canvas backend renders the
//! file at the requested rectangle. Like bitmaps, vector overlays are
//! render-only and never persisted to KVA.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::canvas::{Canvas, ImageTransform};
use crate::drawing::bitmap::draw_selection_frame;
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{BoundingBox, Point, Rect, Size};
use crate::kva::writer::KvaWriter;
use crate::kva::KvaError;
use crate::style::DrawingStyle;

pub struct SvgOverlay {
    path: PathBuf,
    original_size: Size,
    bounding_box: BoundingBox,
    fading: Fading,
}

impl SvgOverlay {
    /// The intrinsic size comes from the SVG viewbox, resolved by the host
    /// renderer. The overlay starts centered in the frame.
    pub fn new(
        path: &Path,
        intrinsic_size: Size,
        frame_size: Size,
        timestamp: i64,
        average_tpf: i64,
    ) -> Self {
        let mut original_size = intrinsic_size;
        let initial_scale = frame_size.height as f64 * 0.75 / intrinsic_size.height.max(1) as f64;
        if initial_scale < 1.0 {
            original_size = Size::new(
                (intrinsic_size.width as f64 * initial_scale) as i32,
                (intrinsic_size.height as f64 * initial_scale) as i32,
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

impl Drawing for SvgOverlay {
    fn xml_type(&self) -> Option<&'static str> {
        None
    }

    fn display_name(&self) -> String {
        String::from("Vector image")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_and_resizable() {
        let mut o = SvgOverlay::new(
            Path::new("arrow.svg"),
            Size::new(100, 100),
            Size::new(800, 600),
            0,
            10,
        );
        assert_eq!(o.rectangle(), Rect::new(350, 250, 100, 100));

        o.move_handle(Point::new(550, 450), 3, Modifiers::NONE);
        assert_eq!(o.rectangle().width, o.rectangle().height);
        assert_eq!(o.rectangle().width, 200);
    }

    #[test]
    fn test_drag_moves_whole_box() {
        let mut o = SvgOverlay::new(
            Path::new("arrow.svg"),
            Size::new(100, 100),
            Size::new(800, 600),
            0,
            10,
        );
        o.move_drawing(25.0, -10.0, Modifiers::NONE);
        assert_eq!(o.rectangle(), Rect::new(375, 240, 100, 100));
    }
}
