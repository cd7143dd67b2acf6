//! The manipulation tool: routes mouse presses to the drawing under the
//! cursor and drags to its body or grabbed handle.

use crate::drawing::{Hit, Modifiers};
use crate::geometry::Point;
use crate::metadata::Metadata;

/// What the pointer grabbed on the last press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grab {
    KeyframeDrawing { keyframe: usize, drawing: usize, hit: Hit },
    ExtraDrawing { index: usize, hit: Hit },
}

/// Mouse interaction router for the arrow tool.
///
/// Selection lives in the metadata; the pointer only remembers which object
/// and handle the current drag started on.
pub struct PointerTool {
    grabbed: Option<Grab>,
    last_point: Point,
}

impl PointerTool {
    pub fn new() -> Self {
        Self {
            grabbed: None,
            last_point: Point::ORIGIN,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.grabbed.is_some()
    }

    /// Probes the drawings under `point`. Unattached drawings are tested
    /// topmost first, then keyframe drawings in fading z-order. Returns
    /// whether anything was grabbed; the hit object becomes the selection.
    pub fn on_press(
        &mut self,
        metadata: &mut Metadata,
        point: Point,
        timestamp: i64,
        active_keyframe: Option<usize>,
    ) -> bool {
        self.last_point = point;
        self.grabbed = None;

        if let Some((index, hit)) = metadata.hit_extra_drawing(point, timestamp) {
            self.grabbed = Some(Grab::ExtraDrawing { index, hit });
            return true;
        }

        if let Some((keyframe, drawing, hit)) =
            metadata.hit_drawing(point, timestamp, active_keyframe)
        {
            self.grabbed = Some(Grab::KeyframeDrawing {
                keyframe,
                drawing,
                hit,
            });
            return true;
        }

        metadata.unselect_all();
        false
    }

    /// Applies the drag to the grabbed object. Body hits translate the whole
    /// drawing; handle hits move the handle to the cursor.
    pub fn on_move(&mut self, metadata: &mut Metadata, point: Point, modifiers: Modifiers) -> bool {
        let Some(grab) = self.grabbed else {
            self.last_point = point;
            return false;
        };

        let dx = (point.x - self.last_point.x) as f64;
        let dy = (point.y - self.last_point.y) as f64;
        self.last_point = point;

        match grab {
            Grab::KeyframeDrawing {
                keyframe,
                drawing,
                hit,
            } => {
                let drawing = &mut metadata.keyframes_mut()[keyframe].drawings_mut()[drawing];
                match hit {
                    Hit::Handle(n) => drawing.move_handle(point, n, modifiers),
                    _ => drawing.move_drawing(dx, dy, modifiers),
                }
            }
            Grab::ExtraDrawing { index, hit } => {
                let drawing = metadata.extra_drawings_mut()[index].drawing_mut();
                match hit {
                    Hit::Handle(n) => drawing.move_handle(point, n, modifiers),
                    _ => drawing.move_drawing(dx, dy, modifiers),
                }
            }
        }
        true
    }

    pub fn on_release(&mut self) {
        self.grabbed = None;
    }
}

impl Default for PointerTool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::{ChronoMark, CrossMark};
    use crate::geometry::Size;
    use crate::metadata::Metadata;
    use crate::style::DrawingStyle;

    fn metadata_with_cross() -> Metadata {
        let mut meta = Metadata::new();
        meta.image_size = Size::new(640, 480);
        meta.average_timestamps_per_frame = 40;
        let index = meta.add_keyframe(1000);
        meta.keyframes_mut()[index].add_drawing(Box::new(CrossMark::new(
            Point::new(100, 100),
            1000,
            40,
            DrawingStyle::new(),
        )));
        meta
    }

    #[test]
    fn test_press_miss_clears_selection() {
        let mut meta = metadata_with_cross();
        meta.select_keyframe(0);
        let mut pointer = PointerTool::new();
        assert!(!pointer.on_press(&mut meta, Point::new(400, 400), 1000, Some(0)));
        assert!(!pointer.is_dragging());
        assert_eq!(meta.selected_keyframe(), None);
    }

    #[test]
    fn test_drag_moves_drawing_body() {
        let mut meta = metadata_with_cross();
        let mut pointer = PointerTool::new();
        assert!(pointer.on_press(&mut meta, Point::new(100, 100), 1000, Some(0)));
        assert_eq!(meta.selected_drawing(), Some((0, 0)));

        assert!(pointer.on_move(&mut meta, Point::new(110, 95), Modifiers::NONE));
        pointer.on_release();
        assert!(!pointer.is_dragging());

        let hit = meta.hit_drawing(Point::new(110, 95), 1000, Some(0));
        assert!(hit.is_some());
    }

    #[test]
    fn test_extra_drawings_grab_before_keyframe_drawings() {
        let mut meta = metadata_with_cross();
        // A chronometer sitting over the cross mark wins the grab.
        let mut chrono = ChronoMark::new(Point::new(80, 85), 0, 40, DrawingStyle::new());
        chrono.set_timestamps_per_second(1000);
        meta.add_chrono(chrono);

        let mut pointer = PointerTool::new();
        assert!(pointer.on_press(&mut meta, Point::new(100, 100), 1000, Some(0)));
        assert_eq!(meta.selected_extra_drawing(), Some(0));
        assert_eq!(meta.selected_drawing(), None);
    }

    #[test]
    fn test_move_without_grab_is_inert() {
        let mut meta = metadata_with_cross();
        let mut pointer = PointerTool::new();
        assert!(!pointer.on_move(&mut meta, Point::new(10, 10), Modifiers::NONE));
    }
}
