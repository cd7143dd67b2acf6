//! A bookmarked frame and the drawings attached to it.

use std::hash::{Hash, Hasher};

use crate::drawing::Drawing;
use crate::kva::writer::KvaWriter;
use crate::kva::KvaError;

/// One keyframe: a video position, an optional title and comment, and the
/// drawings anchored on that frame, topmost first.
pub struct Keyframe {
    pub position: i64,
    title: Option<String>,
    /// Timecode of the position, used as the title fallback. Set by the
    /// owning metadata from its timebase.
    pub timecode: String,
    pub comment: String,
    pub disabled: bool,
    drawings: Vec<Box<dyn Drawing>>,
}

impl Keyframe {
    pub fn new(position: i64, timecode: &str) -> Self {
        Self {
            position,
            title: None,
            timecode: timecode.to_string(),
            comment: String::new(),
            disabled: false,
            drawings: Vec::new(),
        }
    }

    /// The explicit title, or the timecode when none was set.
    pub fn title(&self) -> &str {
        match &self.title {
            Some(t) if !t.is_empty() => t,
            _ => &self.timecode,
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = if title.is_empty() {
            None
        } else {
            Some(title.to_string())
        };
    }

    pub fn drawings(&self) -> &[Box<dyn Drawing>] {
        &self.drawings
    }

    pub fn drawings_mut(&mut self) -> &mut Vec<Box<dyn Drawing>> {
        &mut self.drawings
    }

    /// New drawings go on top of the stack.
    pub fn add_drawing(&mut self, drawing: Box<dyn Drawing>) {
        self.drawings.insert(0, drawing);
    }

    pub fn remove_drawing(&mut self, index: usize) -> Option<Box<dyn Drawing>> {
        if index < self.drawings.len() {
            Some(self.drawings.remove(index))
        } else {
            None
        }
    }

    pub fn content_hash(&self) -> u64 {
        let mut hash = 0u64;
        for drawing in &self.drawings {
            hash ^= drawing.content_hash();
        }

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.title().hash(&mut hasher);
        self.comment.hash(&mut hasher);
        self.timecode.hash(&mut hasher);
        hash ^ hasher.finish()
    }

    pub fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.start_with_attr("Position", "UserTime", &self.timecode)?;
        writer.text(&self.position.to_string())?;
        writer.end("Position")?;

        if let Some(title) = &self.title {
            if !title.is_empty() {
                writer.element("Title", title)?;
            }
        }
        if !self.comment.is_empty() {
            writer.element("Comment", &self.comment)?;
        }

        let serializable: Vec<_> = self
            .drawings
            .iter()
            .filter(|d| d.xml_type().is_some())
            .collect();
        if !serializable.is_empty() {
            writer.start("Drawings")?;
            for drawing in serializable {
                let name = drawing.xml_type().unwrap_or_default();
                writer.start(name)?;
                drawing.write_kva(writer)?;
                writer.end(name)?;
            }
            writer.end("Drawings")?;
        }

        Ok(())
    }
}
