//! Drawing tools: factories that turn a click into a new drawing.
//!
//! Each tool carries a style preset. The default preset is the factory
//! setting; the current preset accumulates the user's last choices and is
//! what new drawings inherit.

pub mod pointer;

pub use pointer::PointerTool;

use crate::color::Color;
use crate::drawing::{
    AngleMeasure, ChronoMark, Circle, CrossMark, Drawing, Line, Pencil, Plane, TextLabel,
};
use crate::geometry::Point;
use crate::style::{DrawingStyle, LineEnding, StyleElement};

/// Mouse cursor shown while a tool is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCursor {
    Crosshair,
    /// A colored disc preview, used by the pencil and cross tools.
    Brush { color: Color, size: i32 },
}

pub trait DrawingTool {
    fn display_name(&self) -> &'static str;

    /// Whether the produced drawings attach to a keyframe.
    fn attached(&self) -> bool;

    /// Whether the tool stays active after creating a drawing.
    fn keep_tool(&self) -> bool;

    /// Whether the tool survives a change of the current frame.
    fn keep_tool_frame_changed(&self) -> bool {
        false
    }

    /// Factory preset, untouched by user edits.
    fn default_style(&self) -> DrawingStyle;

    /// Current preset, inherited by new drawings.
    fn style(&self) -> &DrawingStyle;

    fn style_mut(&mut self) -> &mut DrawingStyle;

    fn reset_style(&mut self) {
        *self.style_mut() = self.default_style();
    }

    fn cursor(&self) -> ToolCursor {
        ToolCursor::Crosshair
    }

    fn new_drawing(&self, origin: Point, timestamp: i64, average_tpf: i64) -> Box<dyn Drawing>;
}

/// Per-tool settings shared by every line created while they are on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineToolConfig {
    pub show_measure: bool,
}

/// Per-tool settings shared by every cross mark created while they are on.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossToolConfig {
    pub show_coordinates: bool,
}

pub struct LineTool {
    style: DrawingStyle,
    pub config: LineToolConfig,
}

impl LineTool {
    pub fn new() -> Self {
        Self {
            style: Self::preset(),
            config: LineToolConfig::default(),
        }
    }

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::rgb(144, 238, 144)));
        style.insert("line size", StyleElement::LineSize(2));
        style.insert("arrows", StyleElement::LineEnding(LineEnding::None));
        style
    }
}

impl Default for LineTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingTool for LineTool {
    fn display_name(&self) -> &'static str {
        "Line"
    }

    fn attached(&self) -> bool {
        true
    }

    fn keep_tool(&self) -> bool {
        true
    }

    fn keep_tool_frame_changed(&self) -> bool {
        true
    }

    fn default_style(&self) -> DrawingStyle {
        Self::preset()
    }

    fn style(&self) -> &DrawingStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut DrawingStyle {
        &mut self.style
    }

    fn new_drawing(&self, origin: Point, timestamp: i64, average_tpf: i64) -> Box<dyn Drawing> {
        let mut line = Line::new(
            origin,
            origin.translate(10, 0),
            timestamp,
            average_tpf,
            self.style.clone(),
        );
        line.set_show_measure(self.config.show_measure);
        Box::new(line)
    }
}

pub struct CrossTool {
    style: DrawingStyle,
    pub config: CrossToolConfig,
}

impl CrossTool {
    pub fn new() -> Self {
        Self {
            style: Self::preset(),
            config: CrossToolConfig::default(),
        }
    }

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert(
            "back color",
            StyleElement::Color(Color::rgb(100, 149, 237)),
        );
        style
    }
}

impl Default for CrossTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingTool for CrossTool {
    fn display_name(&self) -> &'static str {
        "Cross marker"
    }

    fn attached(&self) -> bool {
        true
    }

    fn keep_tool(&self) -> bool {
        true
    }

    fn default_style(&self) -> DrawingStyle {
        Self::preset()
    }

    fn style(&self) -> &DrawingStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut DrawingStyle {
        &mut self.style
    }

    fn cursor(&self) -> ToolCursor {
        let color = match self.style.element("back color") {
            Some(StyleElement::Color(c)) => *c,
            _ => Color::rgb(100, 149, 237),
        };
        ToolCursor::Brush { color, size: 7 }
    }

    fn new_drawing(&self, origin: Point, timestamp: i64, average_tpf: i64) -> Box<dyn Drawing> {
        let mut cross = CrossMark::new(origin, timestamp, average_tpf, self.style.clone());
        cross.set_show_coordinates(self.config.show_coordinates);
        Box::new(cross)
    }
}

pub struct CircleTool {
    style: DrawingStyle,
}

impl CircleTool {
    pub fn new() -> Self {
        Self {
            style: Self::preset(),
        }
    }

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::rgb(95, 158, 160)));
        style.insert("pen size", StyleElement::PenSize(3));
        style
    }
}

impl Default for CircleTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingTool for CircleTool {
    fn display_name(&self) -> &'static str {
        "Circle"
    }

    fn attached(&self) -> bool {
        true
    }

    fn keep_tool(&self) -> bool {
        true
    }

    fn default_style(&self) -> DrawingStyle {
        Self::preset()
    }

    fn style(&self) -> &DrawingStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut DrawingStyle {
        &mut self.style
    }

    fn new_drawing(&self, origin: Point, timestamp: i64, average_tpf: i64) -> Box<dyn Drawing> {
        Box::new(Circle::new(
            origin,
            25,
            timestamp,
            average_tpf,
            self.style.clone(),
        ))
    }
}

pub struct PencilTool {
    style: DrawingStyle,
}

impl PencilTool {
    pub fn new() -> Self {
        Self {
            style: Self::preset(),
        }
    }

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::rgb(46, 139, 87)));
        style.insert("pen size", StyleElement::PenSize(9));
        style
    }
}

impl Default for PencilTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingTool for PencilTool {
    fn display_name(&self) -> &'static str {
        "Pencil"
    }

    fn attached(&self) -> bool {
        true
    }

    fn keep_tool(&self) -> bool {
        true
    }

    fn keep_tool_frame_changed(&self) -> bool {
        true
    }

    fn default_style(&self) -> DrawingStyle {
        Self::preset()
    }

    fn style(&self) -> &DrawingStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut DrawingStyle {
        &mut self.style
    }

    fn cursor(&self) -> ToolCursor {
        let color = match self.style.element("color") {
            Some(StyleElement::Color(c)) => *c,
            _ => Color::rgb(46, 139, 87),
        };
        let size = match self.style.element("pen size") {
            Some(StyleElement::PenSize(s)) => *s,
            _ => 9,
        };
        ToolCursor::Brush { color, size }
    }

    fn new_drawing(&self, origin: Point, timestamp: i64, average_tpf: i64) -> Box<dyn Drawing> {
        Box::new(Pencil::new(
            origin,
            origin.translate(1, 0),
            timestamp,
            average_tpf,
            self.style.clone(),
        ))
    }
}

pub struct AngleTool {
    style: DrawingStyle,
}

impl AngleTool {
    pub fn new() -> Self {
        Self {
            style: Self::preset(),
        }
    }

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("line color", StyleElement::Color(Color::rgb(85, 107, 47)));
        style
    }
}

impl Default for AngleTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingTool for AngleTool {
    fn display_name(&self) -> &'static str {
        "Angle"
    }

    fn attached(&self) -> bool {
        true
    }

    fn keep_tool(&self) -> bool {
        false
    }

    fn default_style(&self) -> DrawingStyle {
        Self::preset()
    }

    fn style(&self) -> &DrawingStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut DrawingStyle {
        &mut self.style
    }

    fn new_drawing(&self, origin: Point, timestamp: i64, average_tpf: i64) -> Box<dyn Drawing> {
        Box::new(AngleMeasure::new(
            origin,
            origin.translate(50, 0),
            origin.translate(0, 50),
            timestamp,
            average_tpf,
            self.style.clone(),
        ))
    }
}

pub struct TextTool {
    style: DrawingStyle,
}

impl TextTool {
    pub fn new() -> Self {
        Self {
            style: Self::preset(),
        }
    }

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert(
            "back color",
            StyleElement::Color(Color::rgb(100, 149, 237)),
        );
        style.insert("font size", StyleElement::FontSize(12));
        style
    }
}

impl Default for TextTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingTool for TextTool {
    fn display_name(&self) -> &'static str {
        "Label"
    }

    fn attached(&self) -> bool {
        true
    }

    fn keep_tool(&self) -> bool {
        false
    }

    fn default_style(&self) -> DrawingStyle {
        Self::preset()
    }

    fn style(&self) -> &DrawingStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut DrawingStyle {
        &mut self.style
    }

    fn new_drawing(&self, origin: Point, timestamp: i64, average_tpf: i64) -> Box<dyn Drawing> {
        Box::new(TextLabel::new(
            origin,
            timestamp,
            average_tpf,
            self.style.clone(),
        ))
    }
}

pub struct PlaneTool {
    style: DrawingStyle,
    perspective: bool,
}

impl PlaneTool {
    /// Flat grid tool.
    pub fn grid() -> Self {
        Self {
            style: Self::preset(),
            perspective: false,
        }
    }

    /// Perspective grid tool.
    pub fn perspective_grid() -> Self {
        Self {
            style: Self::preset(),
            perspective: true,
        }
    }

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::rgb(100, 149, 237)));
        style
    }
}

impl DrawingTool for PlaneTool {
    fn display_name(&self) -> &'static str {
        if self.perspective {
            "Perspective grid"
        } else {
            "Grid"
        }
    }

    fn attached(&self) -> bool {
        true
    }

    fn keep_tool(&self) -> bool {
        false
    }

    fn default_style(&self) -> DrawingStyle {
        Self::preset()
    }

    fn style(&self) -> &DrawingStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut DrawingStyle {
        &mut self.style
    }

    fn new_drawing(&self, _origin: Point, timestamp: i64, average_tpf: i64) -> Box<dyn Drawing> {
        Box::new(Plane::new(
            8,
            self.perspective,
            timestamp,
            average_tpf,
            self.style.clone(),
        ))
    }
}

pub struct ChronoTool {
    style: DrawingStyle,
}

impl ChronoTool {
    pub fn new() -> Self {
        Self {
            style: Self::preset(),
        }
    }

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::BLACK));
        style.insert("font size", StyleElement::FontSize(16));
        style
    }
}

impl Default for ChronoTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingTool for ChronoTool {
    fn display_name(&self) -> &'static str {
        "Stopwatch"
    }

    fn attached(&self) -> bool {
        false
    }

    fn keep_tool(&self) -> bool {
        false
    }

    fn default_style(&self) -> DrawingStyle {
        Self::preset()
    }

    fn style(&self) -> &DrawingStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut DrawingStyle {
        &mut self.style
    }

    fn new_drawing(&self, origin: Point, timestamp: i64, average_tpf: i64) -> Box<dyn Drawing> {
        Box::new(ChronoMark::new(
            origin,
            timestamp,
            average_tpf,
            self.style.clone(),
        ))
    }
}

/// One instance of every tool, plus the presets handed to the KVA reader.
pub struct ToolKit {
    pub line: LineTool,
    pub cross: CrossTool,
    pub circle: CircleTool,
    pub pencil: PencilTool,
    pub angle: AngleTool,
    pub text: TextTool,
    pub grid: PlaneTool,
    pub perspective_grid: PlaneTool,
    pub chrono: ChronoTool,
}

impl ToolKit {
    pub fn new() -> Self {
        Self {
            line: LineTool::new(),
            cross: CrossTool::new(),
            circle: CircleTool::new(),
            pencil: PencilTool::new(),
            angle: AngleTool::new(),
            text: TextTool::new(),
            grid: PlaneTool::grid(),
            perspective_grid: PlaneTool::perspective_grid(),
            chrono: ChronoTool::new(),
        }
    }

    /// Current preset for a KVA element name, used as the base style when
    /// reading drawings back from file.
    pub fn preset_for(&self, xml_name: &str) -> DrawingStyle {
        match xml_name {
            "Line" => self.line.style().clone(),
            "CrossMark" => self.cross.style().clone(),
            "Circle" => self.circle.style().clone(),
            "Pencil" => self.pencil.style().clone(),
            "Angle" => self.angle.style().clone(),
            "Label" => self.text.style().clone(),
            "Plane" => self.grid.style().clone(),
            "Chrono" => self.chrono.style().clone(),
            _ => DrawingStyle::new(),
        }
    }

    pub fn reset_styles(&mut self) {
        self.line.reset_style();
        self.cross.reset_style();
        self.circle.reset_style();
        self.pencil.reset_style();
        self.angle.reset_style();
        self.text.reset_style();
        self.grid.reset_style();
        self.perspective_grid.reset_style();
        self.chrono.reset_style();
    }
}

impl Default for ToolKit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line_inherits_tool_config() {
        let mut tool = LineTool::new();
        tool.config.show_measure = true;
        let drawing = tool.new_drawing(Point::new(10, 10), 0, 10);
        assert_eq!(drawing.xml_type(), Some("Line"));
    }

    #[test]
    fn test_reset_style_restores_default() {
        let mut tool = PencilTool::new();
        tool.style_mut()
            .insert("pen size", StyleElement::PenSize(25));
        assert_ne!(
            tool.style().content_hash(),
            tool.default_style().content_hash()
        );

        tool.reset_style();
        assert_eq!(
            tool.style().content_hash(),
            tool.default_style().content_hash()
        );
    }

    #[test]
    fn test_chrono_tool_is_detached() {
        let tool = ChronoTool::new();
        assert!(!tool.attached());
        let drawing = tool.new_drawing(Point::new(0, 0), 500, 10);
        assert_eq!(drawing.xml_type(), Some("Chrono"));
    }

    #[test]
    fn test_pencil_cursor_follows_style() {
        let mut tool = PencilTool::new();
        tool.style_mut()
            .insert("pen size", StyleElement::PenSize(13));
        match tool.cursor() {
            ToolCursor::Brush { size, .. } => assert_eq!(size, 13),
            _ => panic!("expected a brush cursor"),
        }
    }
}
