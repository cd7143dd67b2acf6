//! Stopwatch overlay counting time between two user-set timestamps.
//!
//! Unlike keyframe drawings a chronometer is not anchored on a single frame:
//! it carries its own visibility window (`time_visible`..`time_invisible`)
//! plus the counting window (`time_start`..`time_stop`), all expressed in
//! video timestamps. `i64::MAX` marks an unset boundary.

use std::hash::{Hash, Hasher};

use crate::canvas::{estimate_text_size, Canvas, ImageTransform};
use crate::color::Color;
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{Point, PointF, Rect, RoundedRectangle};
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::{DrawingStyle, StyleProperties, StyleTarget};

const DEFAULT_FONT_SIZE: i32 = 16;
const BACKGROUND_ALPHA: f64 = 128.0 / 255.0;

/// Frames past `time_invisible` during which the chrono stays hittable and
/// fades out.
const ALLOWED_FRAMES_OVER: i64 = 12;

/// Sentinel for an unset time boundary, serialized as "-1".
const UNSET: i64 = i64::MAX;

pub struct ChronoMark {
    time_visible: i64,
    time_start: i64,
    time_stop: i64,
    time_invisible: i64,
    countdown: bool,
    label: String,
    show_label: bool,
    main_background: RoundedRectangle,
    average_tpf: i64,
    timestamps_per_second: i64,
    style: DrawingStyle,
    properties: StyleProperties,
    fading: Fading,
}

impl ChronoMark {
    pub fn new(position: Point, timestamp: i64, average_tpf: i64, preset: DrawingStyle) -> Self {
        let mut properties = StyleProperties::default();
        properties.font_size = DEFAULT_FONT_SIZE;
        properties.set_background(Color::BLACK);
        let mut style = preset;
        bind(&mut style);
        style.apply(&mut properties);

        let mut fading = Fading::new(timestamp, average_tpf);
        fading.use_default = false;
        fading.always_visible = true;

        Self {
            time_visible: timestamp,
            time_start: UNSET,
            time_stop: UNSET,
            time_invisible: UNSET,
            countdown: false,
            label: String::new(),
            show_label: false,
            main_background: RoundedRectangle::new(Rect::new(position.x, position.y, 0, 0)),
            average_tpf,
            timestamps_per_second: 0,
            style,
            properties,
            fading,
        }
    }

    /// Timebase for timecode display, set by the owning metadata.
    pub fn set_timestamps_per_second(&mut self, tps: i64) {
        self.timestamps_per_second = tps;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    pub fn show_label(&self) -> bool {
        self.show_label
    }

    pub fn set_show_label(&mut self, show: bool) {
        self.show_label = show;
    }

    pub fn countdown(&self) -> bool {
        self.countdown
    }

    /// Counting down requires a stop boundary to count from.
    pub fn countdown_available(&self) -> bool {
        self.time_stop != UNSET
    }

    pub fn set_countdown(&mut self, countdown: bool) {
        self.countdown = countdown && self.countdown_available();
    }

    /// Starts counting at the given timestamp. A stop boundary earlier than
    /// the new start is discarded.
    pub fn start(&mut self, timestamp: i64) {
        self.time_start = timestamp;
        if self.time_visible > timestamp {
            self.time_visible = timestamp;
        }
        if self.time_stop < timestamp {
            self.time_stop = UNSET;
        }
    }

    /// Stops counting at the given timestamp. The start boundary is pulled
    /// back if it was later; an invisible boundary earlier than the new stop
    /// is discarded.
    pub fn stop(&mut self, timestamp: i64) {
        self.time_stop = timestamp;
        if self.time_start > timestamp {
            self.time_start = timestamp;
        }
        if self.time_invisible < timestamp {
            self.time_invisible = UNSET;
        }
        if !self.countdown_available() {
            self.countdown = false;
        }
    }

    /// Hides the chrono from the given timestamp on. Counting stops there too
    /// if it was still running past that point.
    pub fn hide(&mut self, timestamp: i64) {
        self.time_invisible = timestamp;
        if self.time_stop != UNSET && self.time_stop > timestamp {
            self.time_stop = timestamp;
        }
    }

    /// Elapsed counting time at the given timestamp, in timestamps.
    pub fn elapsed(&self, timestamp: i64) -> i64 {
        if self.time_start == UNSET {
            return 0;
        }

        let countdown = self.countdown && self.time_stop != UNSET;
        if timestamp >= self.time_start {
            if timestamp <= self.time_stop {
                if countdown {
                    self.time_stop - timestamp
                } else {
                    timestamp - self.time_start
                }
            } else if countdown {
                0
            } else {
                self.time_stop - self.time_start
            }
        } else if countdown {
            self.time_stop - self.time_start
        } else {
            0
        }
    }

    /// Displayed timecode at the given timestamp.
    pub fn timecode(&self, timestamp: i64) -> String {
        format_timecode(self.elapsed(timestamp), self.timestamps_per_second)
    }

    /// Opacity at the given timestamp. Fully opaque inside the visibility
    /// window, fading out over the allowed overrun past `time_invisible`.
    pub fn opacity_at(&self, timestamp: i64) -> f64 {
        if timestamp < self.time_visible {
            return 0.0;
        }
        if self.time_invisible == UNSET || timestamp <= self.time_invisible {
            return 1.0;
        }

        let window = ALLOWED_FRAMES_OVER * self.average_tpf;
        if window <= 0 {
            return 0.0;
        }
        let over = timestamp - self.time_invisible;
        if over >= window {
            0.0
        } else {
            1.0 - over as f64 / window as f64
        }
    }

    fn main_rectangle(&self, timestamp: i64) -> Rect {
        let padded = format!(" {} ", self.timecode(timestamp));
        let size = estimate_text_size(&padded, self.properties.font_size as f32);
        let rect = self.main_background.rectangle();
        Rect::new(rect.x, rect.y, size.width as i32, size.height as i32)
    }

    fn label_rectangle(&self, timestamp: i64) -> Rect {
        let size = estimate_text_size(&self.label, self.properties.font_size as f32 / 2.0);
        let main = self.main_rectangle(timestamp);
        Rect::new(
            main.x,
            main.y - size.height as i32,
            size.width as i32,
            size.height as i32,
        )
    }

    pub fn read_kva(
        node: &XmlNode,
        scale: (f64, f64),
        remap: &dyn Fn(i64) -> i64,
        average_tpf: i64,
        preset: DrawingStyle,
    ) -> Self {
        let mut chrono = Self::new(Point::ORIGIN, 0, average_tpf, preset);
        let mut handled: Vec<&str> = Vec::new();

        if let Some(text) = node.child_text("Position") {
            let p = xml::parse_point(text);
            chrono.main_background.set_rectangle(Rect::new(
                (scale.0 * p.x as f64) as i32,
                (scale.1 * p.y as f64) as i32,
                0,
                0,
            ));
            handled.push("Position");
        }
        if let Some(values) = node.child("Values") {
            chrono.read_values(values, remap);
            handled.push("Values");
        }
        if let Some(label) = node.child("Label") {
            let mut label_handled: Vec<&str> = Vec::new();
            if let Some(text) = label.child_text("Text") {
                chrono.label = text.to_string();
                label_handled.push("Text");
            }
            if let Some(text) = label.child_text("Show") {
                chrono.show_label = xml::parse_bool(text);
                label_handled.push("Show");
            }
            label.warn_unparsed(&label_handled);
            handled.push("Label");
        }
        if let Some(style_node) = node.child("DrawingStyle") {
            chrono.style = DrawingStyle::read_kva(style_node);
            bind(&mut chrono.style);
            chrono.style.apply(&mut chrono.properties);
            handled.push("DrawingStyle");
        }
        node.warn_unparsed(&handled);

        chrono.sanitize_times();
        chrono
    }

    fn read_values(&mut self, node: &XmlNode, remap: &dyn Fn(i64) -> i64) {
        let mut handled: Vec<&str> = Vec::new();
        if let Some(text) = node.child_text("Visible") {
            self.time_visible = read_time(text, remap);
            handled.push("Visible");
        }
        if let Some(text) = node.child_text("StartCounting") {
            self.time_start = read_time(text, remap);
            handled.push("StartCounting");
        }
        if let Some(text) = node.child_text("StopCounting") {
            self.time_stop = read_time(text, remap);
            handled.push("StopCounting");
        }
        if let Some(text) = node.child_text("Invisible") {
            self.time_invisible = read_time(text, remap);
            handled.push("Invisible");
        }
        if let Some(text) = node.child_text("Countdown") {
            self.countdown = xml::parse_bool(text);
            handled.push("Countdown");
        }
        // Display-only value, recomputed from the boundaries.
        handled.push("UserDuration");
        node.warn_unparsed(&handled);
    }

    /// Restores the boundary ordering after a read. Files edited by hand or
    /// remapped across videos can carry inconsistent values.
    fn sanitize_times(&mut self) {
        if self.time_visible < 0 {
            self.time_visible = 0;
        }
        if self.time_start != UNSET && self.time_start < 0 {
            self.time_start = 0;
        }
        if self.time_visible > self.time_start {
            self.time_visible = self.time_start;
        }
        if self.time_stop < self.time_start {
            self.time_stop = UNSET;
        }
        if self.time_invisible < self.time_stop {
            self.time_invisible = UNSET;
        }
        if !self.countdown_available() {
            self.countdown = false;
        }
    }
}

impl Drawing for ChronoMark {
    fn xml_type(&self) -> Option<&'static str> {
        Some("Chrono")
    }

    fn display_name(&self) -> String {
        if self.label.is_empty() {
            String::from("Stopwatch")
        } else {
            self.label.clone()
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            fading: false,
            opacity: false,
            style: true,
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
        _selected: bool,
        timestamp: i64,
    ) {
        let opacity = self.opacity_at(timestamp);
        if opacity <= 0.0 {
            return;
        }

        let font_size = self.properties.font_size_scaled(transform.scale);
        let fill = self.properties.background_brush(opacity * BACKGROUND_ALPHA);
        let main = transform.transform_rect(self.main_rectangle(timestamp));
        canvas.rounded_rect(fill, main, font_size / 4.0, false);
        canvas.text(
            &format!(" {} ", self.timecode(timestamp)),
            PointF::new(main.x, main.y),
            font_size,
            self.properties.foreground_brush(opacity),
        );

        if self.show_label && !self.label.is_empty() {
            let label_font = font_size / 2.0;
            let rect = transform.transform_rect(self.label_rectangle(timestamp));
            let fill = self.properties.background_brush(opacity * BACKGROUND_ALPHA);
            canvas.rounded_rect(fill, rect, label_font / 4.0, true);
            canvas.text(
                &self.label,
                PointF::new(rect.x, rect.y),
                label_font,
                self.properties.foreground_brush(opacity),
            );
        }
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if self.opacity_at(timestamp) <= 0.0 {
            return Hit::Miss;
        }

        let main = RoundedRectangle::new(self.main_rectangle(timestamp));
        let hit = main.hit_test(point, true);
        if hit >= 0 {
            return Hit::from_index(hit);
        }

        if self.show_label && !self.label.is_empty() {
            let label = RoundedRectangle::new(self.label_rectangle(timestamp));
            if label.hit_test(point, false) >= 0 {
                return Hit::Body;
            }
        }

        Hit::Miss
    }

    fn move_handle(&mut self, point: Point, _handle: u8, _modifiers: Modifiers) {
        // The hidden handle resizes by searching the closest font size
        // against the padded timecode text.
        let padded = format!(" {} ", self.timecode(self.time_start));
        let wanted_height = (point.y - self.main_background.rectangle().y) as f64;
        self.properties.force_font_size(wanted_height, &padded);
        self.style.read_back(&self.properties);
    }

    fn move_drawing(&mut self, dx: f64, dy: f64, _modifiers: Modifiers) {
        self.main_background.move_by(dx as i32, dy as i32);
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.time_visible.hash(&mut hasher);
        self.time_start.hash(&mut hasher);
        self.time_stop.hash(&mut hasher);
        self.time_invisible.hash(&mut hasher);
        self.countdown.hash(&mut hasher);
        self.label.hash(&mut hasher);
        self.show_label.hash(&mut hasher);
        let rect = self.main_background.rectangle();
        (rect.x, rect.y).hash(&mut hasher);
        hasher.finish() ^ self.style.content_hash()
    }

    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        let rect = self.main_background.rectangle();
        writer.point_element("Position", Point::new(rect.x, rect.y))?;

        writer.start("Values")?;
        write_time(writer, "Visible", self.time_visible)?;
        write_time(writer, "StartCounting", self.time_start)?;
        write_time(writer, "StopCounting", self.time_stop)?;
        write_time(writer, "Invisible", self.time_invisible)?;
        writer.bool_element("Countdown", self.countdown)?;
        // Human-readable duration for spreadsheet tools; recomputed on read.
        let duration = if self.time_start != UNSET && self.time_stop != UNSET {
            self.time_stop - self.time_start
        } else {
            0
        };
        writer.element(
            "UserDuration",
            &format_timecode(duration, self.timestamps_per_second),
        )?;
        writer.end("Values")?;

        writer.start("Label")?;
        writer.element("Text", &self.label)?;
        writer.bool_element("Show", self.show_label)?;
        writer.end("Label")?;

        writer.start("DrawingStyle")?;
        self.style.write_kva(writer)?;
        writer.end("DrawingStyle")
    }

    fn style(&self) -> Option<&DrawingStyle> {
        Some(&self.style)
    }

    fn style_mut(&mut self) -> Option<&mut DrawingStyle> {
        Some(&mut self.style)
    }
}

fn bind(style: &mut DrawingStyle) {
    style.bind("color", StyleTarget::Bicolor);
    style.bind("font size", StyleTarget::Font);
}

fn read_time(text: &str, remap: &dyn Fn(i64) -> i64) -> i64 {
    match text.trim().parse::<i64>() {
        Ok(v) if v < 0 => UNSET,
        Ok(v) => remap(v),
        Err(_) => UNSET,
    }
}

fn write_time(writer: &mut KvaWriter, name: &str, value: i64) -> Result<(), KvaError> {
    if value == UNSET {
        writer.element(name, "-1")
    } else {
        writer.int_element(name, value)
    }
}

/// Formats an elapsed duration as `m:ss.cc`.
pub fn format_timecode(timestamps: i64, timestamps_per_second: i64) -> String {
    if timestamps_per_second <= 0 || timestamps <= 0 {
        return String::from("0:00.00");
    }

    let total_centis = timestamps * 100 / timestamps_per_second;
    let centis = total_centis % 100;
    let total_seconds = total_centis / 100;
    let seconds = total_seconds % 60;
    let minutes = total_seconds / 60;
    format!("{}:{:02}.{:02}", minutes, seconds, centis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleElement;

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::rgb(0, 0, 0)));
        style.insert("font size", StyleElement::FontSize(16));
        style
    }

    fn chrono() -> ChronoMark {
        // Timebase: 10 timestamps per frame, 1000 per second.
        let mut c = ChronoMark::new(Point::new(50, 50), 1000, 10, preset());
        c.set_timestamps_per_second(1000);
        c
    }

    #[test]
    fn test_counts_up_between_start_and_stop() {
        let mut c = chrono();
        c.start(1000);
        c.stop(3000);

        assert_eq!(c.timecode(500), "0:00.00");
        assert_eq!(c.timecode(2000), "0:01.00");
        assert_eq!(c.timecode(3000), "0:02.00");
        // Frozen at the final value past the stop boundary.
        assert_eq!(c.timecode(9999), "0:02.00");
    }

    #[test]
    fn test_countdown_inverts_the_count() {
        let mut c = chrono();
        c.start(1000);
        c.stop(3000);
        c.set_countdown(true);

        assert_eq!(c.timecode(500), "0:02.00");
        assert_eq!(c.timecode(2000), "0:01.00");
        assert_eq!(c.timecode(9999), "0:00.00");
    }

    #[test]
    fn test_countdown_requires_a_stop_boundary() {
        let mut c = chrono();
        c.start(1000);
        c.set_countdown(true);
        assert!(!c.countdown());
    }

    #[test]
    fn test_visibility_window_with_overrun() {
        let mut c = chrono();
        c.start(1000);
        c.stop(1800);
        c.hide(2000);

        assert_eq!(c.opacity_at(999), 0.0);
        assert_eq!(c.opacity_at(1500), 1.0);
        assert_eq!(c.opacity_at(2000), 1.0);
        // 12 frames of 10 timestamps each to fade out.
        assert!((c.opacity_at(2060) - 0.5).abs() < 1e-9);
        assert_eq!(c.opacity_at(2120), 0.0);
    }

    #[test]
    fn test_commands_keep_boundaries_ordered() {
        let mut c = chrono();
        c.start(1000);
        c.stop(3000);

        // Restarting past the stop discards it.
        c.start(4000);
        assert!(!c.countdown_available());

        // Stopping before the start pulls the start back.
        c.stop(3500);
        c.start(1000);
        c.hide(2000);
        assert_eq!(c.elapsed(9999), 1000);
    }

    #[test]
    fn test_hit_main_background() {
        let mut c = chrono();
        c.start(1000);
        assert_eq!(c.hit_test(Point::new(55, 60), 1500), Hit::Body);
        assert_eq!(c.hit_test(Point::new(500, 500), 1500), Hit::Miss);
        // Invisible before the visible boundary.
        assert_eq!(c.hit_test(Point::new(55, 60), 500), Hit::Miss);
    }

    #[test]
    fn test_kva_round_trip() {
        let mut c = chrono();
        c.start(1000);
        c.stop(3000);
        c.set_label("Sprint");
        c.set_show_label(true);

        let mut writer = KvaWriter::new();
        writer.start("Chrono").unwrap();
        c.write_kva(&mut writer).unwrap();
        writer.end("Chrono").unwrap();

        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();
        let mut read = ChronoMark::read_kva(&node, (1.0, 1.0), &|t| t, 10, preset());
        read.set_timestamps_per_second(1000);
        assert_eq!(read.label(), "Sprint");
        assert!(read.show_label());
        assert_eq!(read.timecode(2000), "0:01.00");
        // Unset invisible boundary survives as the sentinel.
        assert_eq!(read.opacity_at(1_000_000), 1.0);
    }

    #[test]
    fn test_kva_writes_user_duration() {
        let mut c = chrono();
        c.start(1000);
        c.stop(3000);

        let mut writer = KvaWriter::new();
        writer.start("Chrono").unwrap();
        c.write_kva(&mut writer).unwrap();
        writer.end("Chrono").unwrap();

        let xml = writer.into_string().unwrap();
        assert!(xml.contains("<UserDuration>0:02.00</UserDuration>"));
    }

    #[test]
    fn test_kva_read_remaps_timestamps() {
        let mut c = chrono();
        c.start(1000);
        c.stop(3000);

        let mut writer = KvaWriter::new();
        writer.start("Chrono").unwrap();
        c.write_kva(&mut writer).unwrap();
        writer.end("Chrono").unwrap();

        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();
        let mut read = ChronoMark::read_kva(&node, (1.0, 1.0), &|t| t * 2, 10, preset());
        read.set_timestamps_per_second(1000);
        assert_eq!(read.timecode(6000), "0:04.00");
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0, 1000), "0:00.00");
        assert_eq!(format_timecode(1500, 1000), "0:01.50");
        assert_eq!(format_timecode(65_250, 1000), "1:05.25");
        assert_eq!(format_timecode(100, 0), "0:00.00");
    }
}
