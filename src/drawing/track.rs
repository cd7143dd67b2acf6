//! Trajectory of a tracked point across frames.
//!
//! A track is an extra drawing: it spans the interval between its first and
//! last point instead of fading around a single keyframe. Point timestamps
//! are stored relative to the track start, both in memory and in the KVA
//! file.

use std::hash::{Hash, Hasher};

use log::debug;

use crate::canvas::{Canvas, ImageTransform};
use crate::drawing::label::AnchoredLabel;
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{distance_to_segment, Point, PointF, RectF};
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::{DrawingStyle, StyleProperties, StyleTarget};

/// Radius of the current-position marker.
const MARKER_RADIUS: i32 = 4;

/// Frames past the last point during which the track fades out.
const ALLOWED_FRAMES_OVER: u32 = 12;

/// Number of points shown on each side of the current point in the
/// windowed views.
const FOCUS_WINDOW: usize = 30;

const BASE_ALPHA: f64 = 224.0 / 255.0;
const AFTER_CURRENT_ALPHA: f64 = 64.0 / 255.0;
const LABEL_VIEW_ALPHA: f64 = 80.0 / 255.0;

/// How much of the trajectory is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackView {
    #[default]
    Complete,
    Focus,
    Label,
}

impl TrackView {
    fn parse(s: &str) -> Self {
        match s.trim() {
            "Focus" => TrackView::Focus,
            "Label" => TrackView::Label,
            _ => TrackView::Complete,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            TrackView::Complete => "Complete",
            TrackView::Focus => "Focus",
            TrackView::Label => "Label",
        }
    }
}

/// One tracked position. `t` is relative to the track start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackPoint {
    pub x: i32,
    pub y: i32,
    pub t: i64,
}

impl TrackPoint {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub struct Track {
    positions: Vec<TrackPoint>,
    begin_timestamp: i64,
    end_timestamp: i64,
    view: TrackView,
    label: String,
    main_label: AnchoredLabel,
    keyframe_labels: Vec<AnchoredLabel>,
    style: DrawingStyle,
    properties: StyleProperties,
    fading: Fading,
}

impl Track {
    pub fn new(origin: Point, timestamp: i64, average_tpf: i64, preset: DrawingStyle) -> Self {
        let mut properties = StyleProperties::default();
        let mut style = preset;
        bind(&mut style);
        style.apply(&mut properties);

        let mut fading = Fading::new(timestamp, average_tpf);
        fading.use_default = false;
        fading.fading_frames = ALLOWED_FRAMES_OVER;

        let mut main_label = AnchoredLabel::new(origin, properties.color);
        main_label.set_text("Track");

        Self {
            positions: vec![TrackPoint {
                x: origin.x,
                y: origin.y,
                t: 0,
            }],
            begin_timestamp: timestamp,
            end_timestamp: timestamp,
            view: TrackView::Complete,
            label: String::from("Track"),
            main_label,
            keyframe_labels: Vec::new(),
            style,
            properties,
            fading,
        }
    }

    pub fn positions(&self) -> &[TrackPoint] {
        &self.positions
    }

    pub fn begin_timestamp(&self) -> i64 {
        self.begin_timestamp
    }

    pub fn end_timestamp(&self) -> i64 {
        self.end_timestamp
    }

    pub fn view(&self) -> TrackView {
        self.view
    }

    pub fn set_view(&mut self, view: TrackView) {
        self.view = view;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
        self.main_label.set_text(label);
    }

    /// Appends a position. Timestamps are absolute; points are expected in
    /// increasing time order.
    pub fn add_point(&mut self, point: Point, timestamp: i64) {
        self.positions.push(TrackPoint {
            x: point.x,
            y: point.y,
            t: timestamp - self.begin_timestamp,
        });
        if timestamp > self.end_timestamp {
            self.end_timestamp = timestamp;
        }
    }

    /// Drops every position strictly after the given timestamp. The first
    /// point always survives; a track is never empty.
    pub fn chop_after(&mut self, timestamp: i64) {
        let relative = timestamp - self.begin_timestamp;
        let first = self.positions[0];
        self.positions.retain(|p| p.t <= relative);
        if self.positions.is_empty() {
            self.positions.push(first);
        }
        self.end_timestamp = self
            .positions
            .last()
            .map(|p| p.t + self.begin_timestamp)
            .unwrap_or(self.begin_timestamp);
    }

    /// Fully opaque over the tracked interval, fading out past the last
    /// point. Never visible before the first point.
    pub fn opacity_at(&self, timestamp: i64) -> f64 {
        if timestamp < self.begin_timestamp {
            return 0.0;
        }
        if timestamp <= self.end_timestamp {
            return 1.0;
        }

        let window = ALLOWED_FRAMES_OVER as i64 * self.fading.average_timestamps_per_frame;
        if window <= 0 {
            return 0.0;
        }
        let over = timestamp - self.end_timestamp;
        if over >= window {
            0.0
        } else {
            1.0 - over as f64 / window as f64
        }
    }

    /// Index of the position closest in time to the given timestamp.
    pub fn closest_index(&self, timestamp: i64) -> usize {
        let mut best = 0;
        let mut best_err = i64::MAX;
        for (i, p) in self.positions.iter().enumerate() {
            let err = (p.t + self.begin_timestamp - timestamp).abs();
            if err < best_err {
                best_err = err;
                best = i;
            }
        }
        best
    }

    fn visible_range(&self, current: usize) -> (usize, usize) {
        if self.view == TrackView::Complete {
            return (0, self.positions.len() - 1);
        }
        let first = current.saturating_sub(FOCUS_WINDOW);
        let last = (current + FOCUS_WINDOW).min(self.positions.len() - 1);
        (first, last)
    }

    fn on_trajectory(&self, point: Point, first: usize, last: usize) -> bool {
        let margin = (self.properties.line_size as f64 + 7.0) / 2.0;
        let p = point.to_f();
        self.positions[first..=last]
            .windows(2)
            .any(|w| distance_to_segment(p, w[0].point().to_f(), w[1].point().to_f()) <= margin)
    }

    fn draw_trajectory(
        &self,
        canvas: &mut dyn Canvas,
        transform: &ImageTransform,
        first: usize,
        last: usize,
        opacity: f64,
    ) {
        if last <= first {
            return;
        }

        let points: Vec<PointF> = self.positions[first..=last]
            .iter()
            .map(|p| transform.transform(p.point()))
            .collect();

        let pen = self.properties.track_pen(opacity, transform.scale);
        canvas.polyline(&pen, &points);

        if self.properties.track_shape.stepped() {
            let margin = pen.width * 1.5;
            let step_pen = self.properties.pen(opacity, transform.scale);
            for p in &points {
                canvas.ellipse(
                    &step_pen,
                    RectF::new(p.x - margin, p.y - margin, margin * 2.0, margin * 2.0),
                );
            }
        }
    }

    fn draw_marker(&self, canvas: &mut dyn Canvas, transform: &ImageTransform, current: usize) {
        use crate::color::Color;

        let center = transform.transform(self.positions[current].point());
        let r = MARKER_RADIUS as f32;
        let rect = RectF::new(center.x - r, center.y - r, r * 2.0, r * 2.0);

        // Quadrant target marker.
        canvas.fill_pie(Color::BLACK, rect, 0.0, 90.0);
        canvas.fill_pie(Color::WHITE, rect, 90.0, 90.0);
        canvas.fill_pie(Color::BLACK, rect, 180.0, 90.0);
        canvas.fill_pie(Color::WHITE, rect, 270.0, 90.0);
        let outline = RectF::new(
            center.x - r - 2.0,
            center.y - r - 2.0,
            (r + 2.0) * 2.0,
            (r + 2.0) * 2.0,
        );
        canvas.ellipse(&crate::canvas::Stroke::solid(Color::WHITE, 1.0), outline);
    }

    /// Rebuilds the keyframe labels from the current keyframe set, keeping
    /// the custom position of labels that survive.
    pub fn integrate_keyframes(&mut self, keyframes: &[(i64, String)]) {
        let mut labels: Vec<AnchoredLabel> = Vec::new();
        for (timestamp, title) in keyframes {
            if *timestamp < self.begin_timestamp || *timestamp > self.end_timestamp {
                continue;
            }
            let index = self.closest_index(*timestamp);
            let mut label = self
                .keyframe_labels
                .iter()
                .find(|l| l.timestamp == *timestamp)
                .cloned()
                .unwrap_or_else(|| {
                    AnchoredLabel::new(self.positions[index].point(), self.properties.color)
                });
            label.timestamp = *timestamp;
            label.attach_index = index;
            label.set_text(title);
            label.set_attach(self.positions[index].point(), false);
            labels.push(label);
        }
        self.keyframe_labels = labels;
    }

    pub fn read_kva(
        node: &XmlNode,
        scale: (f64, f64),
        remap: &dyn Fn(i64, bool) -> i64,
        average_tpf: i64,
        preset: DrawingStyle,
    ) -> Option<Self> {
        let mut track = Self::new(Point::ORIGIN, 0, average_tpf, preset);
        track.positions.clear();
        let mut handled: Vec<&str> = Vec::new();

        if let Some(text) = node.child_text("TimePosition") {
            track.begin_timestamp = remap(xml::parse_int_or(text, 0), false);
            track.fading.reference_timestamp = track.begin_timestamp;
            handled.push("TimePosition");
        }
        if let Some(text) = node.child_text("Mode") {
            track.view = TrackView::parse(text);
            handled.push("Mode");
        }
        if let Some(list) = node.child("TrackPointList") {
            for child in list.children_named("TrackPoint") {
                let mut parts = child.text.split(';');
                let x = parts.next().and_then(|s| s.trim().parse::<f64>().ok());
                let y = parts.next().and_then(|s| s.trim().parse::<f64>().ok());
                let t = parts.next().and_then(|s| s.trim().parse::<i64>().ok());
                if let (Some(x), Some(y), Some(t)) = (x, y, t) {
                    track.positions.push(TrackPoint {
                        x: (scale.0 * x) as i32,
                        y: (scale.1 * y) as i32,
                        t: remap(t, true),
                    });
                } else {
                    debug!("Unparsed content in KVA XML: <{}>", child.name);
                }
            }
            handled.push("TrackPointList");
        }
        if let Some(style_node) = node.child("DrawingStyle") {
            track.style = DrawingStyle::read_kva(style_node);
            bind(&mut track.style);
            track.style.apply(&mut track.properties);
            handled.push("DrawingStyle");
        }
        if let Some(label_node) = node.child("MainLabel") {
            if let Some(text) = label_node.attribute("Text") {
                track.label = text.to_string();
            }
            track.main_label.read_kva(label_node, scale);
            handled.push("MainLabel");
        }
        if let Some(list) = node.child("KeyframeLabelList") {
            handled.push("KeyframeLabelList");
            for child in list.children_named("KeyframeLabel") {
                let mut label = AnchoredLabel::new(Point::ORIGIN, track.properties.color);
                label.read_kva(child, scale);
                track.keyframe_labels.push(label);
            }
        }
        node.warn_unparsed(&handled);

        if track.positions.is_empty() {
            return None;
        }

        track.end_timestamp =
            track.positions.last().map(|p| p.t).unwrap_or(0) + track.begin_timestamp;
        track
            .main_label
            .set_attach(track.positions[0].point(), false);
        let label = track.label.clone();
        track.main_label.set_text(&label);

        let mut keyframe_labels = std::mem::take(&mut track.keyframe_labels);
        for label in &mut keyframe_labels {
            let index = track.closest_index(label.timestamp);
            label.attach_index = index;
            label.set_attach(track.positions[index].point(), false);
        }
        track.keyframe_labels = keyframe_labels;

        // A lone all-zero point is the signature of a failed parse.
        let first = track.positions[0];
        if track.positions.len() == 1 && first.x == 0 && first.y == 0 && first.t == 0 {
            return None;
        }

        Some(track)
    }
}

impl Drawing for Track {
    fn xml_type(&self) -> Option<&'static str> {
        None
    }

    fn display_name(&self) -> String {
        self.label.clone()
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
        if opacity <= 0.0 || self.positions.is_empty() {
            return;
        }

        let current = self.closest_index(timestamp);
        let (first, last) = self.visible_range(current);

        if self.positions.len() > 1 {
            match self.view {
                TrackView::Complete => {
                    // Segments already travelled are brighter than the rest.
                    self.draw_trajectory(canvas, transform, first, current, opacity * BASE_ALPHA);
                    self.draw_trajectory(canvas, transform, current, last, AFTER_CURRENT_ALPHA);
                }
                TrackView::Focus => {
                    self.draw_trajectory(canvas, transform, first, last, opacity * BASE_ALPHA);
                }
                TrackView::Label => {
                    self.draw_trajectory(canvas, transform, first, last, opacity * LABEL_VIEW_ALPHA);
                }
            }
        }

        if opacity >= 1.0 && self.view != TrackView::Label {
            self.draw_marker(canvas, transform, current);
        }

        if self.view != TrackView::Label {
            for label in &self.keyframe_labels {
                let visible = self.view == TrackView::Complete
                    || self.fading.is_visible(
                        self.positions[current].t + self.begin_timestamp,
                        label.timestamp,
                        FOCUS_WINDOW as u32,
                    );
                if visible {
                    label.draw(canvas, transform, opacity);
                }
            }
        } else if opacity >= 1.0 {
            let mut main = self.main_label.clone();
            main.set_attach(self.positions[current].point(), true);
            main.draw(canvas, transform, opacity);
        }
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if timestamp < self.begin_timestamp || timestamp > self.end_timestamp {
            return Hit::Miss;
        }

        if self.view == TrackView::Label && self.main_label.hit_test(point) {
            return Hit::Handle(2);
        }
        for (i, label) in self.keyframe_labels.iter().enumerate() {
            if label.hit_test(point) {
                return Hit::Handle(3 + i as u8);
            }
        }

        let current = self.closest_index(timestamp);
        let target = self.positions[current]
            .point()
            .box_around(MARKER_RADIUS + 3);
        if target.contains(point) {
            return Hit::Handle(1);
        }

        let (first, last) = self.visible_range(current);
        if self.on_trajectory(point, first, last) {
            Hit::Body
        } else {
            Hit::Miss
        }
    }

    fn move_handle(&mut self, point: Point, handle: u8, _modifiers: Modifiers) {
        // Handle 1 is the playhead cursor, moved by the host. Labels float
        // freely around their attach point.
        match handle {
            2 => self.main_label.set_label(point),
            h if h >= 3 => {
                if let Some(label) = self.keyframe_labels.get_mut(h as usize - 3) {
                    label.set_label(point);
                }
            }
            _ => {}
        }
    }

    fn move_drawing(&mut self, _dx: f64, _dy: f64, _modifiers: Modifiers) {
        // Tracked positions come from the video; the trajectory itself does
        // not translate.
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.begin_timestamp.hash(&mut hasher);
        self.label.hash(&mut hasher);
        for p in &self.positions {
            p.hash(&mut hasher);
        }
        hasher.finish() ^ self.style.content_hash()
    }

    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.int_element("TimePosition", self.begin_timestamp)?;
        writer.element("Mode", self.view.as_str())?;

        writer.start_with_attr("TrackPointList", "Count", &self.positions.len().to_string())?;
        for p in &self.positions {
            writer.element("TrackPoint", &format!("{};{};{}", p.x, p.y, p.t))?;
        }
        writer.end("TrackPointList")?;

        writer.start("DrawingStyle")?;
        self.style.write_kva(writer)?;
        writer.end("DrawingStyle")?;

        writer.start_with_attr("MainLabel", "Text", &self.label)?;
        self.main_label.write_kva(writer)?;
        writer.end("MainLabel")?;

        if !self.keyframe_labels.is_empty() {
            writer.start_with_attr(
                "KeyframeLabelList",
                "Count",
                &self.keyframe_labels.len().to_string(),
            )?;
            for label in &self.keyframe_labels {
                writer.start("KeyframeLabel")?;
                label.write_kva(writer)?;
                writer.end("KeyframeLabel")?;
            }
            writer.end("KeyframeLabelList")?;
        }

        Ok(())
    }

    fn style(&self) -> Option<&DrawingStyle> {
        Some(&self.style)
    }

    fn style_mut(&mut self) -> Option<&mut DrawingStyle> {
        Some(&mut self.style)
    }
}

fn bind(style: &mut DrawingStyle) {
    style.bind("color", StyleTarget::Color);
    style.bind("line size", StyleTarget::LineSize);
    style.bind("track shape", StyleTarget::TrackShape);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::style::StyleElement;

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::rgb(255, 0, 0)));
        style.insert("line size", StyleElement::LineSize(3));
        style.insert(
            "track shape",
            StyleElement::TrackShape(crate::style::TrackShape::Solid),
        );
        style
    }

    fn track() -> Track {
        let mut t = Track::new(Point::new(100, 100), 1000, 10, preset());
        t.add_point(Point::new(150, 100), 1010);
        t.add_point(Point::new(200, 120), 1020);
        t.add_point(Point::new(260, 160), 1030);
        t
    }

    #[test]
    fn test_relative_timestamps() {
        let t = track();
        assert_eq!(t.begin_timestamp(), 1000);
        assert_eq!(t.end_timestamp(), 1030);
        assert_eq!(t.positions()[0].t, 0);
        assert_eq!(t.positions()[3].t, 30);
    }

    #[test]
    fn test_opacity_fades_after_end_only() {
        let t = track();
        assert_eq!(t.opacity_at(999), 0.0);
        assert_eq!(t.opacity_at(1000), 1.0);
        assert_eq!(t.opacity_at(1030), 1.0);
        // 12 frames of 10 timestamps to fade.
        assert!((t.opacity_at(1090) - 0.5).abs() < 1e-9);
        assert_eq!(t.opacity_at(1150), 0.0);
    }

    #[test]
    fn test_closest_index() {
        let t = track();
        assert_eq!(t.closest_index(1000), 0);
        assert_eq!(t.closest_index(1012), 1);
        assert_eq!(t.closest_index(9999), 3);
    }

    #[test]
    fn test_hit_marker_and_trajectory() {
        let t = track();
        // At ts 1010 the current point is (150,100).
        assert_eq!(t.hit_test(Point::new(152, 102), 1010), Hit::Handle(1));
        // On the first segment, away from the marker box.
        assert_eq!(t.hit_test(Point::new(120, 101), 1030), Hit::Body);
        assert_eq!(t.hit_test(Point::new(120, 300), 1010), Hit::Miss);
        // Outside the tracked interval.
        assert_eq!(t.hit_test(Point::new(152, 102), 2000), Hit::Miss);
    }

    #[test]
    fn test_chop_after() {
        let mut t = track();
        t.chop_after(1015);
        assert_eq!(t.positions().len(), 2);
        assert_eq!(t.end_timestamp(), 1010);
    }

    #[test]
    fn test_chop_before_begin_keeps_first_point() {
        let mut t = track();
        t.chop_after(500);
        assert_eq!(t.positions().len(), 1);
        assert_eq!(t.end_timestamp(), 1000);
        // The surviving origin point stays hittable.
        assert_eq!(t.hit_test(Point::new(100, 100), 1000), Hit::Handle(1));
    }

    #[test]
    fn test_kva_read_reattaches_keyframe_labels() {
        let node = XmlNode::parse(
            "<Track>\
               <TimePosition>1000</TimePosition>\
               <TrackPointList Count=\"2\">\
                 <TrackPoint>100;100;0</TrackPoint>\
                 <TrackPoint>150;100;10</TrackPoint>\
               </TrackPointList>\
               <KeyframeLabelList Count=\"1\">\
                 <KeyframeLabel>\
                   <SpacePosition>150;90</SpacePosition>\
                   <TimePosition>1012</TimePosition>\
                 </KeyframeLabel>\
               </KeyframeLabelList>\
             </Track>",
        )
        .unwrap();
        let read = Track::read_kva(&node, (1.0, 1.0), &|t, _| t, 10, preset()).unwrap();
        assert_eq!(read.keyframe_labels.len(), 1);
        assert_eq!(read.keyframe_labels[0].attach_index, 1);
    }

    #[test]
    fn test_kva_round_trip() {
        let mut t = track();
        t.set_label("Ball");
        t.set_view(TrackView::Focus);

        let mut writer = KvaWriter::new();
        writer.start("Track").unwrap();
        t.write_kva(&mut writer).unwrap();
        writer.end("Track").unwrap();

        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();
        let read = Track::read_kva(&node, (1.0, 1.0), &|t, _| t, 10, preset()).unwrap();
        assert_eq!(read.label(), "Ball");
        assert_eq!(read.view(), TrackView::Focus);
        assert_eq!(read.positions(), t.positions());
        assert_eq!(read.begin_timestamp(), 1000);
        assert_eq!(read.end_timestamp(), 1030);
    }

    #[test]
    fn test_kva_read_rejects_empty_track() {
        let node = XmlNode::parse(
            "<Track><TimePosition>0</TimePosition><TrackPointList Count=\"0\"></TrackPointList></Track>",
        )
        .unwrap();
        assert!(Track::read_kva(&node, (1.0, 1.0), &|t, _| t, 10, preset()).is_none());
    }

    #[test]
    fn test_integrate_keyframes() {
        let mut t = track();
        t.integrate_keyframes(&[
            (1010, String::from("Take off")),
            (5000, String::from("Out of range")),
        ]);
        assert_eq!(t.keyframe_labels.len(), 1);
        assert_eq!(t.keyframe_labels[0].text(), "Take off");
        assert_eq!(t.keyframe_labels[0].attach_index, 1);
    }
}
