//! The annotation document for one video.
//!
//! `Metadata` aggregates everything persisted to a KVA file: the keyframes
//! with their attached drawings, the unattached chronometers and
//! trajectories, the timebase of the source video and the calibration block.
//! It also owns the selection bookkeeping and the dirty tracking used to
//! prompt before discarding unsaved work.

use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::drawing::{ChronoMark, Drawing, Hit, Track};
use crate::fading::FadingProfile;
use crate::geometry::{Point, Size};
use crate::keyframe::Keyframe;
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::{migration, DrawingRegistry, KvaError, FORMAT_VERSION};
use crate::tools::ToolKit;

/// Spatial calibration of the video: pixel-to-unit ratio, the unit label and
/// the user-chosen origin of the coordinate system.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub pixel_to_unit: f64,
    pub length_unit: String,
    pub length_unit_abbreviation: String,
    pub coordinates_origin: Point,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pixel_to_unit: 1.0,
            length_unit: String::from("Pixels"),
            length_unit_abbreviation: String::from("px"),
            coordinates_origin: Point::new(-1, -1),
        }
    }
}

/// A drawing that belongs to the whole video rather than one keyframe.
pub enum ExtraDrawing {
    Chrono(ChronoMark),
    Track(Track),
}

impl ExtraDrawing {
    pub fn drawing(&self) -> &dyn Drawing {
        match self {
            ExtraDrawing::Chrono(c) => c,
            ExtraDrawing::Track(t) => t,
        }
    }

    pub fn drawing_mut(&mut self) -> &mut dyn Drawing {
        match self {
            ExtraDrawing::Chrono(c) => c,
            ExtraDrawing::Track(t) => t,
        }
    }

    pub fn as_chrono(&self) -> Option<&ChronoMark> {
        match self {
            ExtraDrawing::Chrono(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_track(&self) -> Option<&Track> {
        match self {
            ExtraDrawing::Track(t) => Some(t),
            _ => None,
        }
    }
}

/// Converts timestamps read from a KVA file into the timebase of the video
/// currently loaded. Built from the file's stored context and the current
/// one; when both match the input passes through unchanged.
#[derive(Debug, Clone, Copy)]
struct TimestampMapper {
    same_context: bool,
    input_average_tpf: i64,
    input_first_timestamp: i64,
    input_selection_start: i64,
    duplicate_factor: f64,
    average_tpf: i64,
    first_timestamp: i64,
}

impl TimestampMapper {
    fn remap(&self, input: i64, relative: bool) -> i64 {
        if self.input_average_tpf == 0 || self.same_context {
            return input;
        }

        if relative {
            let frames = input as f64 / self.input_average_tpf as f64;
            (frames * self.duplicate_factor * self.average_tpf as f64) as i64
        } else {
            // Files written during a working-zone selection store timestamps
            // offset by the selection start rather than the stream origin.
            let origin = if self.input_selection_start - self.input_first_timestamp > 0 {
                self.input_selection_start
            } else {
                self.input_first_timestamp
            };
            let frames = (input - origin) as f64 / self.input_average_tpf as f64;
            (frames * self.duplicate_factor * self.average_tpf as f64) as i64
                + self.first_timestamp
        }
    }
}

pub struct Metadata {
    keyframes: Vec<Keyframe>,
    extra_drawings: Vec<ExtraDrawing>,

    /// Size of the video frames, used to rescale coordinates on import.
    pub image_size: Size,
    pub average_timestamps_per_frame: i64,
    pub timestamps_per_second: i64,
    pub first_timestamp: i64,
    pub selection_start: i64,
    pub duplicate_factor: f64,
    pub calibration: Calibration,
    pub global_title: String,
    pub full_path: PathBuf,

    /// The tool presets, used as base styles when reading drawings back.
    pub tools: ToolKit,
    registry: DrawingRegistry,
    default_fading: FadingProfile,

    // Context stored in the file being imported, kept for timestamp
    // remapping while parsing.
    input_image_size: Size,
    input_average_tpf: i64,
    input_first_timestamp: i64,
    input_selection_start: i64,
    input_file_name: String,

    clean_hash: u64,

    selected_keyframe: Option<usize>,
    selected_drawing: Option<(usize, usize)>,
    selected_extra: Option<usize>,
}

impl Metadata {
    pub fn new() -> Self {
        Self {
            keyframes: Vec::new(),
            extra_drawings: Vec::new(),
            image_size: Size::new(0, 0),
            average_timestamps_per_frame: 1,
            timestamps_per_second: 0,
            first_timestamp: 0,
            selection_start: 0,
            duplicate_factor: 1.0,
            calibration: Calibration::default(),
            global_title: String::from(" "),
            full_path: PathBuf::new(),
            tools: ToolKit::new(),
            registry: DrawingRegistry::standard(),
            default_fading: FadingProfile::default(),
            input_image_size: Size::new(0, 0),
            input_average_tpf: 0,
            input_first_timestamp: 0,
            input_selection_start: 0,
            input_file_name: String::new(),
            clean_hash: 0,
            selected_keyframe: None,
            selected_drawing: None,
            selected_extra: None,
        }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn keyframes_mut(&mut self) -> &mut Vec<Keyframe> {
        &mut self.keyframes
    }

    pub fn extra_drawings(&self) -> &[ExtraDrawing] {
        &self.extra_drawings
    }

    pub fn extra_drawings_mut(&mut self) -> &mut Vec<ExtraDrawing> {
        &mut self.extra_drawings
    }

    pub fn has_data(&self) -> bool {
        !self.keyframes.is_empty() || !self.extra_drawings.is_empty()
    }

    /// Creates a keyframe at the given position, keeping the list sorted.
    /// Returns the index of the new (or already existing) keyframe.
    pub fn add_keyframe(&mut self, position: i64) -> usize {
        if let Some(i) = self.keyframes.iter().position(|k| k.position == position) {
            return i;
        }
        let timecode = self.timecode(position);
        let keyframe = Keyframe::new(position, &timecode);
        let index = self
            .keyframes
            .iter()
            .position(|k| k.position > position)
            .unwrap_or(self.keyframes.len());
        self.keyframes.insert(index, keyframe);
        index
    }

    /// Merges a keyframe read from file: drawings of a keyframe at an
    /// already known position join the existing one.
    fn merge_keyframe(&mut self, mut keyframe: Keyframe) {
        if let Some(existing) = self
            .keyframes
            .iter_mut()
            .find(|k| k.position == keyframe.position)
        {
            for drawing in keyframe.drawings_mut().drain(..) {
                existing.add_drawing(drawing);
            }
            return;
        }
        let index = self
            .keyframes
            .iter()
            .position(|k| k.position > keyframe.position)
            .unwrap_or(self.keyframes.len());
        self.keyframes.insert(index, keyframe);
    }

    pub fn remove_keyframe(&mut self, index: usize) -> Option<Keyframe> {
        if index >= self.keyframes.len() {
            return None;
        }
        self.unselect_all();
        Some(self.keyframes.remove(index))
    }

    pub fn sort_keyframes(&mut self) {
        self.keyframes.sort_by_key(|k| k.position);
    }

    pub fn clear_keyframes(&mut self) {
        self.keyframes.clear();
        self.unselect_all();
    }

    pub fn add_chrono(&mut self, mut chrono: ChronoMark) {
        chrono.set_timestamps_per_second(self.timestamps_per_second);
        self.extra_drawings.push(ExtraDrawing::Chrono(chrono));
    }

    pub fn add_track(&mut self, track: Track) {
        self.extra_drawings.push(ExtraDrawing::Track(track));
    }

    pub fn remove_extra_drawing(&mut self, index: usize) -> Option<ExtraDrawing> {
        if index >= self.extra_drawings.len() {
            return None;
        }
        self.unselect_all();
        Some(self.extra_drawings.remove(index))
    }

    /// Timecode of a position, relative to the working-zone start.
    pub fn timecode(&self, position: i64) -> String {
        crate::drawing::chrono::format_timecode(
            position - self.selection_start,
            self.timestamps_per_second,
        )
    }

    // Selection.

    pub fn selected_keyframe(&self) -> Option<usize> {
        self.selected_keyframe
    }

    pub fn select_keyframe(&mut self, index: usize) {
        if index < self.keyframes.len() {
            self.selected_keyframe = Some(index);
        }
    }

    pub fn selected_drawing(&self) -> Option<(usize, usize)> {
        self.selected_drawing
    }

    pub fn selected_extra_drawing(&self) -> Option<usize> {
        self.selected_extra
    }

    pub fn unselect_all(&mut self) {
        self.selected_keyframe = None;
        self.selected_drawing = None;
        self.selected_extra = None;
    }

    /// Keyframe indices in the order their drawings should be probed and
    /// painted for the given time: the upcoming keyframe first, then later
    /// ones, then earlier ones walking backwards.
    pub fn keyframes_z_order(&self, timestamp: i64) -> Vec<usize> {
        let n = self.keyframes.len();
        if n == 0 {
            return Vec::new();
        }
        if timestamp <= self.keyframes[0].position {
            return (0..n).collect();
        }
        if timestamp > self.keyframes[n - 1].position {
            return (0..n).rev().collect();
        }

        let closest_next = self
            .keyframes
            .iter()
            .position(|k| k.position >= timestamp)
            .unwrap_or(n - 1);
        let mut order: Vec<usize> = (closest_next..n).collect();
        order.extend((0..closest_next).rev());
        order
    }

    /// Probes the unattached drawings, topmost first. A hit records the
    /// selection and reports the index and handle.
    pub fn hit_extra_drawing(&mut self, point: Point, timestamp: i64) -> Option<(usize, Hit)> {
        for index in (0..self.extra_drawings.len()).rev() {
            let hit = self.extra_drawings[index].drawing().hit_test(point, timestamp);
            if hit.is_hit() {
                self.selected_extra = Some(index);
                return Some((index, hit));
            }
        }
        None
    }

    /// Probes the keyframe-attached drawings. With default fading on, every
    /// keyframe is tested in z-order; otherwise only the active keyframe.
    pub fn hit_drawing(
        &mut self,
        point: Point,
        timestamp: i64,
        active_keyframe: Option<usize>,
    ) -> Option<(usize, usize, Hit)> {
        if self.default_fading.enabled {
            for kf in self.keyframes_z_order(timestamp) {
                if let Some(result) = self.hit_keyframe_drawings(kf, point, timestamp) {
                    return Some(result);
                }
            }
            None
        } else {
            let kf = active_keyframe?;
            self.hit_keyframe_drawings(kf, point, timestamp)
        }
    }

    fn hit_keyframe_drawings(
        &mut self,
        kf: usize,
        point: Point,
        timestamp: i64,
    ) -> Option<(usize, usize, Hit)> {
        let found = self.keyframes[kf]
            .drawings()
            .iter()
            .enumerate()
            .find_map(|(i, drawing)| {
                let hit = drawing.hit_test(point, timestamp);
                hit.is_hit().then_some((i, hit))
            });

        let (i, hit) = found?;
        self.selected_keyframe = Some(kf);
        self.selected_drawing = Some((kf, i));
        Some((kf, i, hit))
    }

    // Dirty tracking.

    pub fn content_hash(&self) -> u64 {
        let mut hash = 0u64;
        for keyframe in &self.keyframes {
            hash ^= keyframe.content_hash();
        }
        for extra in &self.extra_drawings {
            hash ^= extra.drawing().content_hash();
        }
        hash
    }

    pub fn is_dirty(&self) -> bool {
        self.content_hash() != self.clean_hash
    }

    /// Takes the current content as the clean baseline, after a save or load.
    pub fn cleanup_hash(&mut self) {
        self.clean_hash = self.content_hash();
        debug!("Metadata hash reset.");
    }

    /// Drops all annotation data, when the video is unloaded.
    pub fn reset(&mut self) {
        self.keyframes.clear();
        self.extra_drawings.clear();
        self.global_title = String::from(" ");
        self.calibration = Calibration::default();
        self.duplicate_factor = 1.0;
        self.input_image_size = Size::new(0, 0);
        self.input_average_tpf = 0;
        self.input_first_timestamp = 0;
        self.input_selection_start = 0;
        self.input_file_name.clear();
        self.unselect_all();
        self.cleanup_hash();
    }

    /// Default fading applied to new drawings, propagated to existing ones.
    pub fn set_default_fading(&mut self, profile: FadingProfile) {
        self.default_fading = profile;
        for keyframe in &mut self.keyframes {
            for drawing in keyframe.drawings_mut() {
                drawing.fading_mut().set_default_profile(profile);
            }
        }
        for extra in &mut self.extra_drawings {
            extra.drawing_mut().fading_mut().set_default_profile(profile);
        }
    }

    pub fn default_fading(&self) -> FadingProfile {
        self.default_fading
    }

    /// Rebuilds the keyframe labels riding on every trajectory.
    pub fn update_trajectories(&mut self) {
        let keyframes: Vec<(i64, String)> = self
            .keyframes
            .iter()
            .filter(|k| !k.disabled)
            .map(|k| (k.position, k.title().to_string()))
            .collect();
        for extra in &mut self.extra_drawings {
            if let ExtraDrawing::Track(track) = extra {
                track.integrate_keyframes(&keyframes);
            }
        }
    }

    /// Remaps a timestamp read from the imported file into the current
    /// timebase. `relative` distinguishes durations from stream positions.
    pub fn remap_timestamp(&self, input: i64, relative: bool) -> i64 {
        self.mapper().remap(input, relative)
    }

    fn mapper(&self) -> TimestampMapper {
        let current_file = file_stem(&self.full_path);
        TimestampMapper {
            same_context: self.input_first_timestamp == self.first_timestamp
                && self.input_average_tpf == self.average_timestamps_per_frame
                && self.input_file_name == current_file,
            input_average_tpf: self.input_average_tpf,
            input_first_timestamp: self.input_first_timestamp,
            input_selection_start: self.input_selection_start,
            duplicate_factor: self.duplicate_factor,
            average_tpf: self.average_timestamps_per_frame,
            first_timestamp: self.first_timestamp,
        }
    }

    fn scaling(&self) -> (f64, f64) {
        if self.image_size.width > 0
            && self.image_size.height > 0
            && self.input_image_size.width > 0
            && self.input_image_size.height > 0
        {
            (
                self.image_size.width as f64 / self.input_image_size.width as f64,
                self.image_size.height as f64 / self.input_image_size.height as f64,
            )
        } else {
            (1.0, 1.0)
        }
    }

    // Import.

    pub fn load_from_file(&mut self, path: &Path) -> Result<(), KvaError> {
        info!("Importing KVA file: {}", path.display());
        let xml = std::fs::read_to_string(path)?;
        self.load_from_str(&xml)
    }

    /// Parses a KVA document and merges its content into this metadata.
    /// Unknown elements are logged and skipped; an unsupported format
    /// version fails the load.
    pub fn load_from_str(&mut self, xml: &str) -> Result<(), KvaError> {
        let mut root = XmlNode::parse(xml)?;
        if root.name != "KinoveaVideoAnalysis" {
            return Err(KvaError::invalid_document(format!(
                "unexpected root element: <{}>",
                root.name
            )));
        }

        let version = migration::check_version(&root)?;
        if migration::needs_migration(version) {
            migration::migrate(&mut root);
        }

        self.read_header(&root);

        let scale = self.scaling();
        let mapper = self.mapper();

        if let Some(keyframes) = root.child("Keyframes") {
            for node in keyframes.children_named("Keyframe") {
                self.parse_keyframe(node, scale, &mapper);
            }
        }
        if let Some(chronos) = root.child("Chronos") {
            for node in chronos.children_named("Chrono") {
                let mut chrono = ChronoMark::read_kva(
                    node,
                    scale,
                    &|t| mapper.remap(t, false),
                    self.average_timestamps_per_frame,
                    self.tools.preset_for("Chrono"),
                );
                chrono.set_timestamps_per_second(self.timestamps_per_second);
                self.extra_drawings.push(ExtraDrawing::Chrono(chrono));
            }
        }
        if let Some(tracks) = root.child("Tracks") {
            for node in tracks.children_named("Track") {
                let track = Track::read_kva(
                    node,
                    scale,
                    &|t, relative| mapper.remap(t, relative),
                    self.average_timestamps_per_frame,
                    self.tools.preset_for("Track"),
                );
                if let Some(track) = track {
                    self.extra_drawings.push(ExtraDrawing::Track(track));
                }
            }
        }

        root.warn_unparsed(&[
            "FormatVersion",
            "Producer",
            "OriginalFilename",
            "GlobalTitle",
            "ImageSize",
            "AverageTimeStampsPerFrame",
            "FirstTimeStamp",
            "SelectionStart",
            "DuplicationFactor",
            "CalibrationHelp",
            "Keyframes",
            "Chronos",
            "Tracks",
        ]);

        self.update_trajectories();
        Ok(())
    }

    fn read_header(&mut self, root: &XmlNode) {
        if let Some(text) = root.child_text("OriginalFilename") {
            self.input_file_name = text.to_string();
        }
        if let Some(text) = root.child_text("GlobalTitle") {
            self.global_title = text.to_string();
        }
        if let Some(text) = root.child_text("ImageSize") {
            let p = xml::parse_point(text);
            self.input_image_size = Size::new(p.x, p.y);
        }
        if let Some(text) = root.child_text("AverageTimeStampsPerFrame") {
            self.input_average_tpf = xml::parse_int_or(text, 0);
        }
        if let Some(text) = root.child_text("FirstTimeStamp") {
            self.input_first_timestamp = xml::parse_int_or(text, 0);
        }
        if let Some(text) = root.child_text("SelectionStart") {
            self.input_selection_start = xml::parse_int_or(text, 0);
        }
        if let Some(text) = root.child_text("DuplicationFactor") {
            self.duplicate_factor = text.trim().parse().unwrap_or(1.0);
        }
        if let Some(node) = root.child("CalibrationHelp") {
            self.read_calibration(node);
        }
    }

    fn read_calibration(&mut self, node: &XmlNode) {
        if let Some(text) = node.child_text("PixelToUnit") {
            self.calibration.pixel_to_unit = text.trim().parse().unwrap_or(1.0);
        }
        if let Some(unit) = node.child("LengthUnit") {
            self.calibration.length_unit = unit.text.clone();
            if let Some(abbr) = unit.attribute("UserUnitLength") {
                self.calibration.length_unit_abbreviation = abbr.to_string();
            }
        }
        if let Some(text) = node.child_text("CoordinatesOrigin") {
            self.calibration.coordinates_origin = xml::parse_point(text);
        }
        node.warn_unparsed(&["PixelToUnit", "LengthUnit", "CoordinatesOrigin"]);
    }

    fn parse_keyframe(&mut self, node: &XmlNode, scale: (f64, f64), mapper: &TimestampMapper) {
        let position = match node.child("Position") {
            Some(p) => mapper.remap(xml::parse_int_or(&p.text, 0), false),
            None => {
                error!("Keyframe without a position in KVA XML.");
                return;
            }
        };

        let timecode = node
            .child("Position")
            .and_then(|p| p.attribute("UserTime"))
            .map(str::to_string)
            .unwrap_or_else(|| self.timecode(position));

        let mut keyframe = Keyframe::new(position, &timecode);
        if let Some(title) = node.child_text("Title") {
            keyframe.set_title(title);
        }
        if let Some(comment) = node.child_text("Comment") {
            keyframe.comment = comment.to_string();
        }

        if let Some(drawings) = node.child("Drawings") {
            for child in &drawings.children {
                let preset = self.tools.preset_for(&child.name);
                match self.registry.create(child, scale, preset) {
                    Ok(mut drawing) => {
                        let fading = drawing.fading_mut();
                        fading.reference_timestamp = position;
                        fading.average_timestamps_per_frame = self.average_timestamps_per_frame;
                        fading.set_default_profile(self.default_fading);
                        keyframe.add_drawing(drawing);
                    }
                    Err(KvaError::UnknownDrawingType { name }) => {
                        debug!("Unparsed content in KVA XML: <{}>", name);
                    }
                    Err(e) => {
                        error!("Failed to read drawing <{}>: {}", child.name, e);
                    }
                }
            }
        }

        node.warn_unparsed(&["Position", "Title", "Comment", "Drawings"]);
        self.merge_keyframe(keyframe);
    }

    // Export.

    /// Serializes to a compact string, for embedding or network transfer.
    /// The extra duplication factor compounds with the stored one, used when
    /// exporting a slow-motion re-encode.
    pub fn to_xml_string(&self, duplicate_factor: f64) -> Result<String, KvaError> {
        let mut writer = KvaWriter::new();
        self.write_kva(&mut writer, self.duplicate_factor * duplicate_factor)?;
        writer.into_string()
    }

    /// Writes the indented document to disk and resets the dirty baseline.
    pub fn write_to_file(&mut self, path: &Path) -> Result<(), KvaError> {
        let mut writer = KvaWriter::new_indented();
        self.write_kva(&mut writer, self.duplicate_factor)?;
        std::fs::write(path, writer.into_string()?)?;
        self.cleanup_hash();
        Ok(())
    }

    fn write_kva(&self, writer: &mut KvaWriter, duplicate_factor: f64) -> Result<(), KvaError> {
        writer.declaration()?;
        writer.start("KinoveaVideoAnalysis")?;
        writer.element("FormatVersion", FORMAT_VERSION)?;
        writer.element(
            "Producer",
            &format!("vannot ({})", env!("CARGO_PKG_VERSION")),
        )?;
        writer.element("OriginalFilename", &file_stem(&self.full_path))?;
        if !self.global_title.is_empty() {
            writer.element("GlobalTitle", &self.global_title)?;
        }
        writer.point_element(
            "ImageSize",
            Point::new(self.image_size.width, self.image_size.height),
        )?;
        writer.int_element(
            "AverageTimeStampsPerFrame",
            self.average_timestamps_per_frame,
        )?;
        writer.int_element("FirstTimeStamp", self.first_timestamp)?;
        writer.int_element("SelectionStart", self.selection_start)?;
        if duplicate_factor > 1.0 {
            writer.float_element("DuplicationFactor", duplicate_factor)?;
        }

        writer.start("CalibrationHelp")?;
        writer.float_element("PixelToUnit", self.calibration.pixel_to_unit)?;
        writer.start_with_attr(
            "LengthUnit",
            "UserUnitLength",
            &self.calibration.length_unit_abbreviation,
        )?;
        writer.text(&self.calibration.length_unit)?;
        writer.end("LengthUnit")?;
        writer.point_element("CoordinatesOrigin", self.calibration.coordinates_origin)?;
        writer.end("CalibrationHelp")?;

        let active: Vec<_> = self.keyframes.iter().filter(|k| !k.disabled).collect();
        if !active.is_empty() {
            writer.start("Keyframes")?;
            for keyframe in active {
                writer.start("Keyframe")?;
                keyframe.write_kva(writer)?;
                writer.end("Keyframe")?;
            }
            writer.end("Keyframes")?;
        }

        let chronos: Vec<_> = self
            .extra_drawings
            .iter()
            .filter_map(ExtraDrawing::as_chrono)
            .collect();
        if !chronos.is_empty() {
            writer.start("Chronos")?;
            for chrono in chronos {
                writer.start("Chrono")?;
                chrono.write_kva(writer)?;
                writer.end("Chrono")?;
            }
            writer.end("Chronos")?;
        }

        let tracks: Vec<_> = self
            .extra_drawings
            .iter()
            .filter_map(ExtraDrawing::as_track)
            .collect();
        if !tracks.is_empty() {
            writer.start("Tracks")?;
            for track in tracks {
                writer.start("Track")?;
                track.write_kva(writer)?;
                writer.end("Track")?;
            }
            writer.end("Tracks")?;
        }

        writer.end("KinoveaVideoAnalysis")
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::CrossMark;
    use crate::style::DrawingStyle;

    fn video_metadata() -> Metadata {
        let mut meta = Metadata::new();
        meta.image_size = Size::new(640, 480);
        meta.average_timestamps_per_frame = 40;
        meta.timestamps_per_second = 1000;
        meta.full_path = PathBuf::from("/videos/serve.mp4");
        meta
    }

    #[test]
    fn test_keyframes_stay_sorted_and_merge() {
        let mut meta = video_metadata();
        meta.add_keyframe(2000);
        meta.add_keyframe(500);
        meta.add_keyframe(1000);
        let positions: Vec<i64> = meta.keyframes().iter().map(|k| k.position).collect();
        assert_eq!(positions, vec![500, 1000, 2000]);

        // Adding at an existing position reuses the keyframe.
        assert_eq!(meta.add_keyframe(1000), 1);
        assert_eq!(meta.keyframes().len(), 3);
    }

    #[test]
    fn test_z_order() {
        let mut meta = video_metadata();
        meta.add_keyframe(100);
        meta.add_keyframe(200);
        meta.add_keyframe(300);

        assert_eq!(meta.keyframes_z_order(50), vec![0, 1, 2]);
        assert_eq!(meta.keyframes_z_order(100), vec![0, 1, 2]);
        assert_eq!(meta.keyframes_z_order(150), vec![1, 2, 0]);
        assert_eq!(meta.keyframes_z_order(250), vec![2, 1, 0]);
        assert_eq!(meta.keyframes_z_order(400), vec![2, 1, 0]);
    }

    #[test]
    fn test_remap_timestamp_across_videos() {
        let mut meta = video_metadata();
        meta.input_average_tpf = 10;
        meta.input_first_timestamp = 100;
        meta.input_selection_start = 100;
        meta.input_file_name = String::from("other");

        // Relative: 30 timestamps at 10 per frame is 3 frames, which is
        // 120 timestamps at 40 per frame.
        assert_eq!(meta.remap_timestamp(30, true), 120);
        // Absolute: offset from the input origin, then rebased.
        assert_eq!(meta.remap_timestamp(130, false), 120);
    }

    #[test]
    fn test_remap_is_identity_in_same_context() {
        let mut meta = video_metadata();
        meta.first_timestamp = 7;
        meta.input_average_tpf = 40;
        meta.input_first_timestamp = 7;
        meta.input_file_name = String::from("serve");
        assert_eq!(meta.remap_timestamp(1234, false), 1234);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut meta = video_metadata();
        meta.cleanup_hash();
        assert!(!meta.is_dirty());

        let index = meta.add_keyframe(1000);
        meta.keyframes_mut()[index].add_drawing(Box::new(CrossMark::new(
            Point::new(50, 50),
            1000,
            40,
            DrawingStyle::new(),
        )));
        assert!(meta.is_dirty());

        meta.cleanup_hash();
        assert!(!meta.is_dirty());
    }

    #[test]
    fn test_load_scales_and_remaps() {
        let xml = r#"<KinoveaVideoAnalysis>
            <FormatVersion>2.0</FormatVersion>
            <OriginalFilename>other</OriginalFilename>
            <ImageSize>320;240</ImageSize>
            <AverageTimeStampsPerFrame>10</AverageTimeStampsPerFrame>
            <FirstTimeStamp>0</FirstTimeStamp>
            <SelectionStart>0</SelectionStart>
            <Keyframes>
              <Keyframe>
                <Position UserTime="0:00.10">100</Position>
                <Title>Contact</Title>
                <Drawings>
                  <CrossMark>
                    <CenterPoint>60;40</CenterPoint>
                    <CoordinatesVisible>false</CoordinatesVisible>
                  </CrossMark>
                </Drawings>
              </Keyframe>
            </Keyframes>
        </KinoveaVideoAnalysis>"#;

        let mut meta = video_metadata();
        meta.load_from_str(xml).unwrap();

        assert_eq!(meta.keyframes().len(), 1);
        let keyframe = &meta.keyframes()[0];
        // 100 ts at 10 per frame is 10 frames, 400 ts in the new timebase.
        assert_eq!(keyframe.position, 400);
        assert_eq!(keyframe.title(), "Contact");
        assert_eq!(keyframe.drawings().len(), 1);
        assert!(meta.has_data());
    }

    #[test]
    fn test_load_merges_same_position() {
        let xml = r#"<KinoveaVideoAnalysis>
            <FormatVersion>2.0</FormatVersion>
            <ImageSize>640;480</ImageSize>
            <AverageTimeStampsPerFrame>40</AverageTimeStampsPerFrame>
            <Keyframes>
              <Keyframe><Position>100</Position></Keyframe>
            </Keyframes>
        </KinoveaVideoAnalysis>"#;

        let mut meta = video_metadata();
        meta.input_file_name = String::from("serve");
        meta.add_keyframe(100);
        meta.load_from_str(xml).unwrap();
        assert_eq!(meta.keyframes().len(), 1);
    }

    #[test]
    fn test_round_trip() {
        let mut meta = video_metadata();
        let index = meta.add_keyframe(1000);
        meta.keyframes_mut()[index].add_drawing(Box::new(CrossMark::new(
            Point::new(50, 60),
            1000,
            40,
            DrawingStyle::new(),
        )));
        meta.add_chrono(ChronoMark::new(
            Point::new(10, 10),
            500,
            40,
            DrawingStyle::new(),
        ));

        let xml = meta.to_xml_string(1.0).unwrap();
        assert!(xml.contains("<FormatVersion>2.0</FormatVersion>"));
        assert!(xml.contains("<CrossMark>"));
        assert!(xml.contains("<Chronos>"));

        let mut reread = Metadata::new();
        reread.image_size = Size::new(640, 480);
        reread.average_timestamps_per_frame = 40;
        reread.timestamps_per_second = 1000;
        reread.full_path = PathBuf::from("/videos/serve.mp4");
        reread.load_from_str(&xml).unwrap();

        assert_eq!(reread.keyframes().len(), 1);
        assert_eq!(reread.keyframes()[0].drawings().len(), 1);
        assert_eq!(reread.extra_drawings().len(), 1);
        assert!(reread.extra_drawings()[0].as_chrono().is_some());
    }

    #[test]
    fn test_too_old_format_is_rejected() {
        let xml = "<KinoveaVideoAnalysis><FormatVersion>1.1</FormatVersion></KinoveaVideoAnalysis>";
        let mut meta = video_metadata();
        assert!(matches!(
            meta.load_from_str(xml),
            Err(KvaError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_hit_routes_through_extra_drawings() {
        let mut meta = video_metadata();
        let mut track = Track::new(Point::new(100, 100), 0, 40, DrawingStyle::new());
        track.add_point(Point::new(120, 100), 40);
        track.add_point(Point::new(140, 100), 80);
        meta.add_track(track);

        let hit = meta.hit_extra_drawing(Point::new(120, 100), 40);
        assert!(hit.is_some());
        assert_eq!(meta.selected_extra_drawing(), Some(0));

        meta.unselect_all();
        assert_eq!(meta.selected_extra_drawing(), None);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut meta = video_metadata();
        meta.add_keyframe(100);
        meta.add_chrono(ChronoMark::new(
            Point::new(0, 0),
            0,
            40,
            DrawingStyle::new(),
        ));
        meta.global_title = String::from("Session 4");
        meta.reset();

        assert!(!meta.has_data());
        assert_eq!(meta.global_title, " ");
        assert!(!meta.is_dirty());
    }
}
