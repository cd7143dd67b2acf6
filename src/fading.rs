//! Opacity-over-time for drawings anchored on a reference frame.
//!
//! Every drawing owns a `Fading` and delegates its opacity computation to it.
//! The factor decays linearly from 1.0 at the reference timestamp down to 0.0
//! at `fading_frames` frames away, in either direction.

use serde::{Deserialize, Serialize};

use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;

/// Default fade window, in frames.
pub const DEFAULT_FADING_FRAMES: u32 = 20;

/// The user-preference part of fading, shared by all drawings that opt into
/// the default profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadingProfile {
    pub enabled: bool,
    pub always_visible: bool,
    pub fading_frames: u32,
}

impl Default for FadingProfile {
    fn default() -> Self {
        Self {
            enabled: true,
            always_visible: false,
            fading_frames: DEFAULT_FADING_FRAMES,
        }
    }
}

/// Per-drawing fading state.
///
/// `use_default` drawings follow the snapshotted preference profile instead
/// of their own `always_visible`/`fading_frames` values. The snapshot is
/// refreshed whenever the owning metadata propagates new preferences.
#[derive(Debug, Clone, PartialEq)]
pub struct Fading {
    pub enabled: bool,
    pub use_default: bool,
    pub always_visible: bool,
    pub fading_frames: u32,
    pub reference_timestamp: i64,
    pub average_timestamps_per_frame: i64,
    pub master_factor: f64,
    default_profile: FadingProfile,
}

impl Fading {
    /// Fading for a new drawing anchored at the given timestamp, following
    /// the default profile.
    pub fn new(reference_timestamp: i64, average_timestamps_per_frame: i64) -> Self {
        Self::with_profile(
            reference_timestamp,
            average_timestamps_per_frame,
            FadingProfile::default(),
        )
    }

    pub fn with_profile(
        reference_timestamp: i64,
        average_timestamps_per_frame: i64,
        profile: FadingProfile,
    ) -> Self {
        Self {
            enabled: profile.enabled,
            use_default: true,
            always_visible: profile.always_visible,
            fading_frames: profile.fading_frames.max(1),
            reference_timestamp,
            average_timestamps_per_frame,
            master_factor: 1.0,
            default_profile: profile,
        }
    }

    /// Refresh the snapshot of the preference profile.
    pub fn set_default_profile(&mut self, profile: FadingProfile) {
        self.default_profile = profile;
    }

    /// Opacity factor at the given timestamp, in [0,1], scaled by the master
    /// factor.
    pub fn opacity_at(&self, timestamp: i64) -> f64 {
        let factor = if !self.enabled {
            // No fading: visible only on the exact reference frame.
            if timestamp == self.reference_timestamp {
                1.0
            } else {
                0.0
            }
        } else if self.use_default {
            if self.default_profile.always_visible {
                1.0
            } else {
                self.decay(timestamp, self.default_profile.fading_frames)
            }
        } else if self.always_visible {
            1.0
        } else {
            self.decay(timestamp, self.fading_frames)
        };

        factor * self.master_factor.clamp(0.0, 1.0)
    }

    /// Whether a point anchored at `reference` is visible at all at `test`,
    /// within a window of `visible_frames`.
    pub fn is_visible(&self, reference: i64, test: i64, visible_frames: u32) -> bool {
        self.decay_from(reference, test, visible_frames) > 0.0
    }

    fn decay(&self, timestamp: i64, frames: u32) -> f64 {
        self.decay_from(self.reference_timestamp, timestamp, frames)
    }

    fn decay_from(&self, reference: i64, test: i64, frames: u32) -> f64 {
        let distance = (test - reference).abs();
        let window = frames as i64 * self.average_timestamps_per_frame;

        if window <= 0 {
            // Degenerate timebase: visible only at the reference itself.
            return if distance == 0 { 1.0 } else { 0.0 };
        }

        if distance >= window {
            0.0
        } else {
            1.0 - distance as f64 / window as f64
        }
    }

    /// Reads the `<InfosFading>` block. Missing children keep their current
    /// values; `fading_frames` is clamped to at least one frame.
    pub fn read_kva(&mut self, node: &XmlNode) {
        let mut handled: Vec<&str> = Vec::new();
        if let Some(text) = node.child_text("Enabled") {
            self.enabled = xml::parse_bool(text);
            handled.push("Enabled");
        }
        if let Some(text) = node.child_text("Frames") {
            self.fading_frames = text.trim().parse::<u32>().unwrap_or(self.fading_frames).max(1);
            handled.push("Frames");
        }
        if let Some(text) = node.child_text("AlwaysVisible") {
            self.always_visible = xml::parse_bool(text);
            handled.push("AlwaysVisible");
        }
        if let Some(text) = node.child_text("UseDefault") {
            self.use_default = xml::parse_bool(text);
            handled.push("UseDefault");
        }
        node.warn_unparsed(&handled);
    }

    pub fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.start("InfosFading")?;
        writer.bool_element("Enabled", self.enabled)?;
        writer.int_element("Frames", self.fading_frames as i64)?;
        writer.bool_element("AlwaysVisible", self.always_visible)?;
        writer.bool_element("UseDefault", self.use_default)?;
        writer.end("InfosFading")
    }
}

impl Default for Fading {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(frames: u32, avg: i64) -> Fading {
        let mut f = Fading::new(1000, avg);
        f.use_default = false;
        f.fading_frames = frames;
        f
    }

    #[test]
    fn test_full_opacity_at_reference() {
        let f = custom(20, 10);
        assert_eq!(f.opacity_at(1000), 1.0);
    }

    #[test]
    fn test_zero_beyond_window() {
        let f = custom(20, 10);
        // Window is 200 timestamp units.
        assert_eq!(f.opacity_at(1200), 0.0);
        assert_eq!(f.opacity_at(800), 0.0);
        assert_eq!(f.opacity_at(5000), 0.0);
    }

    #[test]
    fn test_linear_decay_within_window() {
        let f = custom(20, 10);
        let half = f.opacity_at(1100);
        assert!((half - 0.5).abs() < 1e-9);
        assert!(f.opacity_at(1050) > half);
    }

    #[test]
    fn test_factor_always_in_unit_range() {
        let f = custom(20, 10);
        for ts in (0..3000).step_by(17) {
            let v = f.opacity_at(ts);
            assert!((0.0..=1.0).contains(&v), "out of range at {}: {}", ts, v);
        }
    }

    #[test]
    fn test_disabled_visible_only_at_reference() {
        let mut f = custom(20, 10);
        f.enabled = false;
        assert_eq!(f.opacity_at(1000), 1.0);
        assert_eq!(f.opacity_at(1001), 0.0);
    }

    #[test]
    fn test_always_visible() {
        let mut f = custom(20, 10);
        f.always_visible = true;
        assert_eq!(f.opacity_at(987654), 1.0);
    }

    #[test]
    fn test_master_factor_scales() {
        let mut f = custom(20, 10);
        f.always_visible = true;
        f.master_factor = 0.25;
        assert_eq!(f.opacity_at(1000), 0.25);
    }

    #[test]
    fn test_default_profile_always_visible() {
        let profile = FadingProfile {
            enabled: true,
            always_visible: true,
            fading_frames: 5,
        };
        let f = Fading::with_profile(0, 10, profile);
        assert!(f.use_default);
        assert_eq!(f.opacity_at(100_000), 1.0);
    }

    #[test]
    fn test_degenerate_timebase() {
        let f = custom(20, 0);
        assert_eq!(f.opacity_at(1000), 1.0);
        assert_eq!(f.opacity_at(1001), 0.0);
    }

    #[test]
    fn test_kva_round_trip() {
        let mut f = custom(35, 10);
        f.use_default = false;
        f.always_visible = true;

        let mut writer = KvaWriter::new();
        f.write_kva(&mut writer).unwrap();
        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();

        let mut read = Fading::new(1000, 10);
        read.read_kva(&node);
        assert!(read.enabled);
        assert!(!read.use_default);
        assert!(read.always_visible);
        assert_eq!(read.fading_frames, 35);
    }

    #[test]
    fn test_kva_read_clamps_frames() {
        let node = XmlNode::parse(
            "<InfosFading><Enabled>true</Enabled><Frames>0</Frames></InfosFading>",
        )
        .unwrap();
        let mut f = Fading::new(0, 10);
        f.read_kva(&node);
        assert_eq!(f.fading_frames, 1);
    }
}
