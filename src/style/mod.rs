//! Editable visual attributes for drawings.
//!
//! A [`DrawingStyle`] owns an ordered set of named [`StyleElement`] values and
//! a list of bindings that push those values into the concrete render
//! parameters of a [`StyleProperties`]. Editing a style element and calling
//! [`DrawingStyle::apply`] updates the rendered drawing; [`DrawingStyle::memorize`]
//! and [`DrawingStyle::revert`] give value-semantics undo for style edits.

mod element;
mod properties;

pub use element::{DrawingStyle, LineEnding, StyleElement, TrackShape};
pub use properties::{StyleProperties, StyleTarget};
