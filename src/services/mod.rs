//! Services module - pure transforms from storage records to display data.
//!
//! # Components
//!
//! - [`ViewItemProjector`]: turns an [`Entry`](crate::models::Entry) and its
//!   optional [`Configuration`](crate::models::Configuration) into a
//!   [`ViewItem`](crate::models::ViewItem). Deterministic; display data never
//!   makes it fail.
//! - [`TextTransform`]: the display-string collaborator the projector escapes
//!   and converts text through. [`MarkupTransform`] is the default, converting
//!   BBCode descriptions into validated Pango-style markup.
//!
//! Neither component knows about storage, stores or rows, which keeps them
//! testable in isolation.

pub mod markup;
pub mod projector;

pub use markup::{MarkupError, MarkupTransform, TextTransform};
pub use projector::ViewItemProjector;
