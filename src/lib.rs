//! Card canvas engine.
//!
//! Mirrors the host application's currently open documents as draggable,
//! resizable cards on a pannable, zoomable canvas. The engine is headless:
//! it owns the geometry and lifecycle of every card, while the host owns
//! the event loop, the painting, and the documents themselves.
//!
//! The host drives the engine through a small surface:
//!
//! * workspace change notifications feed a debounced [`reconcile`]
//!   cycle that diffs the live open-document set against the card state;
//! * pointer events feed the interaction controller, which turns them
//!   into drags, resizes, pans, and snap-connections;
//! * UI controls send [`Command`] values (zoom, sort, search, hide, …);
//! * the engine answers with card rectangles to paint and with
//!   [`HostRequest`] values naming actions only the host can perform
//!   (focus a document, close it, open a dropped file in the background).
//!
//! Everything that touches pointer coordinates goes through one exact
//! pair of transforms in [`geometry::Viewport`]; there is deliberately no
//! second place where screen and canvas coordinates meet, because drag
//! math that diverges from the visual transform desyncs silently at any
//! zoom other than 1.0.
//!
//! The separate [`export`] module produces a one-shot snapshot of the
//! open documents in the persisted diagram-file format; it shares nothing
//! with the live canvas except the document snapshot type.
//!
//! [`reconcile`]: canvas::Canvas::reconcile
//! [`Command`]: canvas::Command
//! [`HostRequest`]: canvas::HostRequest

#[macro_use]
extern crate tracing;

pub mod canvas;
pub mod clock;
pub mod export;
pub mod geometry;

pub use canvas::{
    Canvas, CanvasError, Card, Command, ContentRenderer, DocPath, HostRequest, OpenDocumentRef,
    Options, ViewDescriptor, ViewSessionState, WorkspaceEvent,
};
pub use clock::Clock;
