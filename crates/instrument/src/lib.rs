//! Instruments: a data source plus its file inventory, iterated window by
//! window within user-set bounds.
//!
//! # Bounds
//!
//! A [`BoundsRequest`] names start/stop pairs by date or by filename,
//! optionally with a step and a window width. Resolving it against an
//! [`Inventory`](file_inventory::Inventory) gives [`Bounds`]: the ordered
//! list of [`Window`]s that [`Instrument::next`] and [`Instrument::prev`]
//! walk through.
//!
//! ```text
//! starts ─┐            ┌─ Window 0 ─┐┌─ Window 1 ─┐ ...
//!         ├─ resolve ─▶│            ││            │
//! stops  ─┘            └────────────┘└────────────┘
//! ```
//!
//! Running off either end of the sequence returns
//! [`InstrumentError::Stop`], which [`Instrument::iter`] treats as the
//! end of iteration.

pub mod bounds;
pub mod error;
pub mod instrument;
pub mod source;

pub use bounds::{Bounds, BoundsKind, BoundsRequest, Stride, Window};
pub use error::{InstrumentError, Result, StopReason};
pub use instrument::{Instrument, Loaded, Windows};
pub use source::{FileEcho, InstrumentSource, LoadRequest};
