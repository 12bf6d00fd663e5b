//! Prefixed views and typed accessors for Stratum.
//!
//! A [`View`] maps a logical key space onto one or more physical key
//! prefixes of an [`Area`](stratum_area::Area), which lets independent
//! stores share one area and lets data migrate between prefixes.
//!
//! On top of views sit two typed accessors:
//!
//! - [`Typed`] -- a collection of values under generated keys; entries that
//!   fail to parse are logged and skipped
//! - [`Value`] -- a single value under a fixed key; a value that fails to
//!   parse is an error

pub mod typed;
pub mod value;
pub mod view;

pub use typed::Typed;
pub use value::{Value, VALUE_KEY};
pub use view::{delete_view_prefixes, View, PREFIX_SEPARATOR};
