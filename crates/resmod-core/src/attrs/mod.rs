//! Lazy, memoized attribute graphs.
//!
//! [`AttrStore`] is the per-instance cache; [`Attrs`] layers definitions
//! (required values and producers) on top of it.

mod lazy;
mod store;

pub use lazy::{Attrs, Definition, Producer, ProducerFn};
pub use store::{AttrStore, AttrValue};
