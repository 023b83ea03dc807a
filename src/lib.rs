//! Private notes overlaid on a real-estate listings site.
//!
//! The engine is written against the [`page::Page`] and [`store::NoteStore`]
//! seams so it runs on the host under test; the `web` module binds those
//! seams to the browser and is only built for `wasm32`.

pub mod action;
pub mod annotator;
pub mod config;
pub mod coordinator;
pub mod detail_panel;
pub mod error;
pub mod export;
pub mod mirror;
pub mod modal;
pub mod page;
pub mod resolver;
pub mod selector;
pub mod store;

#[cfg(target_arch = "wasm32")]
mod web;

pub use config::Config;
pub use coordinator::{Coordinator, Effect, Pass};
pub use error::{Error, Result};
pub use resolver::ListingId;
