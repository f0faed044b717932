//! Tracing layer that turns log events into Discord webhook embeds.
//!
//! Events pass through four stages: [`fields`] builds the bounded field
//! list, [`embed`] styles it per level, [`payload`] wraps the embeds into the
//! webhook body and [`handler`] delivers it, best effort. [`layer`] feeds
//! the pipeline from `tracing` and [`init`] wires everything up.

pub mod level;
pub mod record;
pub mod context;
pub mod env;
pub mod config;
pub mod fields;
pub mod embed;
pub mod payload;
pub mod sink;
pub mod handler;
pub mod layer;
pub mod status;

#[cfg(feature = "webhook")]
pub mod webhook;

pub mod init;
pub mod noop_sink;
