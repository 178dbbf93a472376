//! place-narrator — speaks a short anecdote about wherever you are standing.
//!
//! One trigger runs the whole pipeline: find the device position, resolve it
//! to the nearest street intersection, ask a chat model for a tour-guide
//! anecdote, synthesize it to speech, cache the clip on disk and play it.

pub mod cache;
pub mod config;
pub mod geocode;
pub mod location;
pub mod narrative;
pub mod pipeline;
pub mod playback;
pub mod speech;
