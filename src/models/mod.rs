//! Data models for the clan registry.

mod clan;
mod command;
mod event;
mod id;

pub use clan::*;
pub use command::*;
pub use event::*;
pub use id::*;
