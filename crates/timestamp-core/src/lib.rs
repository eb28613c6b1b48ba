pub mod commands;
pub mod control;
pub mod error;
pub mod handle;
pub mod host;
pub mod lifecycle;
pub mod locator;
pub mod markers;
pub mod registry;
pub mod seek;
pub mod settings;
pub mod timestamp;

#[cfg(test)]
mod testing;

pub use error::MediaError;
pub use locator::Locator;
