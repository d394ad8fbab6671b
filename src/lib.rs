//! Imports recipes from ICA and Mathem into a Mealie instance.
//!
//! A [`sources::Source`] turns a recipe URL or id into a [`model::Recipe`],
//! the [`publisher::Publisher`] creates it in Mealie, and progress is
//! streamed to the caller through [`progress`].

pub mod config;
pub mod error;
pub mod importer;
pub mod mealie;
pub mod model;
pub mod progress;
pub mod publisher;
pub mod server;
pub mod sources;

pub use config::ImporterConfig;
pub use error::ImportError;
pub use importer::Importer;
pub use model::Recipe;
pub use progress::{ProgressEvent, ProgressSink};
pub use sources::Source;
