pub mod cli;
pub mod config;
pub mod draft;
pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod placeholder;
pub mod render;
pub mod storage;
pub mod substitution;

pub use draft::{DraftSession, DraftStep, Selection};
pub use error::{MinutaError, Result};
pub use lifecycle::{FinalStatus, Lifecycle, SaveTarget};
pub use render::{DocumentRenderer, RenderOptions, Renderer};
pub use storage::{FsBlobStore, Project, SqliteStore};
pub use substitution::substitute;
