#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

#[macro_use]
extern crate tracing;

pub mod build_file;
pub mod collaborators;
pub mod config;
pub mod diskio;
pub mod error;
pub mod handle;
pub mod hash;
pub mod resolver;
pub mod runner;
pub mod status;
pub mod store;
pub mod uri;

pub use build_file::BuildFile;
pub use collaborators::{CTranslator, Diagnostics, LanguageTools, NullSink, ProgressSink};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use handle::Handle;
pub use hash::Hash;
pub use store::Store;
pub use uri::Uri;
