pub mod config;
/// Devtools host seam and plugin installation.
pub mod devtools;
pub mod error;
pub mod getters;
pub mod module;
pub mod path;
pub mod state;
pub mod store;
pub mod timeline;
pub mod tree;
