//! dotai asset resolution engine
//!
//! Layered storage of agents, roles, contexts and tasks across a global and a
//! local scope, catalog search, ambiguity-aware name resolution, interactive
//! selection parsing and the install decision engine.

pub mod catalog;
pub mod category;
pub mod config;
pub mod entry;
pub mod error;
pub mod install;
pub mod manage;
pub mod prompt;
pub mod resolve;
pub mod search;
pub mod selection;
pub mod store;

pub use category::{Category, ConfigScope};
pub use error::{AssetError, Result};
