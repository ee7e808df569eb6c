//! # loadwise-core
//!
//! The core of a load order optimisation engine for Bethesda-family game
//! plugins. Given the set of installed plugins and two layers of
//! declarative metadata (a community masterlist and a per-user userlist),
//! it derives a total load order that satisfies every hard constraint,
//! honours the soft preferences that are consistent with them, and is
//! identical across runs for identical inputs.
//!
//! The embedding application supplies plugin introspection
//! ([`PluginInterface`](plugin::PluginInterface)) and load order access
//! ([`LoadOrderHandler`](game::LoadOrderHandler)), builds a
//! [`Game`](game::Game), fills its cache and metadata
//! [`Database`](database::Database), and then calls
//! [`PluginSorter::sort()`](sorting::PluginSorter::sort).

pub mod conditions;
pub mod database;
pub mod error;
pub mod game;
pub mod metadata;
pub mod plugin;
pub mod sorting;
pub mod version;

mod helpers;

pub use error::{EdgeType, Error, Result, Vertex};
pub use sorting::PluginSorter;
