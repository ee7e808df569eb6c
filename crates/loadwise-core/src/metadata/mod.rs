//! The metadata model: the value types found in masterlists and
//! userlists, plugin records, and the in-memory catalogue they live in.

mod cleaning_data;
mod file;
mod group;
mod location;
mod message;
mod metadata_list;
mod plugin_metadata;
mod tag;

pub use cleaning_data::PluginCleaningData;
pub use file::File;
pub use group::{Group, DEFAULT_GROUP_NAME};
pub use location::Location;
pub use message::{Message, MessageType};
pub use metadata_list::MetadataList;
pub use plugin_metadata::PluginMetadata;
pub use tag::Tag;
