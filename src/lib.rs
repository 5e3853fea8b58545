pub mod albums;
pub mod audiotags;
pub mod common;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod filter_parser;
pub mod filters;
pub mod groups;
pub mod logging;
pub mod miner;
pub mod performers;
pub mod persons;
pub mod resolver;
pub mod store;
pub mod tracks;

#[cfg(test)]
mod testing;

pub use albums::Album;
pub use audiotags::{Id3Reader, MetadataError, MetadataReader, RawTags};
pub use common::Inserted;
pub use config::{Config, LogOutput};
pub use crawler::{count_audio_files, crawl, Crawl, SkippedEntry};
pub use error::{Result, RolasError, RolasExpectedError, StorageError, StorageResult};
pub use extractor::{Extractor, TrackFields};
pub use filter_parser::FilterSyntaxError;
pub use filters::{Field, Filter, Op, Operand, Params, QueryTarget};
pub use groups::Group;
pub use miner::{mine, mine_configured, spawn_mining, MiningEvent, MiningHandle, MiningReport, MiningSession, MiningState, Progress};
pub use performers::{Performer, PerformerDefinition, PerformerKind};
pub use persons::Person;
pub use resolver::EntityResolver;
pub use store::Store;
pub use tracks::Track;

#[cfg(test)]
mod filter_parser_test;
#[cfg(test)]
mod filters_test;
#[cfg(test)]
mod groups_test;
#[cfg(test)]
mod tracks_test;
