//! links-client: a Rust client for the clink (link-cli) Links Theory database.
//!
//! Every operation runs the external `clink` binary once with a Links
//! Notation query and parses what it prints. Durability, indexing and query
//! execution all live in clink; this crate formats, invokes and parses.
//!
//! # Example
//!
//! ```no_run
//! use links_client::{Flow, LinkDbService, Links};
//!
//! let db = LinkDbService::new("data/linkdb.links");
//! let link = db.create_link(100, 200).unwrap();
//! db.update_link(link.id, 100, 500).unwrap();
//! assert_eq!(db.read_link(link.id).unwrap().unwrap().target, 500);
//!
//! // Flat API over restriction tuples
//! let links = Links::new("data/linkdb.links");
//! let id = links.create(&[1, 2], None).unwrap();
//! assert_eq!(links.count(Some(&[id])).unwrap(), 1);
//! links.each(None, |l| {
//!     println!("{}", l);
//!     Flow::Continue
//! }).unwrap();
//! ```

mod error;
mod id;
mod storage;
mod types;

pub mod auth;
pub mod config;
pub mod link_db;
pub mod links;
pub mod menu;
pub mod parser;
pub mod process;
pub mod query;

// Re-export public API
pub use auth::{AuthStatistics, AuthStorageService, Password, PasswordFields, Token, TokenFields, User, UserFields};
pub use config::LinksConfig;
pub use error::LinksError;
pub use link_db::LinkDbService;
pub use links::Links;
pub use menu::{MenuEntry, MenuItem, MenuStatistics, MenuStorageService};
pub use process::{Capability, Clink, Executor};
pub use query::QueryFlags;
pub use types::{ANY, Change, ChangeHandler, Flow, Link, Restriction, Substitution, ValidationError};
