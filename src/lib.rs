//! Keyword-driven query composer.
//!
//! Free text typed into a single box is routed to an [`actions::Action`]
//! (filter, sort, search, view) by its leading keyword, completed into chips
//! and serialized to URL query parameters. [`omnibox::OmniBox`] drives the
//! interaction; the actions read columns, views and sample values through
//! the providers in [`schema`].

pub mod actions;
pub mod config;
pub mod errors;
pub mod filter_types;
pub mod memory;
pub mod omnibox;
pub mod schema;
pub mod tokenizer;

#[cfg(test)]
mod tests;

pub use actions::{build_query_string, parse_query_string, standard_actions, Action, ActionRef, ActionValue};
pub use config::Config;
pub use omnibox::{Event, OmniBox};
