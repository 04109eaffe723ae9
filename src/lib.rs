// Library root
// -----------
// This crate exposes the repository client as a library; the binary
// (`main.rs`) only wires it to the command line.
//
// Module responsibilities:
// - `api`: the client proper. Transport, session handling, searches,
//   uploads and package actions, each decoding its own responses.
// - `package`: normalized package records and the category table.
// - `error`: the typed failures every API call can return.
// - `config`: environment-driven settings, cookie jar and ignore list.
// - `ui`: terminal rendering and credential prompting.
// - `cli` / `commands`: argument definitions and per-command flows.
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod package;
pub mod ui;

pub use api::ApiClient;
pub use error::{AurError, Result};
pub use package::{Package, SortField};
