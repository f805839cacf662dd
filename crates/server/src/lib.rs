//! Top 10 Albums: build a ranked list of your ten favourite albums and
//! publish it at a public link.

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod db;
pub mod directory;
pub mod draft;
pub mod error;
pub mod metrics_exporter;
pub mod publish;
pub mod supervisor;
pub mod toast;
pub mod validation;

pub mod test_helpers;
