//! Cards - sync markdown flashcards to Mochi
//!
//! This crate provides the core functionality for the `cards` CLI tool.
//! Every markdown document below the configured folder is one flashcard;
//! documents with a reverse prompt also produce a backward card.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Base directory, `config.toml` and credentials
//! - [`markdown`] - Card AST, parsing, rendering and orientation
//! - [`document`] - Documents on disk and their remote ids
//! - [`attachments`] - Local images gathered into card attachments
//! - [`mochi`] - Remote card service and its HTTP client
//! - [`sync`] - Diffing and applying documents against a deck
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attachments;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod markdown;
pub mod mochi;
pub mod sync;

pub use error::{Error, Result};
