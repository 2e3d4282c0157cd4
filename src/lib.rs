//! llm-phraser turns negotiation decisions into short persuasive sentences.
//!
//! An upstream strategy engine decides what to say (a decision key and an
//! optional price). This crate decides how to say it: it picks one of the
//! catalog's sanctioned templates for the key, fills in the price, and asks
//! an LLM to phrase it without ever disclosing internal pricing limits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod providers;

pub mod catalog;
pub mod guardrail;
pub mod prompt;
pub mod render;

pub mod health;
pub mod server;
pub mod service;
