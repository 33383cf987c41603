//! # IO Module
//!
//! Everything that crosses the process boundary: the REST API in [`rest`] and
//! the hosted language model client in [`llm`].

pub mod llm;
pub mod rest;
