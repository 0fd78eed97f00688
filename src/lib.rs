//! vocabdeck: data layer for a vocabulary flashcard app.
//!
//! A local JSON record store (vocabulary, categories, learning sessions,
//! settings) behind a [`store::Store`] trait, a [`manager::StoreManager`]
//! that owns it, and an optional remote search index reached through
//! [`facade::VocabularyFacade`]. [`service::VocabService`] wires the two
//! together and answers [`service::Request`]s.

pub mod config;
pub mod envelope;
pub mod error;
pub mod facade;
pub mod logger;
pub mod manager;
pub mod remote;
pub mod service;
pub mod store;
