//! Presale assistant: ingests sales decks into an in-memory embedding index
//! and answers prompts grounded in the retrieved slides.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod testing;
