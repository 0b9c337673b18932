pub mod alphabetic;
pub mod author_register;
pub mod authors;
pub mod config;
pub mod error;
pub mod lemma;
pub mod public_domain;
pub mod publish;
pub mod registers;
pub mod render;
pub mod runtime;
pub mod scanner;
pub mod short_register;
pub mod sort_key;
pub mod updater;
pub mod volume_register;
pub mod volumes;
pub mod wiki;
pub mod wikitext;

mod fsutil;
