//! # Cinder language model
//!
//! Types shared by every pass: the arena syntax tree ([`ast`]), the static
//! types of values ([`data_type`]) and the lexical scope graph ([`scope`]).

pub mod ast;
pub mod data_type;
pub mod scope;
