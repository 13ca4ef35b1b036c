#![doc = include_str!("../README.md")]

pub mod analyzer;
pub mod fields;
pub mod models;
pub mod people;
pub mod schema;
