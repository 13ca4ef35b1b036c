#![doc = include_str!("../README.md")]

pub mod config;
pub mod document;
pub mod fallback;
pub mod health;
pub mod image;
pub mod record;
