//! Utility modules.

pub mod converter;
pub mod prompts;
pub mod string_utils;
