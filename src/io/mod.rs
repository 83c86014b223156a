// src/io/mod.rs

pub mod demand;
pub mod reporting;
