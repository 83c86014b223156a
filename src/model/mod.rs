// src/model/mod.rs

pub mod history;
pub mod item;
pub mod scenario;
