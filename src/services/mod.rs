// src/services/mod.rs

pub mod analytics;
pub mod quiz;
pub mod scoring;
pub mod selection;
