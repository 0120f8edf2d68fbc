// src/handlers/mod.rs

pub mod admin;
pub mod catalog;
pub mod exam;
pub mod reports;
