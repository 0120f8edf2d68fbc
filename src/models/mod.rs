// src/models/mod.rs

pub mod catalog;
pub mod question;
pub mod report;
