// src/models/mod.rs

pub mod admin;
pub mod answers;
pub mod progress;
pub mod question;
pub mod result;
pub mod user;
