// src/services/mod.rs

pub mod answer_key;
pub mod finalizer;
pub mod marking;
pub mod notifier;
pub mod progress;
