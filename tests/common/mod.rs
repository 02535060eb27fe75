#![allow(dead_code)]

#[macro_use]
mod macros;
mod scripted;

pub use scripted::{ScriptedSource, ScriptedSubscription, log_at};
