//! REST implementation of the grade collaborators.

mod client;
mod wire;

pub use client::RestGradeSource;
