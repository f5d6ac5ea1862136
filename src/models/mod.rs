//! Domain model module declarations.

pub mod delivery;
pub mod event;
pub mod message;
pub mod schedule;
pub mod user;
pub mod workspace;
