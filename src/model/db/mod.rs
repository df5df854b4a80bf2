//! Database representations of the core domain entities.

pub mod admin;
pub mod club;
pub mod member;
pub mod nomination;
pub mod notification;
pub mod position;
pub mod vote;
pub mod voting_event;
pub mod winner;
