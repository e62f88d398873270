//! FasilBot: a Telegram assistant for field facilitators.
//!
//! Registers facilitators, lists their reports from a Google spreadsheet,
//! triggers a remote recap, and forwards everything else to a chat
//! completion model under a fixed persona.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;
pub mod providers;

pub mod persona;
pub mod recap;
pub mod store;

pub mod bot;
pub mod console;
pub mod telegram;
