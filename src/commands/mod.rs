//! Command handling for typed queries.
//!
//! This module provides:
//! - Query parsing into commands
//! - Reply row types
//! - The router building reply rows per command

mod parser;
mod reply;
mod router;

pub use parser::{parse, Command, ParsedCommand};
pub use reply::{Action, ReplyItem, ReplyUpdate};
pub use router::CommandRouter;
