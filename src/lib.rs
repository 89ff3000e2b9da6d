//! cellcmd - a script-command dispatcher with grid-program serialization.
//!
//! Raw command text is unescaped, classified into one of a fixed set of
//! shapes, bound to positional arguments and routed to a SQL executor, an
//! expression evaluator or a grid runner. Results are normalised before they
//! leave the dispatcher. Grid programs serialize back to the same command
//! text the classifier consumes.

pub mod command;
pub mod config;
pub mod db;
pub mod error;
pub mod exec;
pub mod grid;
pub mod logging;
pub mod value;
