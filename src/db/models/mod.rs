//! Database models split into separate files.
//! This module re-exports individual model modules so imports like
//! `use crate::db::models::*;` pick up every row type.

pub mod friendship;
pub mod schedule;
pub mod shared_schedule;
pub mod user;

pub use self::friendship::*;
pub use self::schedule::*;
pub use self::shared_schedule::*;
pub use self::user::*;
