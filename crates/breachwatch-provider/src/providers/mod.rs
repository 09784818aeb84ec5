//! Built-in breach provider implementations.

pub mod common;
pub mod dehashed;
pub mod haveibeenpwned;

pub use dehashed::{DehashedProvider, DehashedQuery};
pub use haveibeenpwned::{HibpClient, HibpProvider};
