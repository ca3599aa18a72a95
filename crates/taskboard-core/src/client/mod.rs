//! Client side: one replica per connected session.

mod store;

pub use store::{ClientStore, Created};
