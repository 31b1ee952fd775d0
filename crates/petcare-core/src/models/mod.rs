//! Domain models for the clinic booking core.

mod booking;
mod customer;
mod invoice;
pub mod labels;
mod page;
mod session;
mod staff;
mod vaccine;

pub use booking::*;
pub use customer::*;
pub use invoice::*;
pub use labels::{Language, StatusLabel};
pub use page::*;
pub use session::*;
pub use staff::*;
pub use vaccine::*;
