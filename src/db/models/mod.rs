//! Database models split into domain-specific modules.

pub mod course;
pub mod lesson;
pub mod payment;
pub mod purchase;
pub mod user;

pub use course::*;
pub use lesson::*;
pub use payment::*;
pub use purchase::*;
pub use user::*;
