//! Domain models

pub mod book;
pub mod borrowing;
pub mod payment;
pub mod user;

pub use book::{Book, CoverType};
pub use borrowing::Borrowing;
pub use payment::{Payment, PaymentStatus, PaymentType};
pub use user::{User, UserClaims};
