pub mod assertion;
pub mod message;
pub mod negotiation;
pub mod state;
pub mod transcript;
