pub mod keys;
pub mod suite;
