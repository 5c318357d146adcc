pub mod extract;
pub mod locations;
pub mod validate;
