pub mod amount;
pub mod cart;
pub mod catalog;
