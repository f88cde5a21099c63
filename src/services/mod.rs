pub mod accounts;
pub mod basket;
pub mod catalog;
pub mod import;
pub mod orders;
