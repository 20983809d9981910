pub mod admin;
pub mod convert;
pub mod setup;
pub mod ui;
