pub mod app;
pub mod login;
pub mod poll;
pub mod upload;
