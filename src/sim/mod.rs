pub mod catalog;
pub mod engine;
pub mod event;
pub mod session;
pub mod timer;
