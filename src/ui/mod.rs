pub mod app;
pub mod draw;
pub mod focus;
pub mod form;
pub mod keys;
