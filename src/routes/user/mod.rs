mod handler;
mod model;

pub use handler::{deactivate, login, register, update_password, update_profile};
