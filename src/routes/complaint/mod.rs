mod handler;
mod model;

pub use handler::{
    change_status, create_complaint, delete_complaint, list_complaints, update_complaint,
};
