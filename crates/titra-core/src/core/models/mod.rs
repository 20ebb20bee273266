pub mod apparatus;
pub mod reading;
pub mod stage;
