pub mod label;
pub mod refresher;
pub mod tree_controller;
pub mod tree_model;
pub mod view_state;
