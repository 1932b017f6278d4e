pub mod controller;
pub mod export;
pub mod todo_ops;
