pub mod config_io;
pub mod lock;
pub mod state_io;
pub mod ui_state;
