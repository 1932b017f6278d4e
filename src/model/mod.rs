pub mod event;
pub mod group;
pub mod settings;
pub mod store;
pub mod task;

pub use event::*;
pub use group::*;
pub use settings::*;
pub use store::*;
pub use task::*;
