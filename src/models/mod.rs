pub mod media_item;
pub mod media_library;
pub mod settings_store;

pub use media_item::*;
pub use media_library::*;
pub use settings_store::*;
