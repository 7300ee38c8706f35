pub mod breakpoints;
pub mod columns;
pub mod lazy_load;
pub mod layout_cache;

pub use breakpoints::Breakpoint;
pub use columns::{distribute, ColumnLayout};
pub use lazy_load::LazyLoadController;
pub use layout_cache::LayoutCache;
