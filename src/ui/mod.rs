pub mod animation;
pub mod keybindings;
pub mod masonry_view;
pub mod media_tile;
pub mod menu_bar;
pub mod overlay_view;
pub mod window;

pub use window::MainWindow;
