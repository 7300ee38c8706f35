use gtk4::prelude::*;
use gtk4::{gio, Application};

use std::path::Path;
use std::rc::Rc;

use crate::ui::MainWindow;

const APP_ID: &str = "com.mosaic.MediaGallery";
const WINDOW_KEY: &str = "main-window";

pub struct MosaicApp {
    app: Application,
}

impl MosaicApp {
    pub fn new() -> Self {
        let app = Application::builder()
            .application_id(APP_ID)
            .flags(gio::ApplicationFlags::HANDLES_OPEN)
            .build();

        app.connect_activate(Self::on_activate);
        app.connect_open(Self::on_open);

        Self { app }
    }

    pub fn run(&self) -> i32 {
        self.app.run().into()
    }

    fn on_activate(app: &Application) {
        Self::show_window(app, None);
    }

    /// The first argument is taken as the media root; the rest are ignored.
    fn on_open(app: &Application, files: &[gio::File], _hint: &str) {
        let path = files.first().and_then(|f| f.path());
        if files.len() > 1 {
            tracing::info!("Opening only the first of {} paths", files.len());
        }
        Self::show_window(app, path.as_deref());
    }

    fn show_window(app: &Application, root: Option<&Path>) {
        // A second launch reuses the running window.
        let existing = unsafe {
            app.data::<Rc<MainWindow>>(WINDOW_KEY)
                .map(|ptr| ptr.as_ref().clone())
        };
        if let Some(window) = existing {
            if let Some(root) = root {
                window.load_library(root);
            }
            window.present();
            return;
        }

        let window = MainWindow::new(app, root);
        window.present();
        // Keep the window alive by storing it on the Application.
        unsafe {
            app.set_data(WINDOW_KEY, window);
        }
    }
}

impl Default for MosaicApp {
    fn default() -> Self {
        Self::new()
    }
}
