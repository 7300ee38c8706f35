mod app;
mod config;
mod image_loader;
mod layout;
mod models;
mod state;
mod ui;

use app::MosaicApp;

fn main() {
    // Prefer C numeric locale up-front; GTK may later adjust locale again.
    std::env::set_var("LC_NUMERIC", "C");
    unsafe {
        libc::setlocale(libc::LC_NUMERIC, b"C\0".as_ptr().cast());
    }

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    match "mosaic=info".parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(err) => eprintln!("Invalid log directive: {err}"),
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = MosaicApp::new();
    std::process::exit(app.run());
}
