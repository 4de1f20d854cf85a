use crate::{config, info, warning};

/// Opens the running server's login page in the default browser.
pub fn login() {
    let url = format!("http://{}/login", config::server_addr());

    info!("Opening {} ...", url);
    if webbrowser::open(&url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            url
        )
    }
}
