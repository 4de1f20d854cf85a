use crate::{config::Config, error, logging, server};

pub async fn serve(addr: Option<String>) {
    logging::init();

    let mut config = Config::from_env();
    if let Some(addr) = addr {
        config.server_addr = addr;
    }

    if let Err(e) = server::start_api_server(config).await {
        error!("Server stopped. Err: {}", e);
    }
}
