use std::sync::Arc;

use metrotron::config::{load_config, print_schema};
use metrotron::startup::run;
use metrotron::utils::logger::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::args().skip(1).any(|arg| arg == "--schema") {
        print_schema();
        return Ok(());
    }

    let config = Arc::new(load_config());
    init_logging(&config.logging)?;
    run(config).await
}
