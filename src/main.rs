use sonicue::config::EngineConfig;
use sonicue::runtime::native;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Optional JSON config path as the only argument
    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    if let Err(e) = native::start(config) {
        eprintln!("Error starting sound engine: {}", e);
        std::process::exit(1);
    }
}
