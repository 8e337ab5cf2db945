use artifact_synth::config::AppConfig;
use artifact_synth::run_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .parse_env("RUST_LOG")
        .init();

    println!("Artifact synthesizer: control-plane event to gateway artifact agent");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}, publisher={}, environments={}",
        config.server.host,
        config.server.port,
        config.publisher.base_url,
        config.control_plane.environments().join(",")
    );

    run_server(config).await?;

    Ok(())
}
