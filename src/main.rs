use anyhow::Result;
use showreel::config::ViewerConfig;

mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = ViewerConfig::from_env();
    log::info!("Starting with {:?}", config);

    window::run(config)?;

    Ok(())
}
