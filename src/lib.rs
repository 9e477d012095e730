use anyhow::Result;

pub mod admission;
pub mod cache;
pub mod cmd;
pub mod codec;
pub mod error;
mod init;
pub mod limits;
pub mod response;
mod start;
pub mod upstream;
pub mod util;
pub mod worker;

pub async fn run() -> Result<()> {
    let shutdown = init::shutdown::init()?;
    let args = init::cmd::init()?;

    log::info!("Starting cache proxy on port {}", args.port);
    log::info!("Supported methods: GET, POST, PUT, PATCH, DELETE");

    start::serve(args.port, &shutdown).await?;
    log::info!("Shutdown complete.");
    Ok(())
}
