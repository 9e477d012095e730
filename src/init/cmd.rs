use anyhow::Result;

use crate::cmd::Args;
use crate::init::logger;

pub fn init() -> Result<Args> {
    logger::init("info", false)?;
    let args = Args::parse()?;
    log::debug!("{args:?}");
    Ok(args)
}
