pub mod reconcile;
pub mod scan;

use crate::Context;
use crate::cli::PlatformArgs;
use anyhow::{Context as _, Result};
use cfclient::{CfClient, ClientOptions};

/// Connect to the platform using the cf CLI session
pub fn connect(ctx: &Context, args: &PlatformArgs) -> Result<CfClient> {
    let options = ClientOptions {
        cf_home: ctx.config.cf_home(),
        skip_ssl_validation: args.skip_ssl_validation || ctx.config.cf.skip_ssl_validation,
    };
    let client = CfClient::connect(&options).context("Could not connect to Cloud Foundry")?;
    log::info!("connected to {}", client.target());
    Ok(client)
}
