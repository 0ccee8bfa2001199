pub mod admin;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod render;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod transport;
pub mod views;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use context::AppContext;
pub use error::ApiError;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskpad CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  if let Some(url) = cli.api_url {
    cfg.apply_overrides([(
      "api.url".to_string(),
      url
    )]);
  }

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let api_url = cfg.api_url();
  let timeout = cfg.api_timeout()?;
  debug!(api_url = %api_url, ?timeout, "resolved api settings");

  let transport =
    transport::HttpTransport::new(
      &api_url, timeout
    )
    .context(
      "failed to set up HTTP client"
    )?;
  let tokens =
    storage::FileTokenStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open token store \
         at {}",
        data_dir.display()
      )
    })?;

  let mut ctx =
    AppContext::new(transport, tokens);
  ctx.session.restore()?;

  let mut renderer =
    render::Renderer::new(&cfg)?;

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async \
         runtime"
      )?;

  runtime.block_on(
    commands::dispatch(
      &mut ctx,
      &mut renderer,
      cli.command
    )
  )?;

  info!("done");
  Ok(())
}
