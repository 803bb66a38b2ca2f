use std::sync::Arc;

use clap::Parser;

use tinymark::server::{router, ServerState};

#[derive(Parser)]
#[command(about = "Blind DCT watermark embedding server")]
struct Args {
  /// Address to listen on
  #[arg(long, default_value = "0.0.0.0:8750")]
  listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  env_logger::builder()
      .filter_level(log::LevelFilter::Info)
      .parse_env("TINYMARK_LOG")
      .init();

  let args = Args::parse();
  let state = Arc::new(ServerState::new());

  let listener = tokio::net::TcpListener::bind(&args.listen).await?;
  log::info!("listening on {}", args.listen);
  axum::serve(listener, router(state)).await?;

  Ok(())
}
