#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use tally::{Mode, Tally};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Tally::load()?.run(Mode::Producer).await
}
