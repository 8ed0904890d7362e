use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    focus_guard_lib::run(focus_guard_lib::cli::Args::parse()).await
}
