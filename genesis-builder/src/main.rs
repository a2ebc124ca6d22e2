use {clap::Parser, genesis_builder::Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    genesis_builder::run(Args::parse()).await
}
