use anyhow::Result;
use clap::Parser;
use etcd_bootstrap_cli::{init_logging, run, Args};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Args = Args::parse();
    init_logging(args.debug);

    run(args).await
}
