// src/main.rs

use taskswarm::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        // The run finished, but at least one subtask failed.
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("taskswarm error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
