// src/main.rs

use litani::{cli, logging};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(&args) {
        eprintln!("litani error: {err:?}");
        std::process::exit(1);
    }

    match litani::run(args).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("litani error: {err:?}");
            std::process::exit(1);
        }
    }
}
