use bucket_publish::{apply_storage_profile, load_config::load_config, run, Cli};
use clap::Parser;

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    println!("Publish starting...");
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] Publish failed: {}", e);
            std::process::exit(1);
        }
    };

    // Environment mutation happens here, before the runtime spawns threads.
    apply_storage_profile(&config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("[ERROR] Publish failed: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(config, cli.mapping_file)) {
        Ok(report) => {
            println!("Publish complete.\nReport:");
            println!("{:#?}", report);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("[ERROR] Publish failed: {}", e);
            std::process::exit(1);
        }
    }
}
