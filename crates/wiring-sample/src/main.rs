//! # Wiring Sample
//!
//! ```bash
//! # Start the wiki services and keep them running until Ctrl-C
//! cargo run -p wiring-sample -- --config crates/wiring-sample/config.yaml run
//!
//! # One-shot commands build only what they need
//! cargo run -p wiring-sample -- --config crates/wiring-sample/config.yaml pages
//! cargo run -p wiring-sample -- --config crates/wiring-sample/config.yaml thumb welcome
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use wiring::{App, Declaration, Env};
use wiring_sample::lifecycle;
use wiring_sample::model::{WikiConfig, WikiError};
use wiring_sample::pages::PageStore;
use wiring_sample::thumbs::ThumbnailCache;

#[derive(Debug, Parser)]
#[command(name = "wiring-sample", about = "Markdown wiki wired by a dependency container")]
struct Cli {
    /// YAML or JSON config file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every service until a stop signal arrives.
    Run,
    /// List the pages in the store.
    Pages,
    /// Print the thumbnail of one page.
    Thumb { page: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let app = App::new()
        .config_file(cli.config)
        .config::<WikiConfig>()
        .modules(lifecycle::modules());

    let exit = match cli.command {
        Command::Run => app.run().await,
        Command::Pages => {
            app.invoke(Declaration::task(|pages: Arc<PageStore>, env: Arc<Env>| {
                println!("pages in [{}]:", env.0);
                for name in pages.names() {
                    println!("  {name}");
                }
            }))
            .await
        }
        Command::Thumb { page } => {
            app.invoke(Declaration::fallible_task(
                move |cache: Arc<ThumbnailCache>| -> Result<(), WikiError> {
                    let thumb = cache.thumbnail(&page)?;
                    println!("{}\n{}", thumb.title, thumb.excerpt);
                    Ok(())
                },
            ))
            .await
        }
    };
    exit.into()
}
