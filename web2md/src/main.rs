use colored::Colorize;
use web2md::handlers::{init_tracing, show_banner};
use web2md::{command_argument_builder, handle_crawl};
use web2md_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let matches = cmd.get_matches();

    init_tracing(matches.get_count("verbose"));

    if show_banner(&matches) {
        print_banner();
    }

    if let Err(e) = handle_crawl(&matches).await {
        eprintln!("{} Crawl failed: {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
