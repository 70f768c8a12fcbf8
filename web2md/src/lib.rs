pub mod commands;
pub mod handlers;

pub use commands::command_argument_builder;
pub use handlers::{build_crawl_options, handle_crawl, parse_target_url, resolve_output_dir};

// Re-export crawl functionality from web2md-core
pub use web2md_core::crawl::{CrawlOptions, derive_output_dir, execute_crawl, extract_url_path};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
