use colored::Colorize;

pub mod crawl;
pub mod report;

pub use crawl::{
    CrawlOptions, CrawlProgressCallback, CrawlResultCallback, RendererKind, derive_output_dir,
    execute_crawl, extract_url_path,
};
pub use report::{ReportFormat, generate_json_report, generate_text_report};

const BANNER: &str = r#"
                 _      ____               _
 __      __ ___ | |__  |___ \  _ __ ___   __| |
 \ \ /\ / // _ \| '_ \   __) || '_ ` _ \ / _` |
  \ V  V /|  __/| |_) | / __/ | | | | | || (_| |
   \_/\_/  \___||_.__/ |_____||_| |_| |_| \__,_|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "mirror documentation sites as Markdown".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
