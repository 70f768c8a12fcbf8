use crate::CLAP_STYLING;
use crate::handlers::parse_target_url;
use clap::arg;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("web2md")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("web2md")
        .about(
            "Crawl a documentation site from a target page and mirror every in-scope page \
            as Markdown. The scope is the parent directory of the target URL.",
        )
        .styles(CLAP_STYLING)
        .arg(
            arg!(<URL>)
                .required(true)
                .help("The page to start from (http or https)")
                .value_parser(parse_target_url),
        )
        .arg(
            arg!([OUTPUT_DIR])
                .required(false)
                .help("Where to write the Markdown files (default: derived from host and path)"),
        )
        .arg(
            arg!(-d --"depth" <DEPTH>)
                .required(false)
                .help("Maximum path depth below the scope root")
                .value_parser(clap::value_parser!(usize))
                .default_value("5"),
        )
        .arg(
            arg!(-c --"count" <COUNT>)
                .required(false)
                .help("Maximum number of pages to save, 0 for no limit")
                .value_parser(clap::value_parser!(usize))
                .default_value("999"),
        )
        .arg(
            arg!(--"picture")
                .required(false)
                .help("Download images next to the pages that use them")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"video")
                .required(false)
                .help("Download videos next to the pages that use them")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-w --"workers" <NUM_WORKERS>)
                .required(false)
                .help("The number of async workers in the pool. 1 keeps a depth-first order.")
                .value_parser(clap::builder::RangedU64ValueParser::<usize>::new().range(1..))
                .default_value("1"),
        )
        .arg(
            arg!(-e --"exclude" <PATTERN>)
                .required(false)
                .help("Extra case-insensitive regex of URLs to skip (repeatable)")
                .action(clap::ArgAction::Append),
        )
        .arg(
            arg!(-r --"renderer" <RENDERER>)
                .required(false)
                .help("How pages are fetched: plain http, or a headless browser")
                .value_parser(["http", "browser"])
                .default_value("http"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Per-page render timeout in seconds")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("60"),
        )
        .arg(
            arg!(--"media-timeout" <SECONDS>)
                .required(false)
                .help("Per-file media download timeout in seconds")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("30"),
        )
        .arg(
            arg!(--"settle" <SECONDS>)
                .required(false)
                .help("Seconds to wait after navigation before reading the page (browser only)")
                .value_parser(clap::value_parser!(u64))
                .default_value("2"),
        )
        .arg(
            arg!(--"strict-tls")
                .required(false)
                .help("Reject invalid TLS certificates (accepted by default)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Report format: text, json")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug)")
                .required(false)
                .action(clap::ArgAction::Count),
        )
}
