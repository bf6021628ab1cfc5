use std::path::PathBuf;

use clap::Parser;

/// Inventory file extensions under a directory against the supported list.
#[derive(Parser, Debug)]
#[command(name = "count-extensions", author, version, about)]
pub struct CountArgs {
    /// Directory to scan
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

/// Check that the media engine recognizes every target extension.
#[derive(Parser, Debug)]
#[command(name = "verify-extensions", author, version, about)]
pub struct VerifyArgs {}

pub fn parse_count() -> CountArgs {
    CountArgs::parse()
}

pub fn parse_verify() -> VerifyArgs {
    VerifyArgs::parse()
}
