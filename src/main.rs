//! CLI entry point for visual complexity measurement

use clap::Parser;
use visual_complexity::io::cli::{Cli, FileProcessor};

fn main() -> visual_complexity::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let processor = FileProcessor::new(cli);
    processor.process()?;
    Ok(())
}
