use std::path::PathBuf;

use clap::{Args, Parser};
use glob::Pattern;

#[derive(Debug, Parser)]
#[command(name = "ro2", about = "Ragnarok Online 2 VDK archive and CT table tool")]
pub enum Cmds {
    /// Print archive header information
    Info(Info),
    /// List archive contents
    List(List),
    /// Extract files from an archive
    Extract(Extract),
    /// Create an archive from a directory
    Create(Create),
    /// Print a CT table as tab-separated text
    Show(Show),
    /// Verify a CT table checksum
    Check(Check),
}

#[derive(Debug, Args)]
pub struct Info {
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct List {
    /// Show sizes and compression state
    #[arg(short, long)]
    pub attributes: bool,

    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct Extract {
    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    pub file: PathBuf,

    /// Glob patterns selecting archive paths; everything when empty
    pub paths: Vec<Pattern>,
}

#[derive(Debug, Args)]
pub struct Create {
    /// Compress file payloads
    #[arg(short, long)]
    pub compress: bool,

    /// Output archive; defaults to the source directory plus `.vdk`
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    pub dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct Show {
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct Check {
    pub file: PathBuf,
}
