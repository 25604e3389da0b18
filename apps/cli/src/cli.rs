//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "thunderdrive", version)]
#[command(about = "Search, download, upload and browse files on ThunderDrive", long_about = None)]
pub struct Cli {
    /// Phrase to search for and download (repeatable)
    #[arg(long = "search", value_name = "PHRASE")]
    pub search: Vec<String>,

    /// Search for and download every given phrase
    #[arg(long = "downloadmode", value_name = "PHRASE", num_args = 1..)]
    pub download_mode: Vec<String>,

    /// Print the search results (without --prompt nothing is downloaded)
    #[arg(long)]
    pub list: bool,

    /// Print the search results and wait for Enter before downloading
    #[arg(long)]
    pub prompt: bool,

    /// File to upload (repeatable)
    #[arg(long = "uploadfile", value_name = "PATH")]
    pub upload_file: Vec<PathBuf>,

    /// Upload every given path
    #[arg(long = "uploadmode", value_name = "PATH", num_args = 1..)]
    pub upload_mode: Vec<PathBuf>,

    /// Remote folder to upload into
    #[arg(long = "targetdir", visible_alias = "tdir", value_name = "NAME")]
    pub target_dir: Option<String>,

    /// Parent of the target folder when it has to be created
    #[arg(long = "parentdir", value_name = "NAME", default_value = "")]
    pub parent_dir: String,

    /// Create the target folder when it does not exist
    #[arg(long = "createdir")]
    pub create_dir: bool,

    /// Route traffic through the [proxy] section of the config file
    #[arg(long = "useproxy")]
    pub use_proxy: bool,

    /// Do not draw progress bars
    #[arg(long = "noprogress")]
    pub no_progress: bool,

    /// List the N most recently modified entries
    #[arg(long, value_name = "N")]
    pub recent: Option<usize>,

    /// Print used and available space
    #[arg(long)]
    pub usage: bool,

    /// Browse the drive interactively
    #[arg(long)]
    pub interactive: bool,

    /// Attempts per file transfer
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub tries: u32,

    /// Directory downloads are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dest: PathBuf,
}

impl Cli {
    /// Every search phrase, `--search` ones first.
    pub fn phrases(&self) -> Vec<String> {
        self.search
            .iter()
            .chain(&self.download_mode)
            .cloned()
            .collect()
    }

    /// Every upload path, `--uploadfile` ones first.
    pub fn upload_paths(&self) -> Vec<PathBuf> {
        self.upload_file
            .iter()
            .chain(&self.upload_mode)
            .cloned()
            .collect()
    }

    /// True when some operation was asked for.
    pub fn has_mode(&self) -> bool {
        self.interactive
            || self.usage
            || self.recent.is_some()
            || !self.phrases().is_empty()
            || !self.upload_paths().is_empty()
    }
}
