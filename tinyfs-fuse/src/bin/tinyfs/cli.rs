use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// Image file holding the file system
    #[arg(long, short, default_value = "tinyfs.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a fresh image, overwriting any existing file
    Format {
        /// Size of the descriptor table
        #[arg(long, short, default_value_t = 100)]
        descriptors: u16,
    },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        dir: String,
    },
    /// Copy a host file into the image
    Put { source: PathBuf, name: String },
    /// Print a file to stdout
    Cat { name: String },
    Truncate { name: String, size: u16 },
    /// Add a hard link
    Link { existing: String, new: String },
    Unlink { name: String },
    Mkdir { path: String },
    Rmdir { path: String },
    /// Show a file's descriptor
    Stat { name: String },
    /// Show block and descriptor usage
    Df,
}
