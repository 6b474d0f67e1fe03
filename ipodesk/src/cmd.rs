use std::path::PathBuf;

use argh::FromArgs;

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
/// IPO listing desk
pub struct SiteCommand {
    #[argh(subcommand)]
    pub nested: NestedCommand,

    #[argh(switch, short = 'v', long = "verbose")]
    /// enable verbose output
    pub verbose: bool,
}

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
#[argh(subcommand)]
pub enum NestedCommand {
    Serve(ServeCommand),
    Import(ImportCommand),
}

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
#[argh(subcommand, name = "serve")]
/// Serve the JSON API
pub struct ServeCommand {
    #[argh(option)]
    /// host to bind the server to (overrides HOST)
    pub host: Option<String>,

    #[argh(option)]
    /// port to bind the server to (overrides PORT)
    pub port: Option<u16>,
}

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
#[argh(subcommand, name = "import")]
/// Import rows from a JSON array file into a table
pub struct ImportCommand {
    #[argh(positional)]
    /// id of the target table
    pub table_id: String,

    #[argh(positional)]
    /// path to a JSON file holding an array of row objects
    pub file: PathBuf,

    #[argh(option)]
    /// column used to detect rows that already exist
    pub unique_key: Option<String>,

    #[argh(switch)]
    /// skip duplicates instead of counting them as failures
    pub skip_duplicates: bool,
}
