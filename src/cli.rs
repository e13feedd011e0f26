use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shelfsense", about = "ShelfSense inventory management API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server.
    Serve {
        /// Port to listen on (overrides SHELFSENSE_PORT).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create the default admin user if it does not exist.
    Seed,
    /// Run one stock-alert evaluation tick and exit.
    CheckStock,
}
