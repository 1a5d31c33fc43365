mod artifact;
mod commands;
mod config;
mod error;
mod logger;
mod stack;
mod template;
use crate::commands::Commands;
use crate::error::Error;
use clap::Parser;

#[derive(Parser)]
#[command(
    arg_required_else_help = true,
    name = "code-analysis-stack",
    version,
    about = "Assemble and deploy the code-analysis pipeline stack",
    long_about = "Declares the infrastructure of the code-analysis pipeline (an S3-triggered \
        analysis function, its input and output buckets, the upload event rule and the \
        permissions between them) and drives the resulting template through CloudFormation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init();

    // Match all commands here, in one place
    Ok(match Cli::parse().command {
        Commands::Deploy(cmd) => cmd.run().await?,
        Commands::Destroy(cmd) => cmd.run().await?,
        Commands::Status(cmd) => cmd.run().await?,
        Commands::Template(cmd) => cmd.run().await?,
    })
}
