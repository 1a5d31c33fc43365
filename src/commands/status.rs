use crate::config::DEFAULT_ENVIRONMENT;
use crate::stack::status::Status;
use crate::stack::{self, Stack};
use aws_config::BehaviorVersion;

#[derive(clap::Args, Clone)]
pub struct StatusCommand {
    /// Environment whose stack to inspect
    #[arg(short, long)]
    env: Option<String>,
}

impl StatusCommand {
    pub async fn run(&self) -> eyre::Result<()> {
        let environment = self.env.as_deref().unwrap_or(DEFAULT_ENVIRONMENT);
        let stack = Stack::new(environment);

        let aws = aws_config::defaults(BehaviorVersion::v2025_01_17())
            .load()
            .await;

        let client = aws_sdk_cloudformation::Client::new(&aws);

        match stack::status::status(&client, &stack.name).await? {
            Status::InProgress => {
                println!("{}", console::style("In progress").yellow().bold());
            }

            Status::Complete => {
                println!("{}", console::style("Complete").green().bold());
            }

            Status::Failed(errors) => {
                println!("{}", console::style("Failed").red().bold());

                for error in errors {
                    println!("{}", serde_json::to_string_pretty(&error)?);
                }
            }
        }

        Ok(())
    }
}
