use crate::config::DEFAULT_ENVIRONMENT;
use crate::stack::{self, Stack};
use aws_config::BehaviorVersion;

#[derive(clap::Args, Clone)]
pub struct DestroyCommand {
    /// Environment whose stack to destroy
    #[arg(short, long)]
    env: Option<String>,
}

impl DestroyCommand {
    pub async fn run(&self) -> eyre::Result<()> {
        let environment = self.env.as_deref().unwrap_or(DEFAULT_ENVIRONMENT);
        let stack = Stack::new(environment);

        let aws = aws_config::defaults(BehaviorVersion::v2025_01_17())
            .load()
            .await;

        let client = aws_sdk_cloudformation::Client::new(&aws);
        stack::destroy::destroy(&client, &stack.name).await?;

        println!(
            "{} {}",
            console::style("Destroying").red().bold(),
            stack.name
        );

        Ok(())
    }
}
