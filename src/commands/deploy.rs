use crate::artifact::Artifact;
use crate::commands::account_id;
use crate::config::config;
use crate::stack::{self, Stack};
use crate::template::Template;
use aws_config::BehaviorVersion;
use std::path::PathBuf;

#[derive(clap::Args, Clone)]
pub struct DeployCommand {
    /// Environment to deploy into
    #[arg(short, long)]
    env: Option<String>,

    /// Path to the packaged handler code archive
    #[arg(long, value_name = "PATH", default_value = "dist/code.zip")]
    code: PathBuf,

    /// Path to the packaged dependency bundle archive
    #[arg(long, value_name = "PATH", default_value = "dist/dependencies.zip")]
    dependencies: PathBuf,
}

impl DeployCommand {
    pub async fn run(&self) -> eyre::Result<()> {
        let code = Artifact::new(&self.code, "agent-code")?;
        let dependencies = Artifact::new(&self.dependencies, "agent-dependencies")?;

        let aws = aws_config::defaults(BehaviorVersion::v2025_01_17())
            .load()
            .await;

        println!("{}...", console::style("Uploading artifacts").green().bold());
        let s3 = aws_sdk_s3::Client::new(&aws);
        code.upload(&s3, config().artifact_bucket).await?;
        dependencies.upload(&s3, config().artifact_bucket).await?;

        let account_id = account_id(&aws).await?;
        let template = Template::new(self.env.as_deref(), &account_id, &code, &dependencies);
        let stack = Stack::new(template.environment());

        println!(
            "{} {}...",
            console::style("Provisioning").green().bold(),
            stack.name
        );

        let cloudformation = aws_sdk_cloudformation::Client::new(&aws);
        stack::deploy::provision(&cloudformation, &stack, &template).await?;

        println!(
            "{}",
            console::style("Submitted, check progress with the status command").dim()
        );

        Ok(())
    }
}
