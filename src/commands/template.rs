use crate::artifact::Artifact;
use crate::commands::account_id;
use crate::template::Template;
use aws_config::BehaviorVersion;
use std::path::PathBuf;

#[derive(clap::Args, Clone)]
pub struct TemplateCommand {
    /// Environment to assemble for
    #[arg(short, long)]
    env: Option<String>,

    /// Account id embedded into bucket names, resolved via STS when omitted
    #[arg(short, long)]
    account: Option<String>,

    /// Path to the packaged handler code archive
    #[arg(long, value_name = "PATH", default_value = "dist/code.zip")]
    code: PathBuf,

    /// Path to the packaged dependency bundle archive
    #[arg(long, value_name = "PATH", default_value = "dist/dependencies.zip")]
    dependencies: PathBuf,
}

impl TemplateCommand {
    pub async fn run(&self) -> eyre::Result<()> {
        let code = Artifact::new(&self.code, "agent-code")?;
        let dependencies = Artifact::new(&self.dependencies, "agent-dependencies")?;

        let account_id = match &self.account {
            Some(account) => account.clone(),
            None => {
                let aws = aws_config::defaults(BehaviorVersion::v2025_01_17())
                    .load()
                    .await;

                account_id(&aws).await?
            }
        };

        let template = Template::new(self.env.as_deref(), &account_id, &code, &dependencies);
        println!("{}", template.body()?);

        Ok(())
    }
}
