pub mod deploy;
pub mod destroy;
pub mod status;
pub mod template;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Upload the artifacts, assemble the template and provision the stack
    Deploy(deploy::DeployCommand),

    /// [DANGER] Tear down a deployed stack
    Destroy(destroy::DestroyCommand),

    /// Show the state of the most recent stack operation
    Status(status::StatusCommand),

    /// Print the assembled CloudFormation template without deploying
    Template(template::TemplateCommand),
}

/// AWS account id of the active credentials
///
/// Bucket names embed the account id to stay globally unique.
pub(crate) async fn account_id(config: &aws_config::SdkConfig) -> eyre::Result<String> {
    let sts = aws_sdk_sts::Client::new(config);
    let identity = sts.get_caller_identity().send().await?;

    identity
        .account()
        .map(|account| account.to_string())
        .ok_or_else(|| eyre::eyre!("Failed to get AWS account ID"))
}
