use aws_sdk_cloudformation::types::DeletionMode;
use eyre::WrapErr;

/// Delete the stack with everything in it
pub async fn destroy(client: &aws_sdk_cloudformation::Client, name: &str) -> eyre::Result<()> {
    client
        .delete_stack()
        .deletion_mode(DeletionMode::ForceDeleteStack)
        .stack_name(name)
        .send()
        .await
        .wrap_err("Failed to delete stack")?;

    Ok(())
}
