use crate::stack::Stack;
use crate::template::Template;
use eyre::WrapErr;

/// Check if the stack already exists
async fn is_exists(client: &aws_sdk_cloudformation::Client, name: &str) -> eyre::Result<bool> {
    let result = client
        .describe_stacks()
        .set_stack_name(Some(name.into()))
        .send()
        .await;

    if let Err(e) = &result {
        if let aws_sdk_cloudformation::error::SdkError::ServiceError(err) = e {
            // An unknown stack name comes back as a validation error
            if err.err().meta().code().unwrap_or_default().eq("ValidationError") {
                return Ok(false);
            }

            return Err(eyre::eyre!("Service error while describing stack: {:?}", err));
        }

        return Err(eyre::eyre!("Failed to describe stack: {:?}", e));
    }

    Ok(true)
}

/// Provision the assembled template, creating or updating the stack
pub async fn provision(
    client: &aws_sdk_cloudformation::Client,
    stack: &Stack,
    template: &Template,
) -> eyre::Result<()> {
    let capabilities = aws_sdk_cloudformation::types::Capability::CapabilityIam;
    let body = template.body()?;

    if is_exists(client, &stack.name).await? {
        client
            .update_stack()
            .capabilities(capabilities)
            .stack_name(&stack.name)
            .template_body(body)
            .send()
            .await
            .wrap_err("Failed to update stack")?;
    } else {
        client
            .create_stack()
            .capabilities(capabilities)
            .stack_name(&stack.name)
            .template_body(body)
            .send()
            .await
            .wrap_err("Failed to create stack")?;
    }

    Ok(())
}
