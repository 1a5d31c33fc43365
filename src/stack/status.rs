use aws_sdk_cloudformation::types::StackEvent;
use eyre::WrapErr;
use serde_json::{json, Value};

/// Outcome of the most recent operation on the stack
#[derive(Debug, PartialEq)]
pub enum Status {
    InProgress,
    Complete,

    /// Events of the resources that failed, newest first
    Failed(Vec<Value>),
}

fn map_stack_event(event: &StackEvent) -> Value {
    json!({
        "Status": event.resource_status().map(|s| s.as_str()),
        "Reason": event.resource_status_reason(),
        "ResourceType": event.resource_type(),
        "Timestamp": event.timestamp().map(|t| t.to_string()),
    })
}

/// Classify the most recent operation on the stack
///
/// Stack events come back newest first, so a terminal stack-level event
/// seen before the "User Initiated" one means the operation is over.
pub async fn status(
    client: &aws_sdk_cloudformation::Client,
    name: &str,
) -> eyre::Result<Status> {
    let mut next_token = None;
    let mut events = Vec::new();
    let mut succeeded: Option<bool> = None;

    'pages: loop {
        let mut request = client.describe_stack_events().stack_name(name);

        if let Some(token) = next_token {
            request = request.next_token(token);
        }

        let response = request
            .send()
            .await
            .wrap_err("Failed to describe stack events")?;

        for event in response.stack_events() {
            let is_stack_event = event
                .resource_type()
                .is_some_and(|t| t.eq("AWS::CloudFormation::Stack"));

            if is_stack_event && event.resource_status_reason() == Some("User Initiated") {
                break 'pages;
            }

            if is_stack_event && succeeded.is_none() {
                succeeded = match event.resource_status().map(|s| s.as_str()) {
                    Some(
                        "UPDATE_ROLLBACK_COMPLETE" | "UPDATE_ROLLBACK_FAILED" | "CREATE_FAILED"
                        | "UPDATE_FAILED" | "DELETE_FAILED",
                    ) => Some(false),
                    Some("UPDATE_COMPLETE" | "CREATE_COMPLETE" | "DELETE_COMPLETE") => Some(true),
                    _ => None,
                };
            }

            events.push(map_stack_event(event));
        }

        next_token = response.next_token().map(|s| s.to_string());

        if next_token.is_none() {
            break;
        }
    }

    match succeeded {
        None => Ok(Status::InProgress),
        Some(true) => Ok(Status::Complete),
        Some(false) => {
            // Surface the resources that actually failed, not the
            // stack-level rollup
            let errors = events
                .into_iter()
                .filter(|event| {
                    let failed = event["Status"]
                        .as_str()
                        .is_some_and(|s| s.contains("FAILED"));

                    let is_resource = event["ResourceType"]
                        .as_str()
                        .is_some_and(|t| t != "AWS::CloudFormation::Stack");

                    failed && is_resource
                })
                .collect();

            Ok(Status::Failed(errors))
        }
    }
}
