use crate::artifact::Artifact;
use crate::config::{config, DEFAULT_ENVIRONMENT};
use serde_json::{json, Value};

/// File extensions that trigger the analysis pipeline
pub const ANALYZED_SUFFIXES: [&str; 25] = [
    ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".c", ".cpp", ".h", ".hpp", ".cs", ".go", ".rs",
    ".rb", ".php", ".swift", ".kt", ".scala", ".sh", ".sql", ".html", ".css", ".json", ".yaml",
    ".yml",
];

/// Actions the function is allowed to call on the inference API
const BEDROCK_ACTIONS: [&str; 2] = [
    "bedrock:InvokeModel",
    "bedrock:InvokeModelWithResponseStream",
];

/// Actions the function is allowed to call on the two buckets
const S3_ACTIONS: [&str; 3] = ["s3:GetObject", "s3:PutObject", "s3:ListBucket"];

/// The assembled resource graph of one environment
///
/// Construction is pure and single-pass: no AWS calls, no I/O. Every
/// cross-resource reference is a CloudFormation intrinsic ("Ref",
/// "Fn::GetAtt") resolved by the provisioning engine once the graph is
/// finalized, never an embedded value.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    environment: String,
    account_id: String,
    template: Value,
}

#[derive(Clone, Debug)]
pub struct CfnResource {
    name: String,
    resource: Value,
}

#[derive(Clone, Debug)]
pub struct CfnOutput {
    name: String,
    output: Value,
}

impl Template {
    /// Assemble the full resource graph for one environment
    ///
    /// Falls back to the default environment when none is given. The
    /// account id only shows up in bucket names, which have to be
    /// globally unique.
    pub fn new(
        environment: Option<&str>,
        account_id: &str,
        code: &Artifact,
        dependencies: &Artifact,
    ) -> Self {
        let mut template = Template {
            environment: environment.unwrap_or(DEFAULT_ENVIRONMENT).to_string(),
            account_id: account_id.to_string(),
            template: json!({"Resources": {}, "Outputs": {}}),
        };

        for resource in template.buckets() {
            template.add_resource(resource);
        }

        template.add_resource(template.dependencies_layer(dependencies));

        for resource in template.function(code) {
            template.add_resource(resource);
        }

        for resource in template.event_rule() {
            template.add_resource(resource);
        }

        for output in template.outputs() {
            template.add_output(output);
        }

        template
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// The template as a CloudFormation-ready JSON string
    pub fn body(&self) -> eyre::Result<String> {
        Ok(serde_json::to_string_pretty(&self.template)?)
    }

    pub fn value(&self) -> &Value {
        &self.template
    }

    /// Add a resource to the template
    ///
    /// Logical ids are unique within a stack. Inserting the same id
    /// twice is a bug in the assembler, not a deployment-time problem.
    fn add_resource(&mut self, CfnResource { name, resource }: CfnResource) {
        let previous = self
            .template
            .get_mut("Resources")
            .unwrap()
            .as_object_mut()
            .unwrap()
            .insert(name.clone(), resource);

        assert!(previous.is_none(), "Duplicate logical id {name}");
    }

    /// Add a named output projecting a resource attribute
    fn add_output(&mut self, CfnOutput { name, output }: CfnOutput) {
        let previous = self
            .template
            .get_mut("Outputs")
            .unwrap()
            .as_object_mut()
            .unwrap()
            .insert(name.clone(), output);

        assert!(previous.is_none(), "Duplicate output {name}");
    }

    /// Physical name of the analysis function
    fn function_name(&self) -> String {
        format!(
            "{prefix}-agent-{env}",
            prefix = config().name_prefix,
            env = self.environment
        )
    }

    /// Physical name of the input or output bucket
    fn bucket_name(&self, direction: &str) -> String {
        format!(
            "{prefix}-{direction}-{env}-{account}",
            prefix = config().name_prefix,
            env = self.environment,
            account = self.account_id
        )
    }

    /// Input and output buckets
    ///
    /// EventBridge notifications are switched on for the input bucket so
    /// that object-created events reach the upload rule at all.
    fn buckets(&self) -> Vec<CfnResource> {
        vec![
            CfnResource {
                name: "InputBucket".into(),
                resource: json!({
                    "Type": "AWS::S3::Bucket",
                    "Properties": {
                        "BucketName": self.bucket_name("input"),
                        "NotificationConfiguration": {
                            "EventBridgeConfiguration": {"EventBridgeEnabled": true}
                        }
                    }
                }),
            },
            CfnResource {
                name: "OutputBucket".into(),
                resource: json!({
                    "Type": "AWS::S3::Bucket",
                    "Properties": {
                        "BucketName": self.bucket_name("output")
                    }
                }),
            },
        ]
    }

    /// Layer carrying the pre-built dependency bundle
    fn dependencies_layer(&self, artifact: &Artifact) -> CfnResource {
        CfnResource {
            name: "DependenciesLayer".into(),
            resource: json!({
                "Type": "AWS::Lambda::LayerVersion",
                "Properties": {
                    "LayerName": format!(
                        "{prefix}-dependencies-{env}",
                        prefix = config().name_prefix,
                        env = self.environment
                    ),
                    "CompatibleRuntimes": ["python3.12"],
                    "Content": {
                        "S3Bucket": config().artifact_bucket,
                        "S3Key": artifact.key()
                    }
                }
            }),
        }
    }

    /// Environment variables exposed to the handler
    fn environment_variables(&self) -> Value {
        json!({
            "Variables": {
                "ENVIRONMENT": self.environment,
                "BEDROCK_MODEL_ID": config().model_id,
                "INPUT_BUCKET": self.bucket_name("input"),
                "OUTPUT_BUCKET": self.bucket_name("output")
            }
        })
    }

    /// Policy statements for the function's two external collaborators:
    /// the inference API and the two buckets
    fn policies(&self) -> Vec<Value> {
        let buckets = ["InputBucket", "OutputBucket"]
            .iter()
            .flat_map(|bucket| {
                [
                    json!({"Fn::GetAtt": [bucket, "Arn"]}),
                    json!({"Fn::Join": ["", [{"Fn::GetAtt": [bucket, "Arn"]}, "/*"]]}),
                ]
            })
            .collect::<Vec<Value>>();

        vec![
            json!({
                "PolicyName": "AppendToLogsPolicy",
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": [
                            "logs:CreateLogGroup",
                            "logs:CreateLogStream",
                            "logs:PutLogEvents"
                        ],
                        "Resource": "*"
                    }]
                }
            }),
            json!({
                "PolicyName": "BedrockInvokePolicy",
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": BEDROCK_ACTIONS,
                        "Resource": "arn:aws:bedrock:*::foundation-model/*"
                    }]
                }
            }),
            json!({
                "PolicyName": "BucketAccessPolicy",
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": S3_ACTIONS,
                        "Resource": buckets
                    }]
                }
            }),
        ]
    }

    /// The analysis function and its role
    fn function(&self, code: &Artifact) -> Vec<CfnResource> {
        vec![
            CfnResource {
                name: "AgentFunction".into(),
                resource: json!({
                    "Type": "AWS::Lambda::Function",
                    "Properties": {
                        "FunctionName": self.function_name(),
                        "Handler": "agent_handler.handler",
                        "Runtime": "python3.12",
                        "MemorySize": 1024,
                        "Timeout": 300,
                        "Environment": self.environment_variables(),
                        "Layers": [{"Ref": "DependenciesLayer"}],
                        "Role": {
                            "Fn::GetAtt": ["AgentRole", "Arn"]
                        },
                        "Code": {
                            "S3Bucket": config().artifact_bucket,
                            "S3Key": code.key()
                        },
                        "Tags": [{
                            "Key": "Environment",
                            "Value": self.environment
                        }]
                    }
                }),
            },
            CfnResource {
                name: "AgentRole".into(),
                resource: json!({
                    "Type": "AWS::IAM::Role",
                    "Properties": {
                        "AssumeRolePolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Effect": "Allow",
                                "Principal": {
                                    "Service": ["lambda.amazonaws.com"]
                                },
                                "Action": ["sts:AssumeRole"]
                            }]
                        },
                        "Path": "/",
                        "Policies": self.policies()
                    }
                }),
            },
        ]
    }

    /// Upload rule and the permission letting EventBridge invoke the function
    ///
    /// The input transformer reshapes the raw S3 event into the payload
    /// the handler expects, including the destination bucket name which
    /// is not part of the original event.
    fn event_rule(&self) -> Vec<CfnResource> {
        let suffixes = ANALYZED_SUFFIXES
            .iter()
            .map(|suffix| json!({"suffix": suffix}))
            .collect::<Vec<Value>>();

        vec![
            CfnResource {
                name: "UploadRule".into(),
                resource: json!({
                    "Type": "AWS::Events::Rule",
                    "Properties": {
                        "Name": format!(
                            "{prefix}-upload-{env}",
                            prefix = config().name_prefix,
                            env = self.environment
                        ),
                        "Description": "Route source file uploads to the analysis function",
                        "State": "ENABLED",
                        "EventPattern": {
                            "source": ["aws.s3"],
                            "detail-type": ["Object Created"],
                            "detail": {
                                "bucket": {"name": [self.bucket_name("input")]},
                                "object": {"key": suffixes}
                            }
                        },
                        "Targets": [{
                            "Arn": {"Fn::GetAtt": ["AgentFunction", "Arn"]},
                            "Id": "AgentFunctionTarget",
                            "InputTransformer": {
                                "InputPathsMap": {
                                    "eventType": "$.detail-type",
                                    "bucket": "$.detail.bucket.name",
                                    "key": "$.detail.object.key",
                                    "size": "$.detail.object.size",
                                    "etag": "$.detail.object.etag",
                                    "time": "$.time"
                                },
                                "InputTemplate": format!(
                                    r#"{{"source":"eventbridge","eventType":<eventType>,"bucket":<bucket>,"key":<key>,"size":<size>,"etag":<etag>,"time":<time>,"outputBucket":"{output}"}}"#,
                                    output = self.bucket_name("output")
                                )
                            }
                        }]
                    }
                }),
            },
            CfnResource {
                name: "UploadRulePermission".into(),
                resource: json!({
                    "Type": "AWS::Lambda::Permission",
                    "Properties": {
                        "Action": "lambda:InvokeFunction",
                        "FunctionName": {"Ref": "AgentFunction"},
                        "Principal": "events.amazonaws.com",
                        "SourceArn": {"Fn::GetAtt": ["UploadRule", "Arn"]}
                    }
                }),
            },
        ]
    }

    /// Named values exposed after deployment for downstream consumption
    fn outputs(&self) -> Vec<CfnOutput> {
        vec![
            CfnOutput {
                name: "FunctionName".into(),
                output: json!({
                    "Description": "Name of the analysis function",
                    "Value": {"Ref": "AgentFunction"}
                }),
            },
            CfnOutput {
                name: "FunctionArn".into(),
                output: json!({
                    "Description": "ARN of the analysis function",
                    "Value": {"Fn::GetAtt": ["AgentFunction", "Arn"]}
                }),
            },
            CfnOutput {
                name: "DependenciesLayerArn".into(),
                output: json!({
                    "Description": "ARN of the dependency bundle layer",
                    "Value": {"Ref": "DependenciesLayer"}
                }),
            },
            CfnOutput {
                name: "InputBucketName".into(),
                output: json!({
                    "Description": "Bucket watched for source file uploads",
                    "Value": {"Ref": "InputBucket"}
                }),
            },
            CfnOutput {
                name: "OutputBucketName".into(),
                output: json!({
                    "Description": "Bucket receiving analysis reports",
                    "Value": {"Ref": "OutputBucket"}
                }),
            },
            CfnOutput {
                name: "EventRuleName".into(),
                output: json!({
                    "Description": "Name of the upload event rule",
                    "Value": {"Ref": "UploadRule"}
                }),
            },
        ]
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ACCOUNT: &str = "123456789012";

    fn artifacts() -> (Artifact, Artifact) {
        let dir = std::env::temp_dir();
        let code = dir.join("template-test-code.zip");
        let dependencies = dir.join("template-test-dependencies.zip");
        std::fs::write(&code, b"code").unwrap();
        std::fs::write(&dependencies, b"dependencies").unwrap();

        (
            Artifact::new(&code, "agent-code").unwrap(),
            Artifact::new(&dependencies, "agent-dependencies").unwrap(),
        )
    }

    fn template(environment: Option<&str>) -> Template {
        let (code, dependencies) = artifacts();
        Template::new(environment, ACCOUNT, &code, &dependencies)
    }

    fn resources_of_type(template: &Template, kind: &str) -> Vec<String> {
        template.value()["Resources"]
            .as_object()
            .unwrap()
            .iter()
            .filter(|(_, resource)| resource["Type"] == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    #[test]
    fn resource_census() {
        let template = template(Some("dev"));

        assert_eq!(resources_of_type(&template, "AWS::Lambda::Function").len(), 1);
        assert_eq!(resources_of_type(&template, "AWS::S3::Bucket").len(), 2);
        assert_eq!(
            resources_of_type(&template, "AWS::Lambda::LayerVersion").len(),
            1
        );
        assert_eq!(resources_of_type(&template, "AWS::Events::Rule").len(), 1);
    }

    #[test]
    fn environment_tag_defaults_to_dev() {
        let template = template(None);

        assert_eq!(template.environment(), "dev");
        assert_eq!(
            template.value()["Resources"]["AgentFunction"]["Properties"]["Environment"]
                ["Variables"]["ENVIRONMENT"],
            "dev"
        );
    }

    #[test]
    fn environment_tag_matches_input() {
        let template = template(Some("prod"));

        assert_eq!(
            template.value()["Resources"]["AgentFunction"]["Properties"]["Environment"]
                ["Variables"]["ENVIRONMENT"],
            "prod"
        );
    }

    #[test]
    fn staging_names_follow_the_convention() {
        let template = template(Some("staging"));
        let properties = &template.value()["Resources"];

        assert_eq!(
            properties["AgentFunction"]["Properties"]["FunctionName"],
            "code-analysis-strands-agent-staging"
        );
        assert_eq!(
            properties["InputBucket"]["Properties"]["BucketName"],
            format!("code-analysis-strands-input-staging-{ACCOUNT}")
        );
        assert_eq!(
            properties["OutputBucket"]["Properties"]["BucketName"],
            format!("code-analysis-strands-output-staging-{ACCOUNT}")
        );
    }

    #[test]
    fn rule_filters_exactly_the_allowed_suffixes() {
        let template = template(Some("dev"));

        let filters = template.value()["Resources"]["UploadRule"]["Properties"]["EventPattern"]
            ["detail"]["object"]["key"]
            .as_array()
            .unwrap();

        let suffixes = filters
            .iter()
            .map(|f| f["suffix"].as_str().unwrap())
            .collect::<HashSet<&str>>();

        assert_eq!(filters.len(), 25);
        assert_eq!(
            suffixes,
            ANALYZED_SUFFIXES.iter().copied().collect::<HashSet<&str>>()
        );
    }

    #[test]
    fn rule_watches_the_input_bucket() {
        let template = template(Some("dev"));
        let pattern = &template.value()["Resources"]["UploadRule"]["Properties"]["EventPattern"];

        assert_eq!(pattern["source"], json!(["aws.s3"]));
        assert_eq!(pattern["detail-type"], json!(["Object Created"]));
        assert_eq!(
            pattern["detail"]["bucket"]["name"],
            json!([format!("code-analysis-strands-input-dev-{ACCOUNT}")])
        );
    }

    #[test]
    fn transformed_payload_carries_the_destination_bucket() {
        let template = template(Some("dev"));
        let target = &template.value()["Resources"]["UploadRule"]["Properties"]["Targets"][0];

        let paths = target["InputTransformer"]["InputPathsMap"].as_object().unwrap();
        for field in ["eventType", "bucket", "key", "size", "etag", "time"] {
            assert!(paths.contains_key(field), "missing path for {field}");
        }

        let body = target["InputTransformer"]["InputTemplate"].as_str().unwrap();
        assert!(body.contains(r#""source":"eventbridge""#));
        assert!(body.contains(&format!(
            r#""outputBucket":"code-analysis-strands-output-dev-{ACCOUNT}""#
        )));
    }

    #[test]
    fn permissions_grant_exactly_the_named_actions() {
        let template = template(Some("dev"));

        let policies = template.value()["Resources"]["AgentRole"]["Properties"]["Policies"]
            .as_array()
            .unwrap();

        let statement = |name: &str| {
            policies
                .iter()
                .find(|p| p["PolicyName"] == name)
                .unwrap_or_else(|| panic!("no policy {name}"))["PolicyDocument"]["Statement"][0]
                .clone()
        };

        let bedrock = statement("BedrockInvokePolicy");
        assert_eq!(
            bedrock["Action"],
            json!(["bedrock:InvokeModel", "bedrock:InvokeModelWithResponseStream"])
        );

        let s3 = statement("BucketAccessPolicy");
        assert_eq!(
            s3["Action"],
            json!(["s3:GetObject", "s3:PutObject", "s3:ListBucket"])
        );

        // Scoped to the two declared buckets only: their ARNs plus the
        // object ARNs under each
        let resources = s3["Resource"].as_array().unwrap();
        assert_eq!(resources.len(), 4);

        for bucket in ["InputBucket", "OutputBucket"] {
            assert!(resources.contains(&json!({"Fn::GetAtt": [bucket, "Arn"]})));
        }
    }

    #[test]
    fn every_reference_resolves_to_a_declared_resource() {
        let template = template(Some("dev"));
        let resources = template.value()["Resources"].as_object().unwrap();

        fn collect_refs(value: &Value, refs: &mut Vec<String>) {
            match value {
                Value::Object(map) => {
                    if let Some(name) = map.get("Ref").and_then(|r| r.as_str()) {
                        refs.push(name.to_string());
                    }

                    if let Some(target) = map
                        .get("Fn::GetAtt")
                        .and_then(|g| g.as_array())
                        .and_then(|g| g.first())
                        .and_then(|n| n.as_str())
                    {
                        refs.push(target.to_string());
                    }

                    for nested in map.values() {
                        collect_refs(nested, refs);
                    }
                }
                Value::Array(items) => {
                    for nested in items {
                        collect_refs(nested, refs);
                    }
                }
                _ => {}
            }
        }

        let mut refs = Vec::new();
        collect_refs(template.value(), &mut refs);

        assert!(!refs.is_empty());
        for reference in refs {
            assert!(
                resources.contains_key(&reference),
                "dangling reference {reference}"
            );
        }
    }

    #[test]
    fn outputs_census() {
        let template = template(Some("dev"));
        let outputs = template.value()["Outputs"].as_object().unwrap();

        let expected = [
            "FunctionName",
            "FunctionArn",
            "DependenciesLayerArn",
            "InputBucketName",
            "OutputBucketName",
            "EventRuleName",
        ];

        assert_eq!(outputs.len(), expected.len());
        for name in expected {
            assert!(outputs.contains_key(name), "missing output {name}");
        }
    }

    #[test]
    fn assembly_is_deterministic() {
        let first = template(Some("staging"));
        let second = template(Some("staging"));

        assert_eq!(first, second);
        assert_eq!(first.body().unwrap(), second.body().unwrap());
    }

    #[test]
    fn function_references_both_artifacts() {
        let (code, dependencies) = artifacts();
        let template = Template::new(Some("dev"), ACCOUNT, &code, &dependencies);
        let resources = &template.value()["Resources"];

        assert_eq!(
            resources["AgentFunction"]["Properties"]["Code"]["S3Key"],
            code.key()
        );
        assert_eq!(
            resources["DependenciesLayer"]["Properties"]["Content"]["S3Key"],
            dependencies.key()
        );
    }
}
