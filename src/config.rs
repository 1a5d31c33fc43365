use std::sync::OnceLock;

/// Environment assumed when none is requested on the command line
pub const DEFAULT_ENVIRONMENT: &str = "dev";

pub(crate) struct Config<'a> {
    /// S3 bucket holding the uploaded build artifacts
    pub(crate) artifact_bucket: &'a str,

    /// Bedrock model the analysis function invokes
    pub(crate) model_id: &'a str,

    /// Prefix shared by every resource name in the stack
    pub(crate) name_prefix: &'a str,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

pub(crate) fn config() -> &'static Config<'static> {
    CONFIG.get_or_init(|| Config {
        artifact_bucket: option_env!("CAS_ARTIFACT_BUCKET").unwrap_or("code-analysis-strands-builds"),

        model_id: option_env!("CAS_MODEL_ID")
            .unwrap_or("us.anthropic.claude-3-7-sonnet-20250219-v1:0"),

        name_prefix: option_env!("CAS_NAME_PREFIX").unwrap_or("code-analysis-strands"),
    })
}
