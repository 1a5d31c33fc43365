pub mod deploy;
pub mod destroy;
pub mod status;
use crate::config::config;

/// The deployed unit, one stack per environment
pub struct Stack {
    pub name: String,
}

impl Stack {
    pub fn new(environment: &str) -> Self {
        Stack {
            name: format!("{}-{}", config().name_prefix, environment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_embeds_the_environment() {
        assert_eq!(Stack::new("staging").name, "code-analysis-strands-staging");
    }
}
