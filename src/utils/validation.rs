// file: src/utils/validation.rs
// description: configuration and input validation helpers
// reference: input validation patterns

use crate::error::{PipelineError, Result};

pub struct Validator;

impl Validator {
    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(PipelineError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        }
        Ok(())
    }

    pub fn validate_batch_size(size: usize) -> Result<()> {
        if size == 0 {
            return Err(PipelineError::Validation(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if size > 10000 {
            return Err(PipelineError::Validation(
                "Batch size too large (max 10000)".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_index_name(name: &str) -> Result<()> {
        let invalid = name.is_empty()
            || name.starts_with(['_', '-', '+'])
            || name
                .chars()
                .any(|c| c.is_ascii_uppercase() || " \\/*?\"<>|,#:".contains(c));

        if invalid {
            return Err(PipelineError::Validation(format!(
                "Invalid index name: {:?}",
                name
            )));
        }
        Ok(())
    }
}
