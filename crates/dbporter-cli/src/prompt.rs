//! Interactive prompts.

use dbporter::SUPPORTED_TYPES;
use dialoguer::Select;

/// Errors raised while prompting.
#[derive(Debug)]
pub enum PromptError {
    /// User dismissed the prompt.
    Cancelled,
    /// Terminal IO failed.
    Io(std::io::Error),
}

impl std::fmt::Display for PromptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "Selection cancelled"),
            Self::Io(e) => write!(f, "Prompt failed: {}", e),
        }
    }
}

impl std::error::Error for PromptError {}

impl From<dialoguer::Error> for PromptError {
    fn from(e: dialoguer::Error) -> Self {
        Self::Io(std::io::Error::other(e.to_string()))
    }
}

/// Ask the user which adapter type to read from.
pub fn select_source_type() -> Result<String, PromptError> {
    let selection = Select::new()
        .with_prompt("Select Source Type")
        .items(SUPPORTED_TYPES)
        .default(0)
        .interact_opt()?;

    selection
        .map(|idx| SUPPORTED_TYPES[idx].to_string())
        .ok_or(PromptError::Cancelled)
}
