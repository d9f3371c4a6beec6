use crate::models::PostKind;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Post creation payload. The author is never taken from here; the request
/// layer passes it separately as the attribution context.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_post_body"))]
pub struct PostInput {
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Comment creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentInput {
    pub comment: String,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map_or(true, str::is_empty)
}

/// A text post needs a body, a link post needs a URL
fn validate_post_body(input: &PostInput) -> Result<(), ValidationError> {
    match input.kind {
        PostKind::Text if is_blank(&input.text) => Err(ValidationError::new("missing_text")
            .with_message("Text field missing for text type of post".into())),
        PostKind::Link if is_blank(&input.url) => Err(ValidationError::new("missing_url")
            .with_message("Url field missing for link type of post".into())),
        _ => Ok(()),
    }
}
