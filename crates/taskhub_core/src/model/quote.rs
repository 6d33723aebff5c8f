//! Free-standing quotes owned by a user.

use crate::model::entity::EntityId;
use crate::model::validation::{
    nullable, optional_text, required_text, ValidationErrors, MAX_QUOTE_AUTHOR_CHARS,
    MAX_QUOTE_CONTENT_CHARS,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub id: EntityId,
    pub user_id: EntityId,
    /// At most 500 characters.
    pub content: String,
    /// At most 100 characters.
    pub author: Option<String>,
}

/// Quote create/update payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteInput {
    pub content: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub author: Option<Option<String>>,
}

impl QuoteInput {
    pub fn into_new(self, user_id: EntityId) -> Result<Quote, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let content = required_text(
            &mut errors,
            "content",
            self.content.as_deref(),
            MAX_QUOTE_CONTENT_CHARS,
        );
        let author = self.author.flatten().and_then(|author| {
            optional_text(
                &mut errors,
                "author",
                Some(author.as_str()),
                MAX_QUOTE_AUTHOR_CHARS,
            )
        });

        match content {
            Some(content) if errors.is_empty() => Ok(Quote {
                id: Uuid::new_v4(),
                user_id,
                content,
                author,
            }),
            _ => Err(errors),
        }
    }

    /// Applies present fields; `author: null` clears the author.
    pub fn apply_to(&self, quote: &mut Quote) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut updated = quote.clone();
        if self.content.is_some() {
            if let Some(content) = required_text(
                &mut errors,
                "content",
                self.content.as_deref(),
                MAX_QUOTE_CONTENT_CHARS,
            ) {
                updated.content = content;
            }
        }
        if let Some(author) = &self.author {
            updated.author =
                optional_text(&mut errors, "author", author.as_deref(), MAX_QUOTE_AUTHOR_CHARS);
        }
        errors.into_result()?;
        *quote = updated;
        Ok(())
    }
}
