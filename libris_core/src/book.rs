//! Book value type shared by recommendations and reading history.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    #[error("book name must not be empty")]
    EmptyName,
    #[error("book author must not be empty")]
    EmptyAuthor,
}

/// A book identified by name and author.
///
/// Fields are validated on construction and cannot be changed afterwards.
/// Deserialization goes through the same validation, so a stored or
/// model-produced book with a blank name or author is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBook")]
pub struct Book {
    name: String,
    author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Deserialize)]
struct RawBook {
    name: String,
    author: String,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<RawBook> for Book {
    type Error = BookError;

    fn try_from(raw: RawBook) -> Result<Self, Self::Error> {
        let book = Self::new(raw.name, raw.author)?;
        Ok(match raw.description {
            Some(description) => book.with_description(description),
            None => book,
        })
    }
}

impl Book {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Result<Self, BookError> {
        let name = name.into().trim().to_string();
        let author = author.into().trim().to_string();

        if name.is_empty() {
            return Err(BookError::EmptyName);
        }
        if author.is_empty() {
            return Err(BookError::EmptyAuthor);
        }

        Ok(Self {
            name,
            author,
            description: None,
        })
    }

    /// Attach a description. Blank descriptions are dropped.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into().trim().to_string();
        self.description = (!description.is_empty()).then_some(description);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} — {}", self.name, self.author)
    }
}

/// Render books as a numbered list, one entry per line.
#[must_use]
pub fn format_book_list(books: &[Book]) -> String {
    if books.is_empty() {
        return "No books available.".to_string();
    }

    let mut lines = Vec::with_capacity(books.len());
    for (i, book) in books.iter().enumerate() {
        lines.push(format!("{}. **{}** by {}", i + 1, book.name, book.author));
        if let Some(description) = &book.description {
            lines.push(format!("   {description}"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_fields() {
        assert_eq!(Book::new("  ", "Frank Herbert"), Err(BookError::EmptyName));
        assert_eq!(Book::new("Dune", ""), Err(BookError::EmptyAuthor));
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn structural_equality() {
        let a = Book::new("Dune", "Frank Herbert").unwrap();
        let b = Book::new(" Dune ", "Frank Herbert").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_description("Desert planet"));
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<Book, _> = serde_json::from_str(r#"{"name":"Emma","author":"Jane Austen"}"#);
        assert!(ok.is_ok());

        let bad: Result<Book, _> = serde_json::from_str(r#"{"name":"","author":"Jane Austen"}"#);
        assert!(bad.is_err());
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn list_formatting() {
        let books = vec![
            Book::new("Dune", "Frank Herbert")
                .unwrap()
                .with_description("Spice and sand"),
            Book::new("Emma", "Jane Austen").unwrap(),
        ];

        assert_eq!(
            format_book_list(&books),
            "1. **Dune** by Frank Herbert\n   Spice and sand\n2. **Emma** by Jane Austen"
        );
        assert_eq!(format_book_list(&[]), "No books available.");
        assert_eq!(books[1].to_string(), "Emma — Jane Austen");
    }
}
