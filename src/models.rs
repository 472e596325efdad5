use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimal reference returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: String,
}

/// One page of a message listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<MessageSummary>,
    /// `None` when this is the last page
    pub next_page_token: Option<String>,
}

impl MessagePage {
    pub fn new<I, S>(ids: I, next_page_token: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            messages: ids
                .into_iter()
                .map(|id| MessageSummary { id: id.into() })
                .collect(),
            next_page_token: next_page_token.filter(|token| !token.is_empty()),
        }
    }
}

/// Full message as fetched from the mailbox service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetail {
    pub id: String,
    pub size_estimate: i64,
    pub label_ids: Vec<String>,
    /// Top-level body parts of the payload, in service order
    pub body_parts: Vec<BodyPart>,
    pub headers: Vec<Header>,
}

/// A MIME body part. `encoded_data` is base64url.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPart {
    pub part_id: String,
    pub mime_type: Option<String>,
    pub encoded_data: Option<String>,
    /// Nested parts of a multipart container
    #[serde(default)]
    pub parts: Vec<BodyPart>,
}

impl BodyPart {
    pub fn new(part_id: impl Into<String>, encoded_data: impl Into<String>) -> Self {
        Self {
            part_id: part_id.into(),
            encoded_data: Some(encoded_data.into()),
            ..Default::default()
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn is_mime(&self, mime_type: &str) -> bool {
        self.mime_type
            .as_deref()
            .map(|m| m.eq_ignore_ascii_case(mime_type))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Coarse Gmail category, written as its numeric code in the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CategoryCode {
    Forums = 0,
    Personal = 1,
    Promotions = 2,
    Social = 3,
    Updates = 4,
}

impl CategoryCode {
    /// All categories in priority order
    pub const ALL: [CategoryCode; 5] = [
        CategoryCode::Forums,
        CategoryCode::Personal,
        CategoryCode::Promotions,
        CategoryCode::Social,
        CategoryCode::Updates,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Label identifier substring that marks this category
    pub fn marker(self) -> &'static str {
        match self {
            CategoryCode::Forums => "CATEGORY_FORUMS",
            CategoryCode::Personal => "CATEGORY_PERSONAL",
            CategoryCode::Promotions => "CATEGORY_PROMOTIONS",
            CategoryCode::Social => "CATEGORY_SOCIAL",
            CategoryCode::Updates => "CATEGORY_UPDATES",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CategoryCode::Forums => "forums",
            CategoryCode::Personal => "personal",
            CategoryCode::Promotions => "promotions",
            CategoryCode::Social => "social",
            CategoryCode::Updates => "updates",
        }
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Date, From and Subject pulled out of a header list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedHeaders {
    pub date: Option<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
}

/// One classified, decoded message ready to be written to the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub sequence_id: u64,
    pub categories: Vec<CategoryCode>,
    pub headers: ExtractedHeaders,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_codes_follow_priority_order() {
        let codes: Vec<u8> = CategoryCode::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4]);
        assert_eq!(CategoryCode::from_code(3), Some(CategoryCode::Social));
        assert_eq!(CategoryCode::from_code(5), None);
        assert_eq!(CategoryCode::Updates.to_string(), "4");
    }

    #[test]
    fn test_message_page_drops_empty_token() {
        let page = MessagePage::new(["a", "b"], Some(String::new()));
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.next_page_token, None);

        let page = MessagePage::new(Vec::<String>::new(), Some("next".to_string()));
        assert!(page.messages.is_empty());
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
    }

    #[test]
    fn test_body_part_mime_match_is_case_insensitive() {
        let part = BodyPart::new("0", "aGk").with_mime_type("Text/Plain");
        assert!(part.is_mime("text/plain"));
        assert!(!part.is_mime("text/html"));
        assert!(!BodyPart::new("1", "aGk").is_mime("text/plain"));
    }
}
