//! Content data models.

use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::UserId;

pub type TermId = i64;
pub type PostId = i64;

pub const TERM_NAME_MAX_LEN: usize = 10;
pub const POST_TITLE_MAX_LEN: usize = 64;

/// Which taxonomy a term belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Category,
    Tag,
}

impl TermKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            TermKind::Category => "categories",
            TermKind::Tag => "tags",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TermKind::Category => "Category",
            TermKind::Tag => "Tag",
        }
    }
}

/// Category or tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Term {
    pub id: TermId,
    pub name: String,
}

/// Create/rename payload for a term
#[derive(Debug, Clone, Deserialize)]
pub struct TermName {
    pub name: String,
}

/// A term with the posts filed under it
#[derive(Debug, Clone, Serialize)]
pub struct TermDetail {
    pub id: TermId,
    pub name: String,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub category_id: Option<TermId>,
    /// Sorted ascending
    pub tag_ids: Vec<TermId>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostCreate {
    pub title: String,
    pub content: String,
    pub category_id: Option<TermId>,
    #[serde(default)]
    pub tag_ids: Vec<TermId>,
}

/// Partial post update; `tag_ids`, when present, replaces the whole set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Absent leaves the category alone; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<TermId>>,
    pub tag_ids: Option<Vec<TermId>>,
}

/// Marks a field that appeared in the payload, even as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Optional list filters, combined with AND
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PostFilter {
    pub category_id: Option<TermId>,
    pub tag_id: Option<TermId>,
    pub author_id: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_update_category_is_tri_state() {
        let absent: PostUpdate = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(absent.category_id, None);

        let cleared: PostUpdate = serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        assert_eq!(cleared.category_id, Some(None));

        let set: PostUpdate = serde_json::from_str(r#"{"category_id": 4}"#).unwrap();
        assert_eq!(set.category_id, Some(Some(4)));
    }
}
