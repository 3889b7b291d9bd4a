use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::CommunityPost;

pub const MAX_POST_CHARS: usize = 280;
pub const DEFAULT_FEED_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum CommunityError {
    #[error("Post cannot be empty")]
    EmptyPost,
    #[error("Post is too long ({0} characters, max {MAX_POST_CHARS})")]
    TooLong(usize),
    #[error("Post {0} not found or not yours")]
    NotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

pub fn post_message(db: &Database, username: &str, content: &str) -> Result<CommunityPost, CommunityError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CommunityError::EmptyPost);
    }
    let chars = content.chars().count();
    if chars > MAX_POST_CHARS {
        return Err(CommunityError::TooLong(chars));
    }

    let mut post = CommunityPost::new(username.to_string(), content.to_string());
    post.id = Some(db.insert_post(&post)?);
    tracing::debug!(username = %username, id = ?post.id, "community post created");
    Ok(post)
}

pub fn recent_posts(db: &Database, limit: usize) -> Result<Vec<CommunityPost>, CommunityError> {
    Ok(db.get_recent_posts(limit)?)
}

/// Delete a post; only its author may do so
pub fn delete_post(db: &Database, username: &str, id: i64) -> Result<(), CommunityError> {
    if !db.delete_post(id, username)? {
        return Err(CommunityError::NotFound(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_limits_are_in_characters() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(post_message(&db, "ana", "   "), Err(CommunityError::EmptyPost)));
        assert!(post_message(&db, "ana", &"é".repeat(MAX_POST_CHARS)).is_ok());
        assert!(matches!(
            post_message(&db, "ana", &"a".repeat(MAX_POST_CHARS + 1)),
            Err(CommunityError::TooLong(281))
        ));
    }

    #[test]
    fn feed_is_newest_first_and_only_authors_delete() {
        let db = Database::open_in_memory().unwrap();
        let first = post_message(&db, "ana", "first").unwrap();
        post_message(&db, "bob", "second").unwrap();

        let feed = recent_posts(&db, 10).unwrap();
        assert_eq!(feed[0].content, "second");
        assert_eq!(feed[1].content, "first");

        let id = first.id.unwrap();
        assert!(matches!(delete_post(&db, "bob", id), Err(CommunityError::NotFound(_))));
        delete_post(&db, "ana", id).unwrap();
        assert_eq!(recent_posts(&db, 10).unwrap().len(), 1);
    }
}
