//! Content manager implementation.

use std::{collections::BTreeSet, sync::Arc};

use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};

use super::{
    errors::{ContentError, ContentResult},
    models::{
        POST_TITLE_MAX_LEN, Post, PostCreate, PostFilter, PostId, PostUpdate, TERM_NAME_MAX_LEN,
        Term, TermDetail, TermId, TermKind,
    },
};
use crate::{
    auth::{AuthError, User, authorize_mutation},
    db::{UserRepository, now_timestamp, unique_violation},
    pagination::{Page, PageQuery},
};

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.author_id, p.category_id, p.created_at, p.updated_at,
           (SELECT GROUP_CONCAT(pt.tag_id) FROM posts_tags pt WHERE pt.post_id = p.id) AS tag_ids
    FROM posts p
"#;

const POST_FILTER: &str = r#"
    WHERE (?1 IS NULL OR p.category_id = ?1)
      AND (?2 IS NULL OR p.author_id = ?2)
      AND (?3 IS NULL OR EXISTS (
            SELECT 1 FROM posts_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ?3))
"#;

/// Content manager
#[derive(Clone)]
pub struct ContentManager {
    pool: SqlitePool,
    users: Arc<dyn UserRepository>,
}

impl ContentManager {
    /// Create a new content manager
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `users` - User repository, used to rank-check post authors
    pub fn new(pool: SqlitePool, users: Arc<dyn UserRepository>) -> Self {
        Self { pool, users }
    }

    pub async fn list_terms(&self, kind: TermKind) -> ContentResult<Vec<Term>> {
        let rows = sqlx::query(&format!(
            "SELECT id, name FROM {} ORDER BY id",
            kind.table()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(term_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Term plus every post filed under it
    pub async fn get_term(&self, kind: TermKind, id: TermId) -> ContentResult<TermDetail> {
        let row = sqlx::query(&format!(
            "SELECT id, name FROM {} WHERE id = ?1",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ContentError::NotFound(kind.label()))?;
        let term = term_from_row(&row)?;

        let filter = match kind {
            TermKind::Category => PostFilter {
                category_id: Some(id),
                ..Default::default()
            },
            TermKind::Tag => PostFilter {
                tag_id: Some(id),
                ..Default::default()
            },
        };
        let posts = self.fetch_posts(&filter, -1, 0).await?;

        Ok(TermDetail {
            id: term.id,
            name: term.name,
            posts,
        })
    }

    /// Create a term (admin only)
    ///
    /// # Errors
    ///
    /// * `ContentError::DuplicateEntry` - Name already used in this taxonomy
    pub async fn create_term(
        &self,
        actor: &User,
        kind: TermKind,
        name: &str,
    ) -> ContentResult<Term> {
        require_admin(actor)?;
        validate_term_name(name)?;

        let row = sqlx::query(&format!(
            "INSERT INTO {} (name) VALUES (?1) RETURNING id, name",
            kind.table()
        ))
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, kind.label()))?;

        let term = term_from_row(&row)?;
        log::info!("user {} created {} {}", actor.id, kind.label(), term.id);
        Ok(term)
    }

    /// Rename a term (admin only)
    pub async fn rename_term(
        &self,
        actor: &User,
        kind: TermKind,
        id: TermId,
        name: &str,
    ) -> ContentResult<Term> {
        require_admin(actor)?;
        validate_term_name(name)?;

        let row = sqlx::query(&format!(
            "UPDATE {} SET name = ?2 WHERE id = ?1 RETURNING id, name",
            kind.table()
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, kind.label()))?
        .ok_or(ContentError::NotFound(kind.label()))?;

        Ok(term_from_row(&row)?)
    }

    /// Delete a term (admin only)
    ///
    /// Posts in a deleted category become uncategorised; a deleted tag is
    /// removed from every post.
    pub async fn delete_term(&self, actor: &User, kind: TermKind, id: TermId) -> ContentResult<()> {
        require_admin(actor)?;

        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?1", kind.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ContentError::NotFound(kind.label()));
        }
        log::info!("user {} deleted {} {}", actor.id, kind.label(), id);
        Ok(())
    }

    pub async fn list_posts(
        &self,
        filter: &PostFilter,
        query: &PageQuery,
    ) -> ContentResult<Page<Post>> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM posts p {POST_FILTER}"))
            .bind(filter.category_id)
            .bind(filter.author_id)
            .bind(filter.tag_id)
            .fetch_one(&self.pool)
            .await?;

        let posts = self
            .fetch_posts(filter, query.limit(), query.offset())
            .await?;
        Ok(Page::new(posts, total, query))
    }

    pub async fn get_post(&self, id: PostId) -> ContentResult<Post> {
        let row = sqlx::query(&format!("{POST_SELECT} WHERE p.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ContentError::NotFound("Post"))?;

        Ok(post_from_row(&row)?)
    }

    /// Create a post authored by `author`
    ///
    /// # Errors
    ///
    /// * `ContentError::NotFound` - Referenced category or tag does not exist
    /// * `ContentError::DuplicateEntry` - Title already used
    pub async fn create_post(&self, author: &User, request: PostCreate) -> ContentResult<Post> {
        validate_title(&request.title)?;

        let mut tx = self.pool.begin().await?;
        if let Some(category_id) = request.category_id {
            ensure_term_exists(&mut tx, TermKind::Category, category_id).await?;
        }

        let now = now_timestamp();
        let post_id: PostId = sqlx::query_scalar(
            r#"
            INSERT INTO posts (title, content, author_id, category_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING id
            "#,
        )
        .bind(&request.title)
        .bind(&request.content)
        .bind(author.id)
        .bind(request.category_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "Post"))?;

        attach_tags(&mut tx, post_id, &request.tag_ids).await?;
        tx.commit().await?;

        log::info!("user {} created post {}", author.id, post_id);
        self.get_post(post_id).await
    }

    /// Update a post; only its author or a strictly higher-ranked admin may
    pub async fn update_post(
        &self,
        actor: &User,
        id: PostId,
        update: PostUpdate,
    ) -> ContentResult<Post> {
        let post = self.get_post(id).await?;
        authorize_mutation(self.users.as_ref(), actor, post.author_id).await?;
        if let Some(title) = &update.title {
            validate_title(title)?;
        }

        let mut tx = self.pool.begin().await?;
        if let Some(Some(category_id)) = update.category_id {
            ensure_term_exists(&mut tx, TermKind::Category, category_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE posts SET
                title = COALESCE(?2, title),
                content = COALESCE(?3, content),
                category_id = CASE WHEN ?4 THEN ?5 ELSE category_id END,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.title.as_deref())
        .bind(update.content.as_deref())
        .bind(update.category_id.is_some())
        .bind(update.category_id.flatten())
        .bind(now_timestamp())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "Post"))?;

        if let Some(tag_ids) = &update.tag_ids {
            sqlx::query("DELETE FROM posts_tags WHERE post_id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            attach_tags(&mut tx, id, tag_ids).await?;
        }
        tx.commit().await?;

        self.get_post(id).await
    }

    /// Delete a post; same ownership rule as [`update_post`](Self::update_post)
    pub async fn delete_post(&self, actor: &User, id: PostId) -> ContentResult<()> {
        let post = self.get_post(id).await?;
        authorize_mutation(self.users.as_ref(), actor, post.author_id).await?;

        sqlx::query("DELETE FROM posts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        log::info!("user {} deleted post {}", actor.id, id);
        Ok(())
    }

    /// `limit` of -1 means unbounded
    async fn fetch_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> ContentResult<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "{POST_SELECT} {POST_FILTER} ORDER BY p.id LIMIT ?4 OFFSET ?5"
        ))
        .bind(filter.category_id)
        .bind(filter.author_id)
        .bind(filter.tag_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

fn require_admin(actor: &User) -> ContentResult<()> {
    if actor.power.is_admin() {
        Ok(())
    } else {
        log::warn!("user {} ({}) denied taxonomy change", actor.id, actor.power);
        Err(AuthError::PermissionDenied.into())
    }
}

fn validate_term_name(name: &str) -> ContentResult<()> {
    let len = name.trim().chars().count();
    if len == 0 || name.chars().count() > TERM_NAME_MAX_LEN {
        return Err(ContentError::Validation {
            field: "name",
            reason: format!("must be 1-{TERM_NAME_MAX_LEN} characters"),
        });
    }
    Ok(())
}

fn validate_title(title: &str) -> ContentResult<()> {
    let len = title.trim().chars().count();
    if len == 0 || title.chars().count() > POST_TITLE_MAX_LEN {
        return Err(ContentError::Validation {
            field: "title",
            reason: format!("must be 1-{POST_TITLE_MAX_LEN} characters"),
        });
    }
    Ok(())
}

fn map_write_error(err: sqlx::Error, label: &'static str) -> ContentError {
    if unique_violation(&err).is_some() {
        ContentError::DuplicateEntry(label)
    } else {
        ContentError::Database(err)
    }
}

async fn ensure_term_exists(
    conn: &mut SqliteConnection,
    kind: TermKind,
    id: TermId,
) -> ContentResult<()> {
    sqlx::query(&format!("SELECT 1 FROM {} WHERE id = ?1", kind.table()))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(|_| ())
        .ok_or(ContentError::NotFound(kind.label()))
}

async fn attach_tags(
    conn: &mut SqliteConnection,
    post_id: PostId,
    tag_ids: &[TermId],
) -> ContentResult<()> {
    let unique: BTreeSet<TermId> = tag_ids.iter().copied().collect();
    for tag_id in unique {
        ensure_term_exists(conn, TermKind::Tag, tag_id).await?;
        sqlx::query("INSERT INTO posts_tags (post_id, tag_id) VALUES (?1, ?2)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn term_from_row(row: &SqliteRow) -> Result<Term, sqlx::Error> {
    Ok(Term {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

fn post_from_row(row: &SqliteRow) -> Result<Post, sqlx::Error> {
    let joined: Option<String> = row.try_get("tag_ids")?;
    let mut tag_ids: Vec<TermId> = joined
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect();
    tag_ids.sort_unstable();

    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        author_id: row.try_get("author_id")?,
        category_id: row.try_get("category_id")?,
        tag_ids,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Power;
    use crate::db::{Database, NewUser, SqlUserRepository};

    struct Fixture {
        content: ContentManager,
        admin: User,
        alice: User,
        bob: User,
    }

    async fn fixture() -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let repo = Arc::new(SqlUserRepository::new(db.pool().clone()));

        let mut users = Vec::new();
        for (name, power) in [
            ("admin", Power::Admin),
            ("alice", Power::Normal),
            ("bob", Power::Normal),
        ] {
            let user = repo
                .create_user(&NewUser {
                    username: name.to_string(),
                    email: format!("{name}@seek2.team"),
                    hashed_password: "unused".to_string(),
                    power,
                })
                .await
                .unwrap();
            users.push(user);
        }
        let mut users = users.into_iter();

        Fixture {
            content: ContentManager::new(db.pool().clone(), repo),
            admin: users.next().unwrap(),
            alice: users.next().unwrap(),
            bob: users.next().unwrap(),
        }
    }

    fn post(title: &str, category_id: Option<TermId>, tag_ids: Vec<TermId>) -> PostCreate {
        PostCreate {
            title: title.to_string(),
            content: format!("body of {title}"),
            category_id,
            tag_ids,
        }
    }

    #[tokio::test]
    async fn test_term_crud_requires_admin() {
        let f = fixture().await;

        let err = f
            .content
            .create_term(&f.alice, TermKind::Tag, "rust")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Auth(AuthError::PermissionDenied)));

        let tag = f
            .content
            .create_term(&f.admin, TermKind::Tag, "rust")
            .await
            .unwrap();
        let renamed = f
            .content
            .rename_term(&f.admin, TermKind::Tag, tag.id, "rustlang")
            .await
            .unwrap();
        assert_eq!(renamed.name, "rustlang");

        f.content
            .delete_term(&f.admin, TermKind::Tag, tag.id)
            .await
            .unwrap();
        assert!(matches!(
            f.content.delete_term(&f.admin, TermKind::Tag, tag.id).await,
            Err(ContentError::NotFound("Tag"))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_term_names() {
        let f = fixture().await;
        f.content
            .create_term(&f.admin, TermKind::Category, "news")
            .await
            .unwrap();

        assert!(matches!(
            f.content
                .create_term(&f.admin, TermKind::Category, "news")
                .await,
            Err(ContentError::DuplicateEntry("Category"))
        ));
        // Same name in the other taxonomy is fine.
        assert!(
            f.content
                .create_term(&f.admin, TermKind::Tag, "news")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_term_name_length() {
        let f = fixture().await;
        assert!(matches!(
            f.content
                .create_term(&f.admin, TermKind::Tag, "elevenchars")
                .await,
            Err(ContentError::Validation { field: "name", .. })
        ));
        assert!(matches!(
            f.content.create_term(&f.admin, TermKind::Tag, "  ").await,
            Err(ContentError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_post_with_category_and_tags() {
        let f = fixture().await;
        let category = f
            .content
            .create_term(&f.admin, TermKind::Category, "news")
            .await
            .unwrap();
        let t1 = f
            .content
            .create_term(&f.admin, TermKind::Tag, "a")
            .await
            .unwrap();
        let t2 = f
            .content
            .create_term(&f.admin, TermKind::Tag, "b")
            .await
            .unwrap();

        let created = f
            .content
            .create_post(&f.alice, post("hello", Some(category.id), vec![t2.id, t1.id, t2.id]))
            .await
            .unwrap();
        assert_eq!(created.author_id, f.alice.id);
        assert_eq!(created.category_id, Some(category.id));
        assert_eq!(created.tag_ids, vec![t1.id, t2.id]);

        let detail = f
            .content
            .get_term(TermKind::Tag, t1.id)
            .await
            .unwrap();
        assert_eq!(detail.posts.len(), 1);
        assert_eq!(detail.posts[0].id, created.id);
    }

    #[tokio::test]
    async fn test_create_post_rejects_unknown_references() {
        let f = fixture().await;
        assert!(matches!(
            f.content
                .create_post(&f.alice, post("hello", Some(42), vec![]))
                .await,
            Err(ContentError::NotFound("Category"))
        ));
        assert!(matches!(
            f.content
                .create_post(&f.alice, post("hello", None, vec![7]))
                .await,
            Err(ContentError::NotFound("Tag"))
        ));
        // Nothing was left behind by the rolled back transaction.
        let page = f
            .content
            .list_posts(&PostFilter::default(), &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total, 0);
    }

    #[tokio::test]
    async fn test_duplicate_post_title() {
        let f = fixture().await;
        f.content
            .create_post(&f.alice, post("hello", None, vec![]))
            .await
            .unwrap();
        assert!(matches!(
            f.content
                .create_post(&f.bob, post("hello", None, vec![]))
                .await,
            Err(ContentError::DuplicateEntry("Post"))
        ));
    }

    #[tokio::test]
    async fn test_post_ownership() {
        let f = fixture().await;
        let created = f
            .content
            .create_post(&f.alice, post("hello", None, vec![]))
            .await
            .unwrap();

        let update = PostUpdate {
            content: Some("edited".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            f.content.update_post(&f.bob, created.id, update.clone()).await,
            Err(ContentError::Auth(AuthError::PermissionDenied))
        ));

        let updated = f
            .content
            .update_post(&f.alice, created.id, update.clone())
            .await
            .unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.title, "hello");

        // Admins outrank normal authors.
        assert!(
            f.content
                .update_post(&f.admin, created.id, update)
                .await
                .is_ok()
        );
        assert!(matches!(
            f.content.delete_post(&f.bob, created.id).await,
            Err(ContentError::Auth(AuthError::PermissionDenied))
        ));
        f.content.delete_post(&f.admin, created.id).await.unwrap();
        assert!(matches!(
            f.content.get_post(created.id).await,
            Err(ContentError::NotFound("Post"))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_tags() {
        let f = fixture().await;
        let t1 = f
            .content
            .create_term(&f.admin, TermKind::Tag, "a")
            .await
            .unwrap();
        let t2 = f
            .content
            .create_term(&f.admin, TermKind::Tag, "b")
            .await
            .unwrap();
        let created = f
            .content
            .create_post(&f.alice, post("hello", None, vec![t1.id]))
            .await
            .unwrap();

        let update = PostUpdate {
            tag_ids: Some(vec![t2.id]),
            ..Default::default()
        };
        let updated = f
            .content
            .update_post(&f.alice, created.id, update)
            .await
            .unwrap();
        assert_eq!(updated.tag_ids, vec![t2.id]);
    }

    #[tokio::test]
    async fn test_update_sets_and_clears_category() {
        let f = fixture().await;
        let news = f
            .content
            .create_term(&f.admin, TermKind::Category, "news")
            .await
            .unwrap();
        let created = f
            .content
            .create_post(&f.alice, post("hello", Some(news.id), vec![]))
            .await
            .unwrap();

        // Leaving the field out keeps the category.
        let retitled = f
            .content
            .update_post(
                &f.alice,
                created.id,
                PostUpdate {
                    title: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(retitled.category_id, Some(news.id));

        let cleared = f
            .content
            .update_post(
                &f.alice,
                created.id,
                PostUpdate {
                    category_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.category_id, None);

        assert!(matches!(
            f.content
                .update_post(
                    &f.alice,
                    created.id,
                    PostUpdate {
                        category_id: Some(Some(9_999)),
                        ..Default::default()
                    },
                )
                .await,
            Err(ContentError::NotFound("Category"))
        ));
    }

    #[tokio::test]
    async fn test_deleting_category_uncategorises_posts() {
        let f = fixture().await;
        let category = f
            .content
            .create_term(&f.admin, TermKind::Category, "news")
            .await
            .unwrap();
        let created = f
            .content
            .create_post(&f.alice, post("hello", Some(category.id), vec![]))
            .await
            .unwrap();

        f.content
            .delete_term(&f.admin, TermKind::Category, category.id)
            .await
            .unwrap();
        let reloaded = f.content.get_post(created.id).await.unwrap();
        assert_eq!(reloaded.category_id, None);
    }

    #[tokio::test]
    async fn test_list_posts_filters_and_paginates() {
        let f = fixture().await;
        let tag = f
            .content
            .create_term(&f.admin, TermKind::Tag, "a")
            .await
            .unwrap();
        for i in 0..3 {
            f.content
                .create_post(&f.alice, post(&format!("alice {i}"), None, vec![tag.id]))
                .await
                .unwrap();
        }
        f.content
            .create_post(&f.bob, post("bob 0", None, vec![]))
            .await
            .unwrap();

        let by_alice = PostFilter {
            author_id: Some(f.alice.id),
            ..Default::default()
        };
        let page = f
            .content
            .list_posts(&by_alice, &PageQuery::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].title, "alice 2");

        let by_tag = PostFilter {
            tag_id: Some(tag.id),
            ..Default::default()
        };
        let page = f
            .content
            .list_posts(&by_tag, &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total, 3);

        let all = f
            .content
            .list_posts(&PostFilter::default(), &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(all.meta.total, 4);
    }
}
