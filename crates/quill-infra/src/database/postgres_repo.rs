//! PostgreSQL repository implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbConn, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
    TransactionTrait,
};
use uuid::Uuid;

use quill_core::domain::{
    AuthorStats, Category, CommentWithAuthor, Post, PostDetails, PostFilter, PostSummary,
    PostVisibility, Tag, User, mask_email,
};
use quill_core::error::RepoError;
use quill_core::pagination::{Page, PageRequest};
use quill_core::ports::{
    CategoryRepository, CommentRepository, PostRepository, TagRepository, UserRepository,
};

use super::entity::{category, comment, post, post_tag, tag, user};
use super::postgres_base::{PostgresBaseRepository, db_err};

pub type PostgresUserRepository = PostgresBaseRepository<user::Entity>;
pub type PostgresCategoryRepository = PostgresBaseRepository<category::Entity>;
pub type PostgresTagRepository = PostgresBaseRepository<tag::Entity>;
pub type PostgresPostRepository = PostgresBaseRepository<post::Entity>;
pub type PostgresCommentRepository = PostgresBaseRepository<comment::Entity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.conn())
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn all(&self) -> Result<Vec<User>, RepoError> {
        let result = user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .all(self.conn())
            .await
            .map_err(db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn all(&self) -> Result<Vec<Category>, RepoError> {
        let result = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(self.conn())
            .await
            .map_err(db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let result = category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(self.conn())
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn all(&self) -> Result<Vec<Tag>, RepoError> {
        let result = tag::Entity::find()
            .order_by_asc(tag::Column::Name)
            .all(self.conn())
            .await
            .map_err(db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let result = tag::Entity::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(self.conn())
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Tag>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = tag::Entity::find()
            .filter(tag::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(tag::Column::Name)
            .all(self.conn())
            .await
            .map_err(db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, FromQueryResult)]
struct CommentCount {
    post_id: Uuid,
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct LikeTotal {
    total: i64,
}

pub(super) fn apply_filter(mut query: Select<post::Entity>, filter: &PostFilter) -> Select<post::Entity> {
    let published = post::Column::Status.eq(post::Status::Published);
    query = match filter.visibility {
        PostVisibility::PublishedOnly => query.filter(published),
        PostVisibility::PublishedOrOwnedBy(id) => query.filter(
            Condition::any()
                .add(published)
                .add(post::Column::UserId.eq(id)),
        ),
        PostVisibility::OwnedBy(id) => query.filter(post::Column::UserId.eq(id)),
    };

    if let Some(category_id) = filter.category_id {
        query = query.filter(post::Column::CategoryId.eq(category_id));
    }

    if let Some(tag_id) = filter.tag_id {
        query = query.filter(
            post::Column::Id.in_subquery(
                Query::select()
                    .column(post_tag::Column::PostId)
                    .from(post_tag::Entity)
                    .and_where(post_tag::Column::TagId.eq(tag_id))
                    .to_owned(),
            ),
        );
    }

    if let Some(term) = &filter.search {
        let pattern = contains_pattern(term);
        query = query.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(post::Column::Title)))
                        .like(LikeExpr::new(pattern.clone()).escape('\\')),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col(post::Column::Content)))
                        .like(LikeExpr::new(pattern).escape('\\')),
                ),
        );
    }

    query
}

/// Lowercased `%term%` with backslash, `%` and `_` matched literally.
pub(super) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Swap a post's pivot rows for exactly `tag_ids`.
async fn replace_tags(
    txn: &DatabaseTransaction,
    post_id: Uuid,
    tag_ids: &[Uuid],
) -> Result<(), RepoError> {
    post_tag::Entity::delete_many()
        .filter(post_tag::Column::PostId.eq(post_id))
        .exec(txn)
        .await
        .map_err(db_err)?;

    let mut unique = tag_ids.to_vec();
    unique.sort();
    unique.dedup();
    if unique.is_empty() {
        return Ok(());
    }

    let links = unique.into_iter().map(|tag_id| post_tag::ActiveModel {
        post_id: sea_orm::Set(post_id),
        tag_id: sea_orm::Set(tag_id),
    });
    post_tag::Entity::insert_many(links)
        .exec(txn)
        .await
        .map_err(db_err)?;
    Ok(())
}

impl PostgresPostRepository {
    /// Load authors, categories and tags for a page of posts in three queries.
    async fn with_relations(&self, models: Vec<post::Model>) -> Result<Vec<PostDetails>, RepoError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let authors = self.authors_for(&models).await?;
        let categories = self.categories_for(&models).await?;

        let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        let links = post_tag::Entity::find()
            .filter(post_tag::Column::PostId.is_in(post_ids))
            .find_also_related(tag::Entity)
            .all(self.conn())
            .await
            .map_err(db_err)?;
        for (link, tag) in links {
            if let Some(tag) = tag {
                tags.entry(link.post_id).or_default().push(tag.into());
            }
        }

        Ok(models
            .into_iter()
            .filter_map(|model| {
                let Some(author) = authors.get(&model.user_id).cloned() else {
                    tracing::warn!(post_id = %model.id, "Post without author skipped");
                    return None;
                };
                let category = categories.get(&model.category_id).cloned();
                let mut post_tags = tags.remove(&model.id).unwrap_or_default();
                post_tags.sort_by(|a, b| a.name.cmp(&b.name));
                Some(PostDetails {
                    post: model.into(),
                    author,
                    category,
                    tags: post_tags,
                })
            })
            .collect())
    }

    async fn authors_for(&self, models: &[post::Model]) -> Result<HashMap<Uuid, User>, RepoError> {
        let ids: Vec<Uuid> = models.iter().map(|m| m.user_id).collect();
        let users = user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(self.conn())
            .await
            .map_err(db_err)?;

        Ok(users.into_iter().map(|u| (u.id, u.into())).collect())
    }

    async fn categories_for(
        &self,
        models: &[post::Model],
    ) -> Result<HashMap<Uuid, Category>, RepoError> {
        let ids: Vec<Uuid> = models.iter().map(|m| m.category_id).collect();
        let categories = category::Entity::find()
            .filter(category::Column::Id.is_in(ids))
            .all(self.conn())
            .await
            .map_err(db_err)?;

        Ok(categories.into_iter().map(|c| (c.id, c.into())).collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn paginate(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> Result<Page<PostDetails>, RepoError> {
        let paginator = apply_filter(post::Entity::find(), filter)
            .order_by_desc(post::Column::CreatedAt)
            .paginate(self.conn(), page.per_page);

        let total = paginator.num_items().await.map_err(db_err)?;
        let models = paginator.fetch_page(page.page - 1).await.map_err(db_err)?;

        Ok(Page {
            items: self.with_relations(models).await?,
            total,
            request: page,
        })
    }

    async fn find_details(&self, id: Uuid) -> Result<Option<PostDetails>, RepoError> {
        let Some(model) = post::Entity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        Ok(self.with_relations(vec![model]).await?.pop())
    }

    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError> {
        let mut query = post::Entity::find().filter(post::Column::Slug.eq(slug));
        if let Some(id) = except {
            query = query.filter(post::Column::Id.ne(id));
        }

        Ok(query.count(self.conn()).await.map_err(db_err)? > 0)
    }

    async fn save_with_tags(
        &self,
        post: Post,
        tag_ids: Option<&[Uuid]>,
    ) -> Result<Post, RepoError> {
        let txn = self.conn().begin().await.map_err(db_err)?;

        let exists = post::Entity::find_by_id(post.id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .is_some();
        let active: post::ActiveModel = post.into();
        let model = if exists {
            active.update(&txn).await
        } else {
            active.insert(&txn).await
        }
        .map_err(db_err)?;

        if let Some(tag_ids) = tag_ids {
            replace_tags(&txn, model.id, tag_ids).await?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(model.into())
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<(), RepoError> {
        let result = post::Entity::update_many()
            .col_expr(
                post::Column::ViewCount,
                Expr::col(post::Column::ViewCount).add(1),
            )
            .filter(post::Column::Id.eq(id))
            .exec(self.conn())
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn adjust_like_count(&self, id: Uuid, delta: i64) -> Result<i64, RepoError> {
        let expr = if delta >= 0 {
            Expr::col(post::Column::LikeCount).add(delta)
        } else {
            Expr::cust(format!("GREATEST(like_count - {}, 0)", delta.unsigned_abs()))
        };

        let result = post::Entity::update_many()
            .col_expr(post::Column::LikeCount, expr)
            .filter(post::Column::Id.eq(id))
            .exec(self.conn())
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        let post = post::Entity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(db_err)?
            .ok_or(RepoError::NotFound)?;
        Ok(post.like_count)
    }

    async fn paginate_by_author(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostSummary>, RepoError> {
        let paginator = post::Entity::find()
            .filter(post::Column::UserId.eq(user_id))
            .order_by_desc(post::Column::CreatedAt)
            .paginate(self.conn(), page.per_page);

        let total = paginator.num_items().await.map_err(db_err)?;
        let models = paginator.fetch_page(page.page - 1).await.map_err(db_err)?;
        if models.is_empty() {
            return Ok(Page {
                items: Vec::new(),
                total,
                request: page,
            });
        }

        let authors = self.authors_for(&models).await?;
        let categories = self.categories_for(&models).await?;
        let post_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let counts: HashMap<Uuid, u64> = comment::Entity::find()
            .select_only()
            .column(comment::Column::PostId)
            .column_as(comment::Column::Id.count(), "count")
            .filter(comment::Column::PostId.is_in(post_ids))
            .group_by(comment::Column::PostId)
            .into_model::<CommentCount>()
            .all(self.conn())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|c| (c.post_id, c.count.max(0) as u64))
            .collect();

        let items = models
            .into_iter()
            .filter_map(|model| {
                let author = authors.get(&model.user_id).cloned()?;
                Some(PostSummary {
                    category: categories.get(&model.category_id).cloned(),
                    comments_count: counts.get(&model.id).copied().unwrap_or(0),
                    post: model.into(),
                    author,
                })
            })
            .collect();

        Ok(Page {
            items,
            total,
            request: page,
        })
    }

    async fn author_stats(&self, user_id: Uuid) -> Result<AuthorStats, RepoError> {
        let posts = post::Entity::find()
            .filter(post::Column::UserId.eq(user_id))
            .count(self.conn())
            .await
            .map_err(db_err)?;

        let likes = post::Entity::find()
            .select_only()
            .column_as(
                Expr::cust("CAST(COALESCE(SUM(like_count), 0) AS BIGINT)"),
                "total",
            )
            .filter(post::Column::UserId.eq(user_id))
            .into_model::<LikeTotal>()
            .one(self.conn())
            .await
            .map_err(db_err)?
            .map_or(0, |t| t.total);

        let comments = comment::Entity::find()
            .filter(
                comment::Column::PostId.in_subquery(
                    Query::select()
                        .column(post::Column::Id)
                        .from(post::Entity)
                        .and_where(post::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            )
            .count(self.conn())
            .await
            .map_err(db_err)?;

        Ok(AuthorStats {
            posts,
            likes,
            comments,
        })
    }

    async fn all(&self) -> Result<Vec<Post>, RepoError> {
        let result = post::Entity::find()
            .order_by_asc(post::Column::CreatedAt)
            .all(self.conn())
            .await
            .map_err(db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let rows = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .find_also_related(user::Entity)
            .all(self.conn())
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|(comment, author)| {
                Some(CommentWithAuthor {
                    comment: comment.into(),
                    author: author?.into(),
                })
            })
            .collect())
    }

    async fn find_with_author(&self, id: Uuid) -> Result<Option<CommentWithAuthor>, RepoError> {
        let row = comment::Entity::find_by_id(id)
            .find_also_related(user::Entity)
            .one(self.conn())
            .await
            .map_err(db_err)?;

        Ok(row.and_then(|(comment, author)| {
            Some(CommentWithAuthor {
                comment: comment.into(),
                author: author?.into(),
            })
        }))
    }
}

/// Every repository over one shared connection pool.
pub struct PostgresRepositories {
    pub users: PostgresUserRepository,
    pub categories: PostgresCategoryRepository,
    pub tags: PostgresTagRepository,
    pub posts: PostgresPostRepository,
    pub comments: PostgresCommentRepository,
}

impl PostgresRepositories {
    pub fn new(db: DbConn) -> Self {
        let db = Arc::new(db);
        Self {
            users: PostgresBaseRepository::new(Arc::clone(&db)),
            categories: PostgresBaseRepository::new(Arc::clone(&db)),
            tags: PostgresBaseRepository::new(Arc::clone(&db)),
            posts: PostgresBaseRepository::new(Arc::clone(&db)),
            comments: PostgresBaseRepository::new(db),
        }
    }
}
