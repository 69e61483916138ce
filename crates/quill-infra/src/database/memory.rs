//! In-memory repositories - used when no database is configured and as test doubles.
//!
//! All repositories share one set of tables behind a single lock, so
//! cascades (post -> comments, user -> posts) behave like the SQL schema.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{
    AuthorStats, Category, Comment, CommentWithAuthor, Post, PostDetails, PostFilter,
    PostSummary, Tag, User,
};
use quill_core::error::RepoError;
use quill_core::pagination::{Page, PageRequest};
use quill_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, PostRepository, TagRepository,
    UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    tags: HashMap<Uuid, Tag>,
    posts: HashMap<Uuid, Post>,
    post_tags: HashMap<Uuid, Vec<Uuid>>,
    comments: HashMap<Uuid, Comment>,
}

impl Tables {
    fn tags_of(&self, post_id: Uuid) -> &[Uuid] {
        self.post_tags.get(&post_id).map_or(&[], Vec::as_slice)
    }

    fn details(&self, post: &Post) -> Option<PostDetails> {
        let author = self.users.get(&post.user_id)?.clone();
        let mut tags: Vec<Tag> = self
            .tags_of(post.id)
            .iter()
            .filter_map(|id| self.tags.get(id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Some(PostDetails {
            post: post.clone(),
            author,
            category: self.categories.get(&post.category_id).cloned(),
            tags,
        })
    }

    fn newest_first<'a>(&'a self, keep: impl Fn(&Post) -> bool) -> Vec<&'a Post> {
        let mut posts: Vec<&Post> = self.posts.values().filter(|&p| keep(p)).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    fn remove_comment_tree(&mut self, id: Uuid) {
        self.comments.remove(&id);
        let replies: Vec<Uuid> = self
            .comments
            .values()
            .filter(|c| c.parent_id == Some(id))
            .map(|c| c.id)
            .collect();
        for reply in replies {
            self.remove_comment_tree(reply);
        }
    }

    fn put_post(&mut self, post: Post) -> Result<Post, RepoError> {
        if self
            .posts
            .values()
            .any(|p| p.id != post.id && p.slug == post.slug)
        {
            return Err(constraint("posts_slug_key"));
        }
        if !self.users.contains_key(&post.user_id)
            || !self.categories.contains_key(&post.category_id)
        {
            return Err(RepoError::Constraint(
                "insert or update on table \"posts\" violates foreign key constraint".into(),
            ));
        }
        self.posts.insert(post.id, post.clone());
        Ok(post)
    }

    /// Unknown tag ids are dropped, as the pivot's foreign key would.
    fn link_tags(&mut self, post_id: Uuid, tag_ids: &[Uuid]) {
        let mut links: Vec<Uuid> = tag_ids
            .iter()
            .copied()
            .filter(|id| self.tags.contains_key(id))
            .collect();
        links.sort();
        links.dedup();
        self.post_tags.insert(post_id, links);
    }

    fn remove_post(&mut self, id: Uuid) {
        self.posts.remove(&id);
        self.post_tags.remove(&id);
        self.comments.retain(|_, c| c.post_id != id);
    }
}

type Shared = Arc<RwLock<Tables>>;

fn constraint(what: &str) -> RepoError {
    RepoError::Constraint(format!("duplicate key value violates unique constraint \"{what}\""))
}

/// One repository per aggregate over a shared set of tables.
pub struct InMemoryRepositories {
    pub users: InMemoryUserRepository,
    pub categories: InMemoryCategoryRepository,
    pub tags: InMemoryTagRepository,
    pub posts: InMemoryPostRepository,
    pub comments: InMemoryCommentRepository,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        let tables: Shared = Arc::default();
        Self {
            users: InMemoryUserRepository(tables.clone()),
            categories: InMemoryCategoryRepository(tables.clone()),
            tags: InMemoryTagRepository(tables.clone()),
            posts: InMemoryPostRepository(tables.clone()),
            comments: InMemoryCommentRepository(tables),
        }
    }
}

impl Default for InMemoryRepositories {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemoryUserRepository(Shared);
pub struct InMemoryCategoryRepository(Shared);
pub struct InMemoryTagRepository(Shared);
pub struct InMemoryPostRepository(Shared);
pub struct InMemoryCommentRepository(Shared);

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.0.read().await.users.get(&id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.0.write().await;
        let clash = tables.users.values().find(|u| {
            u.id != user.id && (u.email == user.email || u.username == user.username)
        });
        if let Some(other) = clash {
            let key = if other.email == user.email {
                "users_email_key"
            } else {
                "users_username_key"
            };
            return Err(constraint(key));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.0.write().await;
        tables.users.remove(&id).ok_or(RepoError::NotFound)?;
        let owned: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for post in owned {
            tables.remove_post(post);
        }
        let comments: Vec<Uuid> = tables
            .comments
            .values()
            .filter(|c| c.user_id == id)
            .map(|c| c.id)
            .collect();
        for comment in comments {
            tables.remove_comment_tree(comment);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.0.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.0.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn all(&self) -> Result<Vec<User>, RepoError> {
        let mut users: Vec<User> = self.0.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl BaseRepository<Category, Uuid> for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        Ok(self.0.read().await.categories.get(&id).cloned())
    }

    async fn save(&self, category: Category) -> Result<Category, RepoError> {
        let mut tables = self.0.write().await;
        if tables
            .categories
            .values()
            .any(|c| c.id != category.id && c.slug == category.slug)
        {
            return Err(constraint("categories_slug_key"));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.0.write().await;
        tables.categories.remove(&id).ok_or(RepoError::NotFound)?;
        let posts: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.category_id == id)
            .map(|p| p.id)
            .collect();
        for post in posts {
            tables.remove_post(post);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn all(&self) -> Result<Vec<Category>, RepoError> {
        let mut categories: Vec<Category> =
            self.0.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let tables = self.0.read().await;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }
}

#[async_trait]
impl BaseRepository<Tag, Uuid> for InMemoryTagRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tag>, RepoError> {
        Ok(self.0.read().await.tags.get(&id).cloned())
    }

    async fn save(&self, tag: Tag) -> Result<Tag, RepoError> {
        let mut tables = self.0.write().await;
        if tables.tags.values().any(|t| t.id != tag.id && t.slug == tag.slug) {
            return Err(constraint("tags_slug_key"));
        }
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.0.write().await;
        tables.tags.remove(&id).ok_or(RepoError::NotFound)?;
        for links in tables.post_tags.values_mut() {
            links.retain(|t| *t != id);
        }
        Ok(())
    }
}

#[async_trait]
impl TagRepository for InMemoryTagRepository {
    async fn all(&self) -> Result<Vec<Tag>, RepoError> {
        let mut tags: Vec<Tag> = self.0.read().await.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let tables = self.0.read().await;
        Ok(tables.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Tag>, RepoError> {
        let tables = self.0.read().await;
        let mut tags: Vec<Tag> = ids
            .iter()
            .filter_map(|id| tables.tags.get(id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags.dedup_by_key(|t| t.id);
        Ok(tags)
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.0.read().await.posts.get(&id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        self.0.write().await.put_post(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.0.write().await;
        if !tables.posts.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        tables.remove_post(id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn paginate(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> Result<Page<PostDetails>, RepoError> {
        let tables = self.0.read().await;
        let matching: Vec<PostDetails> = tables
            .newest_first(|p| filter.matches(p, tables.tags_of(p.id)))
            .into_iter()
            .filter_map(|p| tables.details(p))
            .collect();

        Ok(Page::from_vec(matching, page))
    }

    async fn find_details(&self, id: Uuid) -> Result<Option<PostDetails>, RepoError> {
        let tables = self.0.read().await;
        Ok(tables.posts.get(&id).and_then(|p| tables.details(p)))
    }

    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError> {
        let tables = self.0.read().await;
        Ok(tables
            .posts
            .values()
            .any(|p| p.slug == slug && Some(p.id) != except))
    }

    async fn save_with_tags(
        &self,
        post: Post,
        tag_ids: Option<&[Uuid]>,
    ) -> Result<Post, RepoError> {
        let mut tables = self.0.write().await;
        let saved = tables.put_post(post)?;
        if let Some(tag_ids) = tag_ids {
            tables.link_tags(saved.id, tag_ids);
        }
        Ok(saved)
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.0.write().await;
        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.view_count += 1;
        Ok(())
    }

    async fn adjust_like_count(&self, id: Uuid, delta: i64) -> Result<i64, RepoError> {
        let mut tables = self.0.write().await;
        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.like_count = (post.like_count + delta).max(0);
        Ok(post.like_count)
    }

    async fn paginate_by_author(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostSummary>, RepoError> {
        let tables = self.0.read().await;
        let Some(author) = tables.users.get(&user_id) else {
            return Ok(Page::from_vec(Vec::new(), page));
        };

        let summaries: Vec<PostSummary> = tables
            .newest_first(|p| p.user_id == user_id)
            .into_iter()
            .map(|p| PostSummary {
                post: p.clone(),
                author: author.clone(),
                category: tables.categories.get(&p.category_id).cloned(),
                comments_count: tables.comments.values().filter(|c| c.post_id == p.id).count()
                    as u64,
            })
            .collect();

        Ok(Page::from_vec(summaries, page))
    }

    async fn author_stats(&self, user_id: Uuid) -> Result<AuthorStats, RepoError> {
        let tables = self.0.read().await;
        let posts: Vec<&Post> = tables.posts.values().filter(|p| p.user_id == user_id).collect();
        let comments = tables
            .comments
            .values()
            .filter(|c| posts.iter().any(|p| p.id == c.post_id))
            .count();

        Ok(AuthorStats {
            posts: posts.len() as u64,
            likes: posts.iter().map(|p| p.like_count).sum(),
            comments: comments as u64,
        })
    }

    async fn all(&self) -> Result<Vec<Post>, RepoError> {
        let mut posts: Vec<Post> = self.0.read().await.posts.values().cloned().collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(posts)
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.0.read().await.comments.get(&id).cloned())
    }

    async fn save(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.0.write().await;
        let parent_ok = comment
            .parent_id
            .is_none_or(|parent| tables.comments.contains_key(&parent));
        if !tables.posts.contains_key(&comment.post_id)
            || !tables.users.contains_key(&comment.user_id)
            || !parent_ok
        {
            return Err(RepoError::Constraint(
                "insert or update on table \"comments\" violates foreign key constraint".into(),
            ));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.0.write().await;
        if !tables.comments.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        tables.remove_comment_tree(id);
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let tables = self.0.read().await;
        let mut comments: Vec<CommentWithAuthor> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                Some(CommentWithAuthor {
                    comment: c.clone(),
                    author: tables.users.get(&c.user_id)?.clone(),
                })
            })
            .collect();
        comments.sort_by(|a, b| a.comment.created_at.cmp(&b.comment.created_at));
        Ok(comments)
    }

    async fn find_with_author(&self, id: Uuid) -> Result<Option<CommentWithAuthor>, RepoError> {
        let tables = self.0.read().await;
        Ok(tables.comments.get(&id).and_then(|c| {
            Some(CommentWithAuthor {
                comment: c.clone(),
                author: tables.users.get(&c.user_id)?.clone(),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use quill_core::domain::{PostChanges, PostStatus, PostVisibility};

    use super::*;

    struct Fixture {
        repos: InMemoryRepositories,
        author: User,
        category: Category,
    }

    async fn fixture() -> Fixture {
        let repos = InMemoryRepositories::new();
        let author = repos
            .users
            .save(User::new("Ada".into(), "ada".into(), "ada@x.io".into(), "h".into()))
            .await
            .unwrap();
        let category = repos
            .categories
            .save(Category::new("Technology", None))
            .await
            .unwrap();
        Fixture {
            repos,
            author,
            category,
        }
    }

    fn post(f: &Fixture, title: &str, status: PostStatus, minutes_ago: i64) -> Post {
        let mut post = Post::new(
            f.author.id,
            PostChanges {
                title: title.into(),
                content: format!("{title} body"),
                category_id: f.category.id,
                status,
                tags: None,
            },
            quill_core::slug::slugify(title),
        );
        post.created_at = Utc::now() - Duration::minutes(minutes_ago);
        post
    }

    #[tokio::test]
    async fn duplicate_email_is_a_constraint_violation() {
        let f = fixture().await;
        let clash = User::new("Other".into(), "other".into(), "ada@x.io".into(), "h".into());

        assert!(matches!(
            f.repos.users.save(clash).await,
            Err(RepoError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn paginate_filters_and_orders_newest_first() {
        let f = fixture().await;
        let old = f.repos.posts.save(post(&f, "Old", PostStatus::Published, 30)).await.unwrap();
        let new = f.repos.posts.save(post(&f, "New", PostStatus::Published, 1)).await.unwrap();
        f.repos.posts.save(post(&f, "Hidden", PostStatus::Draft, 5)).await.unwrap();

        let page = f
            .repos
            .posts
            .paginate(
                &PostFilter::new(PostVisibility::PublishedOnly),
                PageRequest::default(),
            )
            .await
            .unwrap();

        let ids: Vec<Uuid> = page.items.iter().map(|d| d.post.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].author.id, f.author.id);
    }

    #[tokio::test]
    async fn saving_with_tags_replaces_links_and_tag_filter_uses_them() {
        let f = fixture().await;
        let rust = f.repos.tags.save(Tag::new("Rust")).await.unwrap();
        let web = f.repos.tags.save(Tag::new("Web")).await.unwrap();
        let p = post(&f, "Tagged", PostStatus::Published, 1);

        let p = f
            .repos
            .posts
            .save_with_tags(p, Some(&[rust.id, web.id, rust.id, Uuid::new_v4()][..]))
            .await
            .unwrap();
        assert_eq!(f.repos.posts.find_details(p.id).await.unwrap().unwrap().tags.len(), 2);

        let p = f.repos.posts.save_with_tags(p, Some(&[web.id][..])).await.unwrap();
        let p = f.repos.posts.save_with_tags(p, None).await.unwrap();

        let details = f.repos.posts.find_details(p.id).await.unwrap().unwrap();
        assert_eq!(details.tags, vec![web.clone()]);

        let mut filter = PostFilter::new(PostVisibility::PublishedOnly);
        filter.tag_id = Some(rust.id);
        let page = f.repos.posts.paginate(&filter, PageRequest::default()).await.unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn rejected_save_leaves_tag_links_alone() {
        let f = fixture().await;
        let rust = f.repos.tags.save(Tag::new("Rust")).await.unwrap();
        let first = post(&f, "Same title", PostStatus::Published, 2);
        f.repos.posts.save_with_tags(first.clone(), Some(&[rust.id][..])).await.unwrap();

        let mut clash = post(&f, "Other", PostStatus::Published, 1);
        clash.slug = first.slug.clone();
        assert!(matches!(
            f.repos.posts.save_with_tags(clash.clone(), Some(&[rust.id][..])).await,
            Err(RepoError::Constraint(_))
        ));

        assert!(f.repos.posts.find_by_id(clash.id).await.unwrap().is_none());
        let mut filter = PostFilter::new(PostVisibility::PublishedOnly);
        filter.tag_id = Some(rust.id);
        let page = f.repos.posts.paginate(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn like_count_never_goes_negative() {
        let f = fixture().await;
        let p = f.repos.posts.save(post(&f, "Likes", PostStatus::Published, 1)).await.unwrap();

        assert_eq!(f.repos.posts.adjust_like_count(p.id, 1).await.unwrap(), 1);
        assert_eq!(f.repos.posts.adjust_like_count(p.id, -1).await.unwrap(), 0);
        assert_eq!(f.repos.posts.adjust_like_count(p.id, -1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_comments() {
        let f = fixture().await;
        let p = f.repos.posts.save(post(&f, "Doomed", PostStatus::Published, 1)).await.unwrap();
        let root = f
            .repos
            .comments
            .save(Comment::new(p.id, f.author.id, None, "root".into()))
            .await
            .unwrap();
        f.repos
            .comments
            .save(Comment::new(p.id, f.author.id, Some(root.id), "reply".into()))
            .await
            .unwrap();

        f.repos.posts.delete(p.id).await.unwrap();

        assert!(f.repos.comments.for_post(p.id).await.unwrap().is_empty());
        assert!(f.repos.comments.find_by_id(root.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_root_comment_removes_replies() {
        let f = fixture().await;
        let p = f.repos.posts.save(post(&f, "Thread", PostStatus::Published, 1)).await.unwrap();
        let root = f
            .repos
            .comments
            .save(Comment::new(p.id, f.author.id, None, "root".into()))
            .await
            .unwrap();
        let reply = f
            .repos
            .comments
            .save(Comment::new(p.id, f.author.id, Some(root.id), "reply".into()))
            .await
            .unwrap();

        f.repos.comments.delete(root.id).await.unwrap();

        assert!(f.repos.comments.find_by_id(reply.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn author_stats_sum_across_posts() {
        let f = fixture().await;
        let a = f.repos.posts.save(post(&f, "A", PostStatus::Published, 2)).await.unwrap();
        let b = f.repos.posts.save(post(&f, "B", PostStatus::Draft, 1)).await.unwrap();
        f.repos.posts.adjust_like_count(a.id, 3).await.unwrap();
        f.repos.posts.adjust_like_count(b.id, 2).await.unwrap();
        f.repos
            .comments
            .save(Comment::new(a.id, f.author.id, None, "hi".into()))
            .await
            .unwrap();

        let stats = f.repos.posts.author_stats(f.author.id).await.unwrap();

        assert_eq!(
            stats,
            AuthorStats {
                posts: 2,
                likes: 5,
                comments: 1
            }
        );

        let summaries = f
            .repos
            .posts
            .paginate_by_author(f.author.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(summaries.items[0].post.id, b.id);
        assert_eq!(summaries.items[1].comments_count, 1);
    }
}
