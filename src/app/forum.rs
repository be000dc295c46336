use crate::client::dto::{CommentPublic, PageQuery, PostCreate, PostPublic, PostPublicWithComments};
use crate::client::{ApiClient, ClientResult};

/// Client-side copy of the forum list
///
/// Writes go to the backend first and the list is refetched afterwards,
/// so the board always shows what the server has.
pub struct ForumBoard {
    client: ApiClient,
    page: PageQuery,
    posts: Vec<PostPublic>,
}

impl ForumBoard {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            page: PageQuery::default(),
            posts: Vec::new(),
        }
    }

    pub fn with_page(mut self, page: PageQuery) -> Self {
        self.page = page;
        self
    }

    pub fn posts(&self) -> &[PostPublic] {
        &self.posts
    }

    pub async fn load(&mut self) -> ClientResult<&[PostPublic]> {
        self.posts = self.client.list_posts(self.page).await?;
        tracing::debug!(count = self.posts.len(), page = self.page.page, "Forum loaded");
        Ok(&self.posts)
    }

    /// Publish a post, then refetch the list
    pub async fn create(&mut self, post: PostCreate) -> ClientResult<PostPublicWithComments> {
        let created = self.client.create_post(&post).await?;
        tracing::info!(post_id = created.id, "Post created");
        self.load().await?;
        Ok(created)
    }

    pub async fn open(&self, id: i64) -> ClientResult<PostPublicWithComments> {
        self.client.get_post(id).await
    }

    /// Add a comment and refetch so the reply count stays current
    pub async fn comment(&mut self, post_id: i64, text: &str) -> ClientResult<CommentPublic> {
        let comment = self.client.add_comment(post_id, text).await?;
        self.load().await?;
        Ok(comment)
    }
}
