use super::GitLabClient;
use crate::error::{LabError, Result};
use crate::gitlab::types::User;

impl GitLabClient {
    pub async fn user_id(&self, username: &str) -> Result<u64> {
        let username = username.trim_start_matches('@');
        let query = [("username", username.to_string())];
        let users: Vec<User> = self.get_with_query(self.endpoint("users")?, &query).await?;
        users
            .into_iter()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .map(|user| user.id)
            .ok_or_else(|| LabError::NotFound(format!("user '{username}'")))
    }
}
