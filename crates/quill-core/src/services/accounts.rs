//! Account signup and credential checks.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::User;
use crate::error::{DomainError, RepoError};
use crate::forms::{self, FormErrors, FormOutcome, REQUIRED, SignupSubmission};
use crate::ports::{BaseRepository, PasswordService};

use super::Repositories;

const MIN_PASSWORD_LEN: usize = 8;
const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[derive(Clone)]
pub struct AccountService {
    repos: Repositories,
    passwords: Arc<dyn PasswordService>,
}

impl AccountService {
    pub fn new(repos: Repositories, passwords: Arc<dyn PasswordService>) -> Self {
        Self { repos, passwords }
    }

    pub async fn signup(&self, submission: &SignupSubmission) -> Result<FormOutcome<User>, DomainError> {
        let mut errors = FormErrors::new();
        let username = submission.username.trim();

        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if !forms::is_valid_username(username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        } else if self.repos.users.find_by_username(username).await?.is_some() {
            errors.add("username", USERNAME_TAKEN);
        }

        if submission.password.is_empty() {
            errors.add("password", REQUIRED);
        } else if submission.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."),
            );
        }

        if !errors.is_empty() {
            return Ok(FormOutcome::Invalid(errors));
        }

        let password_hash = self
            .passwords
            .hash(&submission.password)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        match self
            .repos
            .users
            .create(User::new(username.to_string(), password_hash))
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User registered");
                Ok(FormOutcome::Saved(user))
            }
            Err(RepoError::Constraint(_)) => {
                Ok(FormOutcome::Invalid(FormErrors::single("username", USERNAME_TAKEN)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the account `user_id` still exists.
    pub async fn is_active(&self, user_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.repos.users.find_by_id(user_id).await?.is_some())
    }

    /// The user behind `username` if `password` matches.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, DomainError> {
        let Some(user) = self.repos.users.find_by_username(username.trim()).await? else {
            return Ok(None);
        };

        let valid = self
            .passwords
            .verify(password, &user.password_hash)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        Ok(valid.then_some(user))
    }
}
