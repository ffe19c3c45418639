//! Users command - User management from the command line.

use std::sync::Arc;

use serde_json::json;

use super::{open_store, print_json};
use crate::cli::args::{UsersAction, UsersArgs};
use crate::config::Config;
use crate::domain::{RegisterUser, UserResponse};
use crate::errors::AppResult;
use crate::infra::{KeySpace, UserStore};
use crate::services::{UserManager, UserService};
use crate::types::PageRequest;

/// Execute the users command
pub async fn execute(args: UsersArgs, config: Config, memory: bool) -> AppResult<()> {
    let store = open_store(&config, memory).await?;
    let repo = Arc::new(UserStore::new(store, KeySpace::new(config.key_prefix.clone())));
    let service = UserManager::new(repo);

    match args.action {
        UsersAction::Create {
            email,
            name,
            password_hash,
        } => {
            let request = RegisterUser {
                email,
                password_hash,
                name,
                profile_image: None,
            };
            let user = service.register(request).await?;
            print_json(&UserResponse::from(user))
        }
        UsersAction::Get { id } => {
            let user = service.get_user(&id).await?;
            print_json(&UserResponse::from(user))
        }
        UsersAction::Find { email } => {
            let user = service.get_user_by_email(&email).await?;
            print_json(&UserResponse::from(user))
        }
        UsersAction::List { page, limit } => {
            let request = PageRequest::new(page, limit.unwrap_or(config.default_page_size));
            let users = service.list_users(&request).await?;
            print_json(&users.map(UserResponse::from))
        }
        UsersAction::Delete { id } => {
            service.delete_user(&id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}
