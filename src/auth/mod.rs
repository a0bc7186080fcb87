pub mod handlers;
pub mod password;
mod repo;
pub mod repo_types;
pub mod services;
