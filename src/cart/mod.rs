pub mod dto;
pub mod handlers;
mod repo;
pub mod repo_types;
