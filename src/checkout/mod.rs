pub mod dto;
pub mod gateway;
pub mod handlers;
