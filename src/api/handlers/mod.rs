pub mod auth;
pub mod consent;
pub mod health;
pub mod kratos;
pub mod login;
