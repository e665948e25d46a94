pub mod auth;
pub mod chama;
pub mod contribution;
pub mod loan;
pub mod meeting;
pub mod user;
