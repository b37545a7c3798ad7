pub mod config;
pub mod entities;
pub mod fixtures;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;
pub use routes::api_router;
