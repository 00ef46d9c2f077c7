pub mod app_config;
pub mod catalog_client;
pub mod database;
pub mod identity_client;
pub mod order_repo;
pub mod redis_repo;
pub mod resiliency;

pub use catalog_client::HttpFlightCatalog;
pub use database::DbClient;
pub use identity_client::HttpIdentityService;
pub use order_repo::PostgresOrderRepository;
pub use redis_repo::RedisClient;
pub use resiliency::CircuitBreaker;
