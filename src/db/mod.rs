pub mod catalog;
pub mod history;
pub mod postgres;

pub use catalog::PgCatalogRepository;
pub use history::PgHistoryRecorder;
pub use postgres::create_pool;
