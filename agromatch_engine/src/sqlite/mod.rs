pub mod db;
mod errors;
mod sqlite_impl;

pub use errors::SqliteDatabaseError;
pub use sqlite_impl::SqliteDatabase;
