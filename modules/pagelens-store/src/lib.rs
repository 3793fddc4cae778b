pub mod error;
pub mod models;
pub mod store;

pub use error::{Result, StoreError};
pub use models::{Comment, CreateOutcome, Member, Page, PageDetail, PageSearch, Post};
pub use store::PageStore;
