pub mod collections;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use traits::{DataServerClient, IdentityCacheStore, RecordStore, SessionStore};
pub use types::{
    Aggregator, AggregatorAuthorization, AggregatorPostTracking, Comment, Community, Direction,
    Identity, OAuthSession, Post, ResolutionMethod, StrongRef, Subscription, User, Visibility,
    Vote,
};
