use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved identity: handle, DID, and the actor's data-server endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub did: String,
    pub handle: String,
    pub data_server: String,
    pub resolved_at: DateTime<Utc>,
    pub method: ResolutionMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionMethod {
    Dns,
    Https,
    Cache,
}

#[derive(Debug, Clone)]
pub struct User {
    pub did: String,
    pub handle: String,
    pub data_server: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "unlisted" => Visibility::Unlisted,
            "private" => Visibility::Private,
            _ => Visibility::Public,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Community {
    pub did: String,
    pub handle: String,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub owner_did: String,
    pub created_by_did: String,
    pub hosted_by_did: String,
    pub visibility: Visibility,
    pub moderation_type: String,
    pub external_discovery: bool,
    pub record_uri: String,
    pub record_cid: String,
    pub avatar_cid: Option<String>,
    pub banner_cid: Option<String>,
    pub subscriber_count: i64,
    pub member_count: i64,
    pub data_server: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub uri: String,
    pub cid: String,
    pub rkey: String,
    pub author_did: String,
    pub community_did: String,
    pub title: String,
    pub content: Option<String>,
    pub embed: Option<serde_json::Value>,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub comment_count: i64,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub uri: String,
    pub cid: String,
    pub commenter_did: String,
    pub root_uri: String,
    pub root_cid: String,
    pub parent_uri: String,
    pub parent_cid: String,
    pub content: String,
    pub embed: Option<serde_json::Value>,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub reply_count: i64,
    pub score: i64,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }
}

/// How a feed page is ordered, per spec 4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSort {
    New,
    Hot,
    Top(TopTimeframe),
}

impl FeedSort {
    pub fn parse(sort: &str, timeframe: Option<&str>) -> Option<Self> {
        match sort {
            "new" => Some(FeedSort::New),
            "hot" => Some(FeedSort::Hot),
            "top" => Some(FeedSort::Top(TopTimeframe::parse(timeframe.unwrap_or("all")))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopTimeframe {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TopTimeframe {
    pub fn parse(s: &str) -> Self {
        match s {
            "hour" => TopTimeframe::Hour,
            "day" => TopTimeframe::Day,
            "week" => TopTimeframe::Week,
            "month" => TopTimeframe::Month,
            "year" => TopTimeframe::Year,
            _ => TopTimeframe::All,
        }
    }

    /// The lower bound a post's `created_at` must clear to count toward this
    /// timeframe, or `None` for "all" (no lower bound).
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TopTimeframe::Hour => Some(now - chrono::Duration::hours(1)),
            TopTimeframe::Day => Some(now - chrono::Duration::days(1)),
            TopTimeframe::Week => Some(now - chrono::Duration::weeks(1)),
            TopTimeframe::Month => Some(now - chrono::Duration::days(30)),
            TopTimeframe::Year => Some(now - chrono::Duration::days(365)),
            TopTimeframe::All => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vote {
    pub uri: String,
    pub voter_did: String,
    pub subject_uri: String,
    pub subject_cid: String,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub user_did: String,
    pub community_did: String,
    pub content_visibility: i32,
    pub record_uri: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    pub did: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub maintainer_did: Option<String>,
    pub source_url: Option<String>,
    pub config_schema: Option<serde_json::Value>,
    pub record_uri: Option<String>,
    pub communities_using: i64,
    pub posts_created: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AggregatorAuthorization {
    pub aggregator_did: String,
    pub community_did: String,
    pub enabled: bool,
    pub config: Option<serde_json::Value>,
    pub created_by_did: String,
    pub disabled_by_did: Option<String>,
    pub disabled_at: Option<DateTime<Utc>>,
    pub record_uri: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AggregatorPostTracking {
    pub aggregator_did: String,
    pub community_did: String,
    pub post_uri: String,
    pub posted_at: DateTime<Utc>,
}

/// An opaque OAuth session persisted per spec.md 4.3. `access_token` and
/// `dpop_jkt` are supplied by the actor's own authorization server; this
/// AppView never mints or validates them.
#[derive(Debug, Clone)]
pub struct OAuthSession {
    pub session_id: String,
    pub account_did: String,
    pub handle: String,
    pub access_token: String,
    pub dpop_jkt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A strong reference: a (URI, CID) pair naming a specific record version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}
