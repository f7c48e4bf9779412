//! NSIDs of the record collections this AppView indexes from the firehose
//! and writes to actors' data servers.

pub const COMMUNITY_DECLARATION: &str = "app.coves.community.declaration";
pub const POST: &str = "app.coves.post";
pub const COMMENT: &str = "app.coves.comment";
pub const VOTE: &str = "app.coves.vote";
pub const SUBSCRIPTION: &str = "app.coves.subscription";
pub const AGGREGATOR_DECLARATION: &str = "app.coves.aggregator.declaration";
pub const AGGREGATOR_AUTHORIZATION: &str = "app.coves.aggregator.authorization";

pub const ALL: &[&str] = &[
    COMMUNITY_DECLARATION,
    POST,
    COMMENT,
    VOTE,
    SUBSCRIPTION,
    AGGREGATOR_DECLARATION,
    AGGREGATOR_AUTHORIZATION,
];
