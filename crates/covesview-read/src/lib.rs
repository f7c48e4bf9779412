pub mod comments;
pub mod feed;
pub mod identifier;
pub mod ranking;
#[cfg(test)]
mod test_support;
pub mod viewer;

pub use comments::{CommentNode, CommentSort, assemble_comment_tree};
pub use feed::{FeedPage, PostView, assemble_feed};
pub use identifier::{resolve_community, resolve_identifier};
pub use viewer::{ViewerVote, viewer_vote};
