pub mod comment;
pub mod community;
pub mod embed;
pub mod post;
#[cfg(test)]
mod test_support;
pub mod vote;

pub use comment::{NewComment, create_comment, delete_comment, update_comment};
pub use community::{CommunityUpdate, update_community};
pub use embed::ImageUpload;
pub use post::{NewPost, Writer, create_post};
pub use vote::{CachedVote, VoteAction, VoteCache, decide_vote_action, remove_vote, toggle_vote};
