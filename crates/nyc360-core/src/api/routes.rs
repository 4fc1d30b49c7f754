//! Endpoint paths, relative to the API base URL.

pub const LOGIN: &str = "/auth/login";
pub const REFRESH_TOKEN: &str = "/auth/refresh-token";
pub const CONFIRM_EMAIL: &str = "/auth/confirm-email";
pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
pub const RESET_PASSWORD: &str = "/auth/password-reset";
pub const CHANGE_PASSWORD: &str = "/auth/change-password";
pub const CREATE_COMMENT: &str = "/posts-dashboard/comment";

pub fn post(post_id: i64) -> String {
    format!("/posts/{}", post_id)
}

pub fn interact(post_id: i64) -> String {
    format!("/posts/{}/interact", post_id)
}

pub fn save_post(post_id: i64) -> String {
    format!("/posts/{}/save", post_id)
}

pub fn join_community(community_id: i64) -> String {
    format!("/communities/join?communityId={}", community_id)
}

pub fn leave_community(community_id: i64) -> String {
    format!("/communities/leave?communityId={}", community_id)
}
