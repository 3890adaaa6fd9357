//! Route paths.

pub const POST_AUTH_SEND_CODE: &str = "/api/auth/send-code";
pub const POST_AUTH_REGISTER: &str = "/api/auth/register";
pub const POST_AUTH_LOGIN: &str = "/api/auth/login";
pub const POST_AUTH_RESET_PASSWORD: &str = "/api/auth/reset-password";

pub const GET_AUTH_ME: &str = "/api/auth/me";
pub const PUT_AUTH_PROFILE: &str = "/api/auth/profile";
pub const DELETE_AUTH_ACCOUNT: &str = "/api/auth/account";

pub const GET_ADMIN_USERS: &str = "/api/admin/users";
pub const DELETE_ADMIN_USERS_ID: &str = "/api/admin/users/{id}";
