use super::to_api_timestamp;
use crate::domain::models::user::User;
use shared::ProfileResponse;

pub struct UserMapper;

impl UserMapper {
    /// Public profile; the password hash never leaves the domain layer
    pub fn to_profile_response(user: User) -> ProfileResponse {
        ProfileResponse {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: to_api_timestamp(user.created_at),
        }
    }
}
