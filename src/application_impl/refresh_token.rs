use crate::application_port::RefreshTokenGenerator;

/// Opaque refresh tokens backed by 122 random bits of a v4 UUID. Collisions are
/// not checked.
#[derive(Debug, Default)]
pub struct UuidRefreshTokenGenerator;

impl UuidRefreshTokenGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl RefreshTokenGenerator for UuidRefreshTokenGenerator {
    fn create(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
