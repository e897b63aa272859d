//! Storage key names.
//!
//! These are persisted on user devices; renaming one orphans existing data,
//! so a rename needs a migration like the legacy refresh key has.

/// Current access token
pub const ACCESS_TOKEN: &str = "skyshot.auth.access_token";

/// Current refresh token
pub const REFRESH_TOKEN: &str = "skyshot.auth.refresh_token";

/// Refresh token key written by older app versions. Migrated to
/// [`REFRESH_TOKEN`] on load, then deleted.
pub const LEGACY_REFRESH_TOKEN: &str = "refreshToken";

/// Last-used login email
pub const CREDENTIAL_EMAIL: &str = "skyshot.credentials.email";

/// Last-used login password
pub const CREDENTIAL_PASSWORD: &str = "skyshot.credentials.password";

/// Preferred display name
pub const PREFERRED_NAME: &str = "skyshot.profile.preferred_name";
