use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// The authenticated principal a request runs as.
///
/// Only `username` scopes data; the other fields are informational.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct User {
    pub username: String,
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl User {
    /// A principal known only by its user name.
    pub fn named(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            user_id: username.clone(),
            display_name: username.clone(),
            username,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// AppInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub display_name: String,
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    pub build: String,
}

/// Authenticated-user view plus version info.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppInfo {
    pub user: UserInfo,
    pub version: VersionInfo,
}

impl AppInfo {
    pub fn new(user: &User, version: impl Into<String>, build: impl Into<String>) -> Self {
        Self {
            user: UserInfo {
                display_name: user.display_name.clone(),
                user_id: user.user_id.clone(),
                user_name: user.username.clone(),
                email: user.email.clone(),
                roles: user.roles.clone(),
            },
            version: VersionInfo {
                version: version.into(),
                build: build.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_info_serializes_user_and_version() {
        let user = User {
            roles: vec!["admin".into()],
            email: "a@example.org".into(),
            ..User::named("alice")
        };
        let info = AppInfo::new(&user, "1.0.0", "42");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["user"]["user_name"], "alice");
        assert_eq!(json["user"]["roles"][0], "admin");
        assert_eq!(json["version"]["build"], "42");
    }
}
