use uuid::Uuid;

/// Password satisfying every signup requirement.
pub const PASSWORD: &str = "E2e!password";

/// A username unique to this run (fits the 16-character limit).
pub fn unique_username() -> String {
    format!("e2e{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// Request details unique to this run (fits the 50-character limit).
pub fn unique_details(prefix: &str) -> String {
    format!("{prefix} {}", &Uuid::new_v4().simple().to_string()[..8])
}

