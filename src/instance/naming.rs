use std::env;

/// Which coordination resource a name is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Lock,
    Channel,
}

impl ResourceKind {
    fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Lock => "lock",
            ResourceKind::Channel => "channel",
        }
    }
}

/// Name for `kind`, scoped to the current OS user
pub fn resource_name(app_id: &str, kind: ResourceKind) -> String {
    resource_name_for(app_id, kind, &current_user())
}

/// `{app_id}_{kind}_{user}` with both free-form parts sanitized
pub fn resource_name_for(app_id: &str, kind: ResourceKind, user: &str) -> String {
    format!("{}_{}_{}", sanitize(app_id), kind.as_str(), sanitize(user))
}

fn current_user() -> String {
    ["USER", "LOGNAME"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "default".to_string())
}

// Keep names valid as file names on every platform
fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}
