//! Splitting an expanded name into container and blob prefix

use std::fmt;

use serde::Serialize;

use crate::sanitize::MAX_NAME_LEN;

/// Container name plus blob path prefix.
///
/// `prefix` is either empty or ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerPrefix {
    pub container: String,
    pub prefix: String,
}

impl ContainerPrefix {
    /// Full blob name for a file stored under this prefix.
    ///
    /// A bare `/` prefix (from a template ending in `/`) puts the file at
    /// the container root.
    pub fn blob_name(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix, file_name.trim_start_matches('/'))
            .trim_start_matches('/')
            .to_string()
    }
}

impl fmt::Display for ContainerPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.prefix)
    }
}

/// Split an expanded (already sanitized) name at its first `/`.
///
/// ```
/// use ams_migrate::path::split_path;
///
/// let split = split_path("my-video/abc123");
/// assert_eq!(split.container, "my-video");
/// assert_eq!(split.prefix, "abc123/");
/// ```
pub fn split_path(expanded: &str) -> ContainerPrefix {
    let (container, prefix) = match expanded.split_once('/') {
        None => (expanded.to_lowercase(), String::new()),
        Some((container, rest)) => {
            let mut prefix = rest.to_string();
            if !prefix.ends_with('/') {
                prefix.push('/');
            }
            (container.to_lowercase(), prefix)
        }
    };

    let container = if container.chars().count() > MAX_NAME_LEN {
        container.chars().take(MAX_NAME_LEN).collect()
    } else {
        container
    };

    ContainerPrefix { container, prefix }
}
