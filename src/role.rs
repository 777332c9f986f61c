//! # Process role detection.
//!
//! A master process spawns children that re-exec the same binary, so both
//! roles enter through the same `main`. The only thing telling them apart is
//! the role marker: an environment variable carrying the count of inherited
//! listener descriptors.
//!
//! The marker is translated into a typed [`Role`] at this boundary and
//! consumed in the process; nothing past this module reads the environment
//! to decide what the process is.

use std::env;

use crate::error::ImportError;

/// Role marker variable. Present only in spawned children; its value is the
/// number of inherited listener descriptors.
pub(crate) const LISTEN_FDS_ENV: &str = "GRACEVISOR_LISTEN_FDS";

/// What the current process is, according to the role marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// No marker: this process owns listener creation and child supervision.
    Master,
    /// Marker present: this process was spawned by a master and inherits the
    /// given number of listener descriptors starting at slot 3. Zero is
    /// legal — a child with nothing to accept on.
    Child(usize),
}

impl Role {
    /// Reads and consumes the role marker.
    ///
    /// Absent or empty marker means [`Role::Master`]. A present marker is
    /// removed from the environment so that a further re-exec from inside
    /// the child does not mistake itself for a grandchild.
    pub fn from_env() -> Result<Role, ImportError> {
        let value = match env::var_os(LISTEN_FDS_ENV) {
            None => return Ok(Role::Master),
            Some(v) => v,
        };
        env::remove_var(LISTEN_FDS_ENV);
        if value.is_empty() {
            return Ok(Role::Master);
        }

        let value = value.to_string_lossy().into_owned();
        let count = value.parse::<usize>().map_err(|source| ImportError::BadCount {
            var: LISTEN_FDS_ENV,
            value,
            source,
        })?;
        Ok(Role::Child(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test: the marker variable is process-global state, so the cases
    // run sequentially.
    #[test]
    fn test_role_detection_consumes_marker() {
        env::remove_var(LISTEN_FDS_ENV);
        assert_eq!(Role::from_env().unwrap(), Role::Master);

        env::set_var(LISTEN_FDS_ENV, "");
        assert_eq!(Role::from_env().unwrap(), Role::Master);

        env::set_var(LISTEN_FDS_ENV, "2");
        assert_eq!(Role::from_env().unwrap(), Role::Child(2));
        assert!(env::var_os(LISTEN_FDS_ENV).is_none(), "marker must be consumed");

        env::set_var(LISTEN_FDS_ENV, "0");
        assert_eq!(Role::from_env().unwrap(), Role::Child(0));

        env::set_var(LISTEN_FDS_ENV, "nope");
        let err = Role::from_env().unwrap_err();
        assert!(matches!(err, ImportError::BadCount { .. }));
        assert!(env::var_os(LISTEN_FDS_ENV).is_none(), "marker consumed even on error");
    }
}
