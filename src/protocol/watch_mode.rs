//! Watch mode definitions

use std::fmt;

/// Desired push-notification behavior, held server-side
///
/// Which variants exist on the wire depends on the revision: V2 knows
/// `None`, `All` and `Tagged`; V3 knows `None` and `Watching`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchMode {
    /// No notifications
    None,

    /// Notifications for every entry (V2)
    All,

    /// Notifications for entries carrying one tag (V2)
    Tagged,

    /// Notifications enabled (V3)
    Watching,
}

impl fmt::Display for WatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatchMode::None => "none",
            WatchMode::All => "all",
            WatchMode::Tagged => "tagged",
            WatchMode::Watching => "watching",
        };
        f.write_str(name)
    }
}
