//! Export-restriction policy.
//!
//! This is a UI-level deterrent, not cryptographic protection: when the
//! policy is enabled the viewer's hosts refuse save, print, copy, and
//! context-menu actions for the document.

use serde::{Deserialize, Serialize};

/// Actions a protected document withholds from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAction {
    Save,
    Print,
    Copy,
    ContextMenu,
}

const RESTRICTED_ACTIONS: [ViewerAction; 4] =
    [ViewerAction::Save, ViewerAction::Print, ViewerAction::Copy, ViewerAction::ContextMenu];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtectionPolicy {
    enabled: bool,
}

impl ProtectionPolicy {
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn blocks(&self, action: ViewerAction) -> bool {
        self.enabled && RESTRICTED_ACTIONS.contains(&action)
    }

    /// The actions this policy currently withholds.
    pub fn blocked_actions(&self) -> &'static [ViewerAction] {
        if self.enabled {
            &RESTRICTED_ACTIONS
        } else {
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_policy_blocks_every_export_action() {
        let policy = ProtectionPolicy::enabled();
        assert!(policy.blocks(ViewerAction::Save));
        assert!(policy.blocks(ViewerAction::Print));
        assert!(policy.blocks(ViewerAction::Copy));
        assert!(policy.blocks(ViewerAction::ContextMenu));
    }

    #[test]
    fn disabled_policy_blocks_nothing() {
        let policy = ProtectionPolicy::disabled();
        assert!(!policy.blocks(ViewerAction::Save));
        assert!(policy.blocked_actions().is_empty());
    }
}
