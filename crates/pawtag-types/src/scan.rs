//! Scan resolution outcomes

use serde::{Deserialize, Serialize};

use crate::{ProfileId, TagCodeId};

/// Action token returned by the public scan endpoint.
///
/// The scan endpoint never returns profile data directly; it hands the
/// caller one of these and the caller follows the redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Code is verified and entitled; reveal the profile
    RedirectToProfile {
        /// Profile to display
        profile_id: ProfileId,
    },
    /// Code is not (yet) entitled to reveal anything; prompt verification
    RedirectToVerification {
        /// Code the prompt is for
        tag_code_id: TagCodeId,
    },
}
