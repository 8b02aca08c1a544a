//! Settings-store collaborator boundary.

use async_trait::async_trait;

use crate::auth::AccountId;
use crate::error::Result;
use crate::preset::PresetTable;

/// External settings-store collaborator. Preset durations are owned here;
/// the timer reads them at lazy session creation and on explicit refresh.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the account's presets, falling back to defaults for accounts
    /// that never saved any.
    async fn get_presets(&self, account: &AccountId) -> Result<PresetTable>;

    /// Persist updated presets for the account.
    async fn put_presets(&self, account: &AccountId, presets: PresetTable) -> Result<()>;
}
