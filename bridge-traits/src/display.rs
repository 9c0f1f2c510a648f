//! Area-of-play banner.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Content of the on-screen zone banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneBanner {
    pub zone_name: String,
    pub player_count: Option<u32>,
}

impl ZoneBanner {
    pub fn new(zone_name: impl Into<String>, player_count: Option<u32>) -> Self {
        Self {
            zone_name: zone_name.into(),
            player_count,
        }
    }

    pub fn headline(&self) -> String {
        format!("[AREA OF PLAY]: {}", self.zone_name)
    }

    /// `None` when no player count was supplied; the previous count stays on
    /// screen in that case.
    pub fn players_line(&self) -> Option<String> {
        self.player_count.map(|count| format!("[Players]: {count}"))
    }
}

/// Renders or hides the zone banner.
#[async_trait]
pub trait ZoneDisplay: Send + Sync {
    async fn show_zone(&self, banner: &ZoneBanner) -> Result<()>;

    async fn hide(&self) -> Result<()>;
}
