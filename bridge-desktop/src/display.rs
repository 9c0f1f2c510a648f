//! Zone banner rendered into the log.
//!
//! Desktop builds have no overlay surface of their own; the banner lines are
//! written through tracing and the last banner is kept for inspection.

use async_trait::async_trait;
use bridge_traits::display::{ZoneBanner, ZoneDisplay};
use bridge_traits::error::Result;
use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Default)]
pub struct TracingZoneDisplay {
    current: Mutex<Option<ZoneBanner>>,
}

impl TracingZoneDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Banner currently on screen, if any.
    pub fn current(&self) -> Option<ZoneBanner> {
        self.current.lock().clone()
    }
}

#[async_trait]
impl ZoneDisplay for TracingZoneDisplay {
    async fn show_zone(&self, banner: &ZoneBanner) -> Result<()> {
        let mut current = self.current.lock();
        info!(target: "overlay::zone", "{}", banner.headline());

        // Without a new count the previous players line stays up.
        let players_line = banner
            .players_line()
            .or_else(|| current.as_ref().and_then(ZoneBanner::players_line));
        if let Some(line) = &players_line {
            info!(target: "overlay::zone", "{line}");
        }

        let player_count = banner
            .player_count
            .or_else(|| current.as_ref().and_then(|previous| previous.player_count));
        *current = Some(ZoneBanner::new(banner.zone_name.clone(), player_count));
        Ok(())
    }

    async fn hide(&self) -> Result<()> {
        if self.current.lock().take().is_some() {
            info!(target: "overlay::zone", "Zone banner hidden");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_previous_player_count() {
        let display = TracingZoneDisplay::new();
        display
            .show_zone(&ZoneBanner::new("Docks", Some(4)))
            .await
            .unwrap();
        display
            .show_zone(&ZoneBanner::new("Airfield", None))
            .await
            .unwrap();

        let current = display.current().unwrap();
        assert_eq!(current.zone_name, "Airfield");
        assert_eq!(current.player_count, Some(4));

        display.hide().await.unwrap();
        assert!(display.current().is_none());
    }
}
