//! Serving cell occupancy, cell change history and the neighbor table.
//!
//! The tracker has one writer, the poll loop. Every query returns owned copies
//! so snapshots can be handed to readers without sharing mutable state.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::parser::PLACEHOLDER;
use crate::registration::CellIdentity;
use crate::technology::AccessTech;

/// Readings at or below this are "no signal" (`+CSQ: 0`) and never count as a
/// peak.
pub const RSSI_FLOOR_DBM: i32 = -113;

fn valid_rssi(rssi: Option<i32>) -> Option<i32> {
    rssi.filter(|&dbm| dbm > RSSI_FLOOR_DBM)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellOccupancy {
    pub identity: CellIdentity,
    pub entered_at: DateTime<Utc>,
    pub peak_rssi_dbm: Option<i32>,
    pub technology: Option<AccessTech>,
    pub channel: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub enum CellState {
    #[default]
    NoCell,
    Tracking(CellOccupancy),
}

/// A finished occupancy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub entered_at: DateTime<Utc>,
    pub lac: u32,
    pub cid: u32,
    pub peak_rssi_dbm: Option<i32>,
    pub dwell: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborRecord {
    pub channel_or_cid: u32,
    pub band_name: String,
    pub pci: String,
    pub rssi_dbm: i32,
    pub last_seen: DateTime<Utc>,
}

/// Outcome of [`CellTracker::observe`].
#[derive(Debug, Clone, PartialEq)]
pub enum CellEvent {
    Entered,
    Changed(HistoryEntry),
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowStatus {
    Active,
    Ended { dwell: Duration },
}

/// One line of the history table. The first row is always the live cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub entered_at: DateTime<Utc>,
    pub lac: u32,
    pub cid: u32,
    pub peak_rssi_dbm: Option<i32>,
    pub status: RowStatus,
}

impl From<&HistoryEntry> for HistoryRow {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            entered_at: entry.entered_at,
            lac: entry.lac,
            cid: entry.cid,
            peak_rssi_dbm: entry.peak_rssi_dbm,
            status: RowStatus::Ended { dwell: entry.dwell },
        }
    }
}

/// `HH:MM:SS`, hours are not wrapped at a day.
pub fn format_dwell(dwell: Duration) -> String {
    let secs = dwell.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

impl fmt::Display for HistoryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let peak = self
            .peak_rssi_dbm
            .map_or_else(|| PLACEHOLDER.to_string(), |dbm| dbm.to_string());
        let status = match self.status {
            RowStatus::Active => "active".to_string(),
            RowStatus::Ended { dwell } => format_dwell(dwell),
        };
        write!(
            f,
            "{:<10} {:<8} {:<12} {:<10} {}",
            self.entered_at.format("%H:%M:%S"),
            self.lac,
            self.cid,
            peak,
            status
        )
    }
}

/// Plain text history table, ready to be copied elsewhere.
pub fn render_history(rows: &[HistoryRow]) -> String {
    let mut out = format!(
        "{:<10} {:<8} {:<12} {:<10} {}\n{}\n",
        "Time",
        "LAC",
        "Cell-ID",
        "dBm (max)",
        "Status",
        "-".repeat(60)
    );
    for row in rows {
        out.push_str(&row.to_string());
        out.push('\n');
    }
    out
}

#[derive(Debug, Default)]
pub struct CellTracker {
    state: CellState,
    /// Most recent first.
    history: VecDeque<HistoryEntry>,
    neighbors: BTreeMap<u32, NeighborRecord>,
}

impl CellTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CellState {
        &self.state
    }

    pub fn current(&self) -> Option<&CellOccupancy> {
        match &self.state {
            CellState::NoCell => None,
            CellState::Tracking(occupancy) => Some(occupancy),
        }
    }

    /// Folds one serving cell observation into the tracker.
    ///
    /// A new identity freezes the current occupancy into the history. The same
    /// identity only raises the peak, and only with a valid reading.
    pub fn observe(
        &mut self,
        identity: CellIdentity,
        rssi_dbm: Option<i32>,
        technology: Option<AccessTech>,
        channel: Option<u32>,
        now: DateTime<Utc>,
    ) -> CellEvent {
        if let CellState::Tracking(current) = &mut self.state
            && current.identity == identity
        {
            if let Some(dbm) = valid_rssi(rssi_dbm) {
                current.peak_rssi_dbm =
                    Some(current.peak_rssi_dbm.map_or(dbm, |peak| peak.max(dbm)));
            }
            if technology.is_some() {
                current.technology = technology;
            }
            if channel.is_some() {
                current.channel = channel;
            }
            return CellEvent::Unchanged;
        }

        let entered = CellOccupancy {
            identity,
            entered_at: now,
            peak_rssi_dbm: valid_rssi(rssi_dbm),
            technology,
            channel,
        };

        match std::mem::replace(&mut self.state, CellState::Tracking(entered)) {
            CellState::NoCell => {
                info!(lac = identity.lac, cid = identity.cid, "camped on cell");
                CellEvent::Entered
            }
            CellState::Tracking(previous) => {
                let entry = HistoryEntry {
                    entered_at: previous.entered_at,
                    lac: previous.identity.lac,
                    cid: previous.identity.cid,
                    peak_rssi_dbm: previous.peak_rssi_dbm,
                    dwell: (now - previous.entered_at).to_std().unwrap_or_default(),
                };
                info!(
                    from_lac = entry.lac,
                    from_cid = entry.cid,
                    lac = identity.lac,
                    cid = identity.cid,
                    dwell_secs = entry.dwell.as_secs(),
                    "cell changed"
                );
                self.history.push_front(entry.clone());
                CellEvent::Changed(entry)
            }
        }
    }

    /// Last write wins per channel/cid.
    pub fn record_neighbor(
        &mut self,
        channel_or_cid: u32,
        band_name: impl Into<String>,
        pci: impl Into<String>,
        rssi_dbm: i32,
        now: DateTime<Utc>,
    ) {
        self.neighbors.insert(
            channel_or_cid,
            NeighborRecord {
                channel_or_cid,
                band_name: band_name.into(),
                pci: pci.into(),
                rssi_dbm,
                last_seen: now,
            },
        );
    }

    /// Finished occupancies, most recent first, without the live cell.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.iter().cloned().collect()
    }

    /// History table rows: the live cell first, marked active, then the
    /// finished occupancies most recent first.
    pub fn snapshot_history(&self) -> Vec<HistoryRow> {
        let active = self.current().map(|current| HistoryRow {
            entered_at: current.entered_at,
            lac: current.identity.lac,
            cid: current.identity.cid,
            peak_rssi_dbm: current.peak_rssi_dbm,
            status: RowStatus::Active,
        });

        active
            .into_iter()
            .chain(self.history.iter().map(HistoryRow::from))
            .collect()
    }

    /// Neighbors strongest first. `active_id` is left out of the result but
    /// stays in the table.
    pub fn snapshot_neighbors(&self, active_id: Option<u32>) -> Vec<NeighborRecord> {
        let mut neighbors: Vec<_> = self
            .neighbors
            .values()
            .filter(|record| Some(record.channel_or_cid) != active_id)
            .cloned()
            .collect();
        neighbors.sort_by(|a, b| b.rssi_dbm.cmp(&a.rssi_dbm));
        neighbors
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn reset(&mut self) {
        self.state = CellState::NoCell;
        self.history.clear();
        self.neighbors.clear();
        info!("cell tracking reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    const A: CellIdentity = CellIdentity { lac: 6699, cid: 100 };
    const B: CellIdentity = CellIdentity { lac: 6699, cid: 200 };

    #[test]
    fn starts_without_a_cell() {
        let tracker = CellTracker::new();
        assert_eq!(tracker.state(), &CellState::NoCell);
        assert!(tracker.snapshot_history().is_empty());
    }

    #[test]
    fn one_history_entry_per_cell_change() {
        let mut tracker = CellTracker::new();
        assert_eq!(tracker.observe(A, Some(-80), None, None, at(0)), CellEvent::Entered);
        assert_eq!(tracker.observe(A, Some(-70), None, None, at(5)), CellEvent::Unchanged);
        let CellEvent::Changed(entry) = tracker.observe(B, Some(-90), None, None, at(42))
        else {
            panic!("expected a cell change");
        };
        tracker.observe(B, Some(-95), None, None, at(50));

        assert_eq!(tracker.history(), vec![entry.clone()]);
        assert_eq!(entry.cid, 100);
        assert_eq!(entry.dwell, Duration::from_secs(42));
        assert_eq!(entry.peak_rssi_dbm, Some(-70));
        assert_eq!(tracker.current().unwrap().identity, B);
        assert_eq!(tracker.current().unwrap().peak_rssi_dbm, Some(-90));
    }

    #[test]
    fn invalid_rssi_never_lowers_or_sets_the_peak() {
        let mut tracker = CellTracker::new();
        tracker.observe(A, Some(RSSI_FLOOR_DBM), None, None, at(0));
        assert_eq!(tracker.current().unwrap().peak_rssi_dbm, None);

        tracker.observe(A, Some(-100), None, None, at(1));
        tracker.observe(A, None, None, None, at(2));
        tracker.observe(A, Some(RSSI_FLOOR_DBM), None, None, at(3));
        tracker.observe(A, Some(-105), None, None, at(4));
        assert_eq!(tracker.current().unwrap().peak_rssi_dbm, Some(-100));
    }

    #[test]
    fn history_is_most_recent_first_with_active_row() {
        let mut tracker = CellTracker::new();
        tracker.observe(A, Some(-80), None, Some(6300), at(0));
        tracker.observe(B, Some(-85), None, Some(6300), at(10));
        tracker.observe(A, Some(-75), None, Some(6300), at(30));

        let rows = tracker.snapshot_history();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].status, RowStatus::Active);
        assert_eq!(rows[0].cid, 100);
        assert_eq!(rows[0].entered_at, at(30));
        assert_eq!(rows[1].cid, 200);
        assert_eq!(rows[1].status, RowStatus::Ended { dwell: Duration::from_secs(20) });
        assert_eq!(rows[2].cid, 100);
        assert_eq!(rows[2].status, RowStatus::Ended { dwell: Duration::from_secs(10) });
    }

    #[test]
    fn unchanged_cell_keeps_latest_channel_and_technology() {
        let mut tracker = CellTracker::new();
        tracker.observe(A, None, Some(AccessTech::new("7")), Some(6300), at(0));
        tracker.observe(A, None, None, None, at(1));
        tracker.observe(A, None, None, Some(1300), at(2));

        let current = tracker.current().unwrap();
        assert_eq!(current.technology, Some(AccessTech::new("7")));
        assert_eq!(current.channel, Some(1300));
        assert_eq!(current.entered_at, at(0));
    }

    #[test]
    fn neighbor_last_write_wins() {
        let mut tracker = CellTracker::new();
        tracker.record_neighbor(6300, "800 MHz LTE-20", "215", -98, at(0));
        tracker.record_neighbor(6300, "800 MHz LTE-20", "215", -90, at(1));

        let neighbors = tracker.snapshot_neighbors(None);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].rssi_dbm, -90);
        assert_eq!(neighbors[0].last_seen, at(1));
    }

    #[test]
    fn active_channel_is_excluded_from_neighbors_but_kept() {
        let mut tracker = CellTracker::new();
        tracker.record_neighbor(6300, "800 MHz LTE-20", "215", -70, at(0));
        tracker.record_neighbor(1300, "1800 MHz LTE-3", "12", -104, at(0));
        tracker.record_neighbor(3550, "900 MHz LTE-8", "7", -88, at(0));

        let neighbors = tracker.snapshot_neighbors(Some(6300));
        let channels: Vec<_> = neighbors.iter().map(|n| n.channel_or_cid).collect();
        assert_eq!(channels, vec![3550, 1300]);
        assert_eq!(tracker.neighbor_count(), 3);

        let channels: Vec<_> = tracker
            .snapshot_neighbors(None)
            .iter()
            .map(|n| n.channel_or_cid)
            .collect();
        assert_eq!(channels, vec![6300, 3550, 1300]);
    }

    #[test]
    fn reset_behaves_like_a_fresh_start() {
        let mut tracker = CellTracker::new();
        tracker.observe(A, Some(-80), None, None, at(0));
        tracker.observe(B, Some(-80), None, None, at(1));
        tracker.record_neighbor(6300, "800 MHz LTE-20", "215", -98, at(1));

        tracker.reset();
        assert_eq!(tracker.state(), &CellState::NoCell);
        assert!(tracker.history().is_empty());
        assert!(tracker.snapshot_neighbors(None).is_empty());

        assert_eq!(tracker.observe(B, Some(-60), None, None, at(5)), CellEvent::Entered);
        assert!(tracker.history().is_empty());
        assert_eq!(tracker.snapshot_history().len(), 1);
    }

    #[test]
    fn renders_history_table() {
        let mut tracker = CellTracker::new();
        tracker.observe(A, None, None, None, at(0));
        tracker.observe(B, Some(-61), None, None, at(3725));

        let table = render_history(&tracker.snapshot_history());
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Time"));
        assert!(lines[2].contains("-61"));
        assert!(lines[2].ends_with("active"));
        assert!(lines[3].contains("--"));
        assert!(lines[3].ends_with("01:02:05"));
    }

    #[test]
    fn dwell_format_does_not_wrap_days() {
        assert_eq!(format_dwell(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_dwell(Duration::from_secs(90_061)), "25:01:01");
    }
}
