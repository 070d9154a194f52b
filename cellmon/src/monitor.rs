//! The poll cycle: issues the per-cycle commands, folds each tagged reply into
//! the live status and the cell tracker, and renders snapshots for display.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::band;
use crate::device::{self, DeviceIdentity};
use crate::errors::{ConfigError, Result};
use crate::frequency;
use crate::modem::AtTransport;
use crate::operator::{OperatorInfo, OperatorResolver};
use crate::parser::{
    display_or_placeholder, BandwidthMhz, Field, FieldCategory, ParseContext,
    ResponseParser, PLACEHOLDER,
};
use crate::profile::{self, CommandProfile, PROFILES};
use crate::registration::{CellIdentity, RegistrationStatus};
use crate::technology::AccessTech;
use crate::tracker::{CellTracker, HistoryRow, NeighborRecord};

/// Switches `+CREG` replies to the form carrying LAC and cell id.
pub const ENABLE_LOCATION_REPORTING: &str = "AT+CREG=2";

/// One command of the poll cycle. Replies are tagged with it so the monitor
/// knows which field categories to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollCommand {
    SignalQuality,
    ServingCell,
    Registration,
    EpsRegistration,
    Operator,
}

impl PollCommand {
    /// Issue order within one cycle.
    pub const CYCLE: [PollCommand; 5] = [
        PollCommand::SignalQuality,
        PollCommand::ServingCell,
        PollCommand::Registration,
        PollCommand::EpsRegistration,
        PollCommand::Operator,
    ];

    pub fn at_command(self, profile: &CommandProfile) -> &'static str {
        match self {
            PollCommand::SignalQuality => "AT+CSQ",
            PollCommand::ServingCell => profile.serving_cell_command,
            PollCommand::Registration => "AT+CREG?",
            PollCommand::EpsRegistration => "AT+CEREG?",
            PollCommand::Operator => "AT+COPS=3,2;+COPS?",
        }
    }
}

/// Latest known value of every displayed field. A field only changes when a
/// reply carries a fresh value for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveStatus {
    pub technology: Option<AccessTech>,
    pub channel: Option<u32>,
    /// The last serving cell reply carried no channel.
    pub searching: bool,
    pub pci: Option<String>,
    pub rssi_dbm: Option<i32>,
    pub registration: Option<RegistrationStatus>,
    pub identity: Option<CellIdentity>,
    pub operator: Option<OperatorInfo>,
    pub bandwidth: Option<BandwidthMhz>,
}

impl LiveStatus {
    pub fn technology_label(&self) -> &'static str {
        self.technology.as_ref().map_or(PLACEHOLDER, AccessTech::label)
    }

    pub fn band_name(&self) -> &'static str {
        self.channel.map_or(PLACEHOLDER, band::band_name)
    }

    pub fn frequency_display(&self) -> String {
        match self.channel {
            Some(channel) if !self.searching => frequency::display(channel),
            _ => "searching".to_string(),
        }
    }

    pub fn registration_color(&self) -> &'static str {
        self.registration
            .unwrap_or(RegistrationStatus::Unknown)
            .color()
    }

    /// Band of the active channel, the short technology label when the channel
    /// is outside every known band.
    pub fn active_band_label(&self) -> &'static str {
        match self.channel.and_then(band::lookup) {
            Some(range) => range.name,
            None => self.technology.as_ref().map_or("Radio", AccessTech::short_label),
        }
    }

    fn parse_context(&self) -> ParseContext {
        ParseContext {
            channel: self.channel,
            family: self.technology.as_ref().and_then(AccessTech::family),
        }
    }
}

/// Display values of the live status, everything already formatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub technology: String,
    pub channel: String,
    pub band: String,
    pub frequency: String,
    pub pci: String,
    pub rssi_dbm: String,
    pub registration: String,
    pub registration_color: String,
    pub lac: String,
    pub cid: String,
    pub mcc: String,
    pub mnc: String,
    pub carrier: String,
    pub bandwidth_mhz: String,
}

impl From<&LiveStatus> for StatusView {
    fn from(status: &LiveStatus) -> Self {
        let (mcc, mnc, carrier) = match &status.operator {
            Some(o) => (o.mcc.clone(), o.mnc.clone(), o.carrier_name.clone()),
            None => Default::default(),
        };
        let or_placeholder = |value: String| {
            if value.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                value
            }
        };

        Self {
            technology: status.technology_label().to_string(),
            channel: display_or_placeholder(status.channel),
            band: status.band_name().to_string(),
            frequency: status.frequency_display(),
            pci: display_or_placeholder(status.pci.as_deref()),
            rssi_dbm: display_or_placeholder(status.rssi_dbm),
            registration: display_or_placeholder(status.registration),
            registration_color: status.registration_color().to_string(),
            lac: display_or_placeholder(status.identity.map(|id| id.lac)),
            cid: display_or_placeholder(status.identity.map(|id| id.cid)),
            mcc: or_placeholder(mcc),
            mnc: or_placeholder(mnc),
            carrier: or_placeholder(carrier),
            bandwidth_mhz: display_or_placeholder(status.bandwidth),
        }
    }
}

/// First row of the neighbor table: the serving channel itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveCellRow {
    pub since: Option<DateTime<Utc>>,
    pub band: String,
    pub channel: u32,
    pub pci: String,
    pub rssi_dbm: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub profile: CommandProfile,
    pub status: StatusView,
    pub history: Vec<HistoryRow>,
    pub active_cell: Option<ActiveCellRow>,
    pub neighbors: Vec<NeighborRecord>,
}

impl fmt::Display for MonitorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.status;
        writeln!(f, "Profile:      {}", self.profile)?;
        writeln!(f, "Technology:   {}", s.technology)?;
        writeln!(f, "Channel:      {} ({})", s.channel, s.band)?;
        writeln!(f, "Frequency:    {}", s.frequency)?;
        writeln!(f, "PCI:          {}", s.pci)?;
        writeln!(f, "Signal:       {} dBm", s.rssi_dbm)?;
        writeln!(f, "Status:       {}", s.registration)?;
        writeln!(f, "LAC/Cell-ID:  {} / {}", s.lac, s.cid)?;
        writeln!(f, "MCC/MNC:      {} / {}", s.mcc, s.mnc)?;
        writeln!(f, "Carrier:      {}", s.carrier)?;
        writeln!(f, "Bandwidth:    {} MHz", s.bandwidth_mhz)?;
        writeln!(f)?;
        write!(f, "{}", crate::tracker::render_history(&self.history))?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<10} {:<18} {:<10} {:<6} RSSI\n{}",
            "Time",
            "Band",
            "Channel",
            "PCI",
            "-".repeat(55)
        )?;
        if let Some(active) = &self.active_cell {
            let since = active
                .since
                .map_or_else(|| PLACEHOLDER.to_string(), |t| t.format("%H:%M:%S").to_string());
            writeln!(
                f,
                "{:<10} {:<18} {:<10} {:<6} {} dBm",
                since,
                active.band,
                format!("{} (active)", active.channel),
                active.pci,
                display_or_placeholder(active.rssi_dbm)
            )?;
        }
        for n in &self.neighbors {
            writeln!(
                f,
                "{:<10} {:<18} {:<10} {:<6} {} dBm",
                n.last_seen.format("%H:%M:%S"),
                n.band_name,
                n.channel_or_cid,
                n.pci,
                n.rssi_dbm
            )?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Monitor {
    parser: ResponseParser,
    operators: OperatorResolver,
    tracker: CellTracker,
    status: LiveStatus,
    profile_index: usize,
}

impl Monitor {
    pub fn new(
        parser: ResponseParser,
        operators: OperatorResolver,
        profile_index: usize,
    ) -> std::result::Result<Self, ConfigError> {
        check_profile(profile_index)?;
        Ok(Self {
            parser,
            operators,
            tracker: CellTracker::new(),
            status: LiveStatus::default(),
            profile_index,
        })
    }

    pub fn status(&self) -> &LiveStatus {
        &self.status
    }

    pub fn tracker(&self) -> &CellTracker {
        &self.tracker
    }

    pub fn profile(&self) -> &'static CommandProfile {
        &PROFILES[self.profile_index]
    }

    pub fn profile_index(&self) -> usize {
        self.profile_index
    }

    pub fn set_profile(&mut self, index: usize) -> std::result::Result<(), ConfigError> {
        check_profile(index)?;
        self.profile_index = index;
        info!(profile = %self.profile(), "command profile selected");
        Ok(())
    }

    /// Moves to the next vendor profile, wrapping around.
    pub fn cycle_profile(&mut self) -> &'static CommandProfile {
        self.profile_index = profile::next_index(self.profile_index);
        info!(profile = %self.profile(), "command profile selected");
        self.profile()
    }

    /// Forgets the history, the neighbors and every live value.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.status = LiveStatus::default();
    }

    /// Enables LAC/CID reporting and reads the device identity. Identity
    /// queries the modem does not answer are left empty.
    pub fn connect<T: AtTransport + ?Sized>(
        &mut self,
        modem: &mut T,
    ) -> Result<DeviceIdentity> {
        modem.send(ENABLE_LOCATION_REPORTING)?;

        let mut query = |command: &str| match modem.send(command) {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(command, "identity query failed: {e}");
                None
            }
        };

        let imei = query(device::IMEI_COMMAND).and_then(|r| device::info_line(&r));
        let manufacturer =
            query(device::MANUFACTURER_COMMAND).and_then(|r| device::info_line(&r));
        let model = query(device::MODEL_COMMAND).and_then(|r| device::info_line(&r));
        let revision =
            query(device::REVISION_COMMAND).and_then(|r| device::info_line(&r));
        let iccid = device::ICCID_COMMANDS
            .iter()
            .find_map(|command| query(*command).and_then(|r| device::parse_iccid(&r)));
        let imsi = query(device::IMSI_COMMAND).and_then(|r| device::parse_imsi(&r));
        let number = query(device::NUMBER_COMMAND).and_then(|r| device::parse_number(&r));

        let identity = DeviceIdentity {
            imei,
            manufacturer,
            model,
            revision,
            iccid,
            imsi,
            number,
        };
        info!(?identity, "modem connected");
        Ok(identity)
    }

    /// Runs one poll cycle. A transport error abandons the rest of the cycle,
    /// replies folded before it stay applied.
    pub fn poll_once<T: AtTransport + ?Sized>(&mut self, modem: &mut T) -> Result<()> {
        for command in PollCommand::CYCLE {
            let reply = modem.send(command.at_command(self.profile()))?;
            self.ingest(command, &reply, Utc::now());
        }
        Ok(())
    }

    /// Folds one tagged reply. Fields the reply does not carry keep their
    /// previous value.
    pub fn ingest(&mut self, command: PollCommand, reply: &str, now: DateTime<Utc>) {
        match command {
            PollCommand::SignalQuality => {
                if let Some(Field::RssiDbm(dbm)) = self.extract(reply, FieldCategory::Rssi) {
                    self.status.rssi_dbm = Some(dbm);
                }
            }
            PollCommand::ServingCell => self.ingest_serving_cell(reply, now),
            PollCommand::Registration | PollCommand::EpsRegistration => {
                self.ingest_registration(reply, now)
            }
            PollCommand::Operator => {
                if let Some(Field::Operator(reading)) =
                    self.extract(reply, FieldCategory::Operator)
                {
                    self.status.operator =
                        Some(self.operators.operator_info(&reading.network_code));
                }
                // a reply without <AcT> counts as GSM
                if let Some(Field::Technology(technology)) =
                    self.extract(reply, FieldCategory::Technology)
                {
                    if self.status.technology.as_ref() != Some(&technology) {
                        info!(
                            act = technology.code(),
                            label = technology.label(),
                            "access technology changed"
                        );
                    }
                    self.status.technology = Some(technology);
                }
            }
        }
    }

    fn extract(&self, reply: &str, category: FieldCategory) -> Option<Field> {
        let field = self
            .parser
            .extract(reply, category, self.status.parse_context());
        if field.is_none() {
            debug!(?category, "reply carries no value");
        }
        field
    }

    fn ingest_serving_cell(&mut self, reply: &str, now: DateTime<Utc>) {
        let Some(Field::Channel(channel)) = self.extract(reply, FieldCategory::Channel)
        else {
            self.status.searching = true;
            return;
        };
        self.status.channel = Some(channel);
        self.status.searching = false;

        if let Some(Field::Pci(pci)) = self.extract(reply, FieldCategory::Pci) {
            self.status.pci = Some(pci);
        }
        if let Some(Field::Bandwidth(bandwidth)) =
            self.extract(reply, FieldCategory::Bandwidth)
        {
            self.status.bandwidth = Some(bandwidth);
        }

        for neighbor in crate::parser::parse_neighbors(reply) {
            self.tracker.record_neighbor(
                neighbor.channel_or_cid,
                band::band_name(neighbor.channel_or_cid),
                neighbor.pci,
                neighbor.rssi_dbm,
                now,
            );
        }
    }

    fn ingest_registration(&mut self, reply: &str, now: DateTime<Utc>) {
        let Some(Field::Registration(registration)) =
            self.extract(reply, FieldCategory::Registration)
        else {
            return;
        };
        self.status.registration = Some(registration.status);

        if let Some(identity) = registration.identity {
            self.status.identity = Some(identity);
            self.tracker.observe(
                identity,
                self.status.rssi_dbm,
                self.status.technology.clone(),
                self.status.channel,
                now,
            );
        }
    }

    pub fn active_cell(&self) -> Option<ActiveCellRow> {
        let channel = self.status.channel?;
        Some(ActiveCellRow {
            since: self.tracker.current().map(|c| c.entered_at),
            band: self.status.active_band_label().to_string(),
            channel,
            pci: display_or_placeholder(self.status.pci.as_deref()),
            rssi_dbm: self.status.rssi_dbm,
        })
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            profile: *self.profile(),
            status: StatusView::from(&self.status),
            history: self.tracker.snapshot_history(),
            active_cell: self.active_cell(),
            neighbors: self.tracker.snapshot_neighbors(self.status.channel),
        }
    }
}

fn check_profile(index: usize) -> std::result::Result<(), ConfigError> {
    if profile::by_index(index).is_none() {
        return Err(ConfigError::UnknownProfile {
            index,
            count: PROFILES.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn monitor() -> Monitor {
        Monitor::new(ResponseParser::default(), OperatorResolver::default(), 12).unwrap()
    }

    const SERVING: &str = "+CPSI: LTE,Online,EARFCN: 6300,PCI: 215\r\nOK";

    #[test]
    fn rejects_unknown_profile() {
        let err = Monitor::new(ResponseParser::default(), OperatorResolver::default(), 16)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { index: 16, count: 16 }));
    }

    #[test]
    fn cycle_commands_follow_the_profile() {
        let monitor = monitor();
        let commands: Vec<_> = PollCommand::CYCLE
            .iter()
            .map(|c| c.at_command(monitor.profile()))
            .collect();
        assert_eq!(
            commands,
            ["AT+CSQ", "AT+CPSI?", "AT+CREG?", "AT+CEREG?", "AT+COPS=3,2;+COPS?"]
        );
    }

    #[test]
    fn folds_a_full_cycle() {
        let mut monitor = monitor();
        monitor.ingest(PollCommand::SignalQuality, "+CSQ: 20,99\r\nOK", at(0));
        monitor.ingest(PollCommand::ServingCell, SERVING, at(0));
        monitor.ingest(
            PollCommand::Registration,
            "+CREG: 2,1,\"1A2B\",\"00112233\"\r\nOK",
            at(0),
        );
        monitor.ingest(PollCommand::EpsRegistration, "+CEREG: 2,0\r\nOK", at(0));
        monitor.ingest(PollCommand::Operator, "+COPS: 0,2,\"26202\",7\r\nOK", at(0));

        let status = monitor.status();
        assert_eq!(status.rssi_dbm, Some(-73));
        assert_eq!(status.channel, Some(6300));
        assert_eq!(status.band_name(), "800 MHz LTE-20");
        assert_eq!(status.identity, Some(CellIdentity::new(6699, 1_122_867)));
        assert_eq!(status.registration, Some(RegistrationStatus::NotRegistered));
        assert_eq!(status.technology_label(), "E-UTRAN/LTE (4G)");

        let view = monitor.snapshot().status;
        assert_eq!(view.carrier, "Vodafone DE");
        assert_eq!(view.mcc, "262");
        assert_eq!(view.mnc, "02");
        assert_eq!(view.lac, "6699");
        assert_eq!(view.registration_color, "#c23616");
    }

    #[test]
    fn serving_reply_without_channel_means_searching() {
        let mut monitor = monitor();
        assert_eq!(monitor.status().frequency_display(), "searching");

        monitor.ingest(PollCommand::ServingCell, SERVING, at(0));
        assert!(monitor.status().frequency_display().starts_with("↓ 806.0 MHz"));

        monitor.ingest(PollCommand::ServingCell, "+CPSI: NO SERVICE\r\nOK", at(1));
        assert_eq!(monitor.status().frequency_display(), "searching");
        assert_eq!(monitor.status().channel, Some(6300));
    }

    #[test]
    fn missing_values_keep_previous_state() {
        let mut monitor = monitor();
        monitor.ingest(PollCommand::SignalQuality, "+CSQ: 20,99", at(0));
        monitor.ingest(PollCommand::SignalQuality, "+CSQ: 99,99", at(1));
        monitor.ingest(PollCommand::SignalQuality, "ERROR", at(2));
        assert_eq!(monitor.status().rssi_dbm, Some(-73));

        monitor.ingest(PollCommand::Registration, "+CREG: 2,1,\"1A2B\",\"10\"", at(0));
        monitor.ingest(PollCommand::Registration, "garbage", at(5));
        assert_eq!(monitor.tracker().history().len(), 0);
        assert_eq!(monitor.status().identity, Some(CellIdentity::new(6699, 16)));
    }

    #[test]
    fn registration_changes_feed_the_tracker() {
        let mut monitor = monitor();
        monitor.ingest(PollCommand::SignalQuality, "+CSQ: 15,99", at(0));
        monitor.ingest(PollCommand::Registration, "+CREG: 2,1,\"1A2B\",\"10\"", at(0));
        monitor.ingest(PollCommand::SignalQuality, "+CSQ: 25,99", at(3));
        monitor.ingest(PollCommand::Registration, "+CREG: 2,1,\"1A2B\",\"10\"", at(3));
        monitor.ingest(PollCommand::Registration, "+CREG: 2,1,\"1A2B\",\"20\"", at(9));

        let history = monitor.tracker().history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].cid, 16);
        assert_eq!(history[0].peak_rssi_dbm, Some(-63));
        assert_eq!(history[0].dwell.as_secs(), 9);
    }

    #[test]
    fn active_row_falls_back_to_technology_label() {
        let mut monitor = monitor();
        monitor.ingest(PollCommand::Operator, "+COPS: 0,2,\"26201\",7", at(0));
        monitor.ingest(PollCommand::ServingCell, "+CPSI: earfcn: 9999, pci: 42", at(0));

        let active = monitor.active_cell().unwrap();
        assert_eq!(active.band, "LTE");
        assert_eq!(active.channel, 9999);
        assert_eq!(active.pci, "42");
    }

    #[test]
    fn lte_m_technology_drives_the_bandwidth_default() {
        let mut monitor = monitor();
        monitor.ingest(PollCommand::Operator, "+COPS: 0,2,\"26201\",10\r\nOK", at(0));
        monitor.ingest(PollCommand::ServingCell, "+CPSI: earfcn: 6300, pci: 1", at(0));

        let status = monitor.status();
        assert_eq!(status.technology, Some(AccessTech::new("10")));
        assert_eq!(status.technology_label(), "E-UTRAN/LTE-M (4G)");
        assert_eq!(monitor.snapshot().status.bandwidth_mhz, "10");
    }

    #[test]
    fn operator_reply_without_technology_means_gsm() {
        let mut monitor = monitor();
        monitor.ingest(PollCommand::Operator, "+COPS: 0,2,\"26201\",7", at(0));
        monitor.ingest(PollCommand::Operator, "+COPS: 0,2,\"26201\"", at(1));
        monitor.ingest(PollCommand::ServingCell, "+CPSI: arfcn: 62, pci: 1", at(1));

        assert_eq!(monitor.status().technology_label(), "GSM (2G)");
        assert_eq!(monitor.snapshot().status.bandwidth_mhz, "0.2");

        monitor.ingest(PollCommand::Operator, "ERROR", at(2));
        assert_eq!(monitor.status().technology, Some(AccessTech::new("0")));
    }

    #[test]
    fn neighbors_exclude_the_serving_channel() {
        let mut monitor = monitor();
        monitor.ingest(
            PollCommand::ServingCell,
            "earfcn: 6300\r\n6300,215,-80\r\n1300,12,-95\r\n3550,7,-88",
            at(0),
        );

        let snapshot = monitor.snapshot();
        let channels: Vec<_> = snapshot.neighbors.iter().map(|n| n.channel_or_cid).collect();
        assert_eq!(channels, vec![3550, 1300]);
        assert_eq!(snapshot.neighbors[0].band_name, "900 MHz LTE-8");
        assert_eq!(snapshot.active_cell.unwrap().channel, 6300);
    }

    #[test]
    fn reset_clears_everything() {
        let mut monitor = monitor();
        monitor.ingest(PollCommand::ServingCell, SERVING, at(0));
        monitor.ingest(PollCommand::Registration, "+CREG: 2,1,\"1A2B\",\"10\"", at(0));
        monitor.reset();
        assert_eq!(monitor.status(), &LiveStatus::default());
        assert!(monitor.snapshot().history.is_empty());
    }

    #[test]
    fn cycling_profiles_wraps() {
        let mut monitor = monitor();
        monitor.set_profile(15).unwrap();
        assert_eq!(monitor.cycle_profile().vendor, "Generic mobile");
        assert!(monitor.set_profile(99).is_err());
        assert_eq!(monitor.profile_index(), 0);
    }
}
