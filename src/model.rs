use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Job role codes as they appear as column headers in the pivoted schedule
/// export, with the long display names used everywhere user-facing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Rigger,
    CarRigger,
    DriverFirst,
    DriverSecond,
    Specialist,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Rigger,
        Role::CarRigger,
        Role::DriverFirst,
        Role::DriverSecond,
        Role::Specialist,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Role::Rigger => "T",
            Role::CarRigger => "TC",
            Role::DriverFirst => "C1",
            Role::DriverSecond => "B",
            Role::Specialist => "E",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Rigger => "Trincador",
            Role::CarRigger => "Trincador de Coches",
            Role::DriverFirst => "Conductor de 1a",
            Role::DriverSecond => "Conductor de 2a",
            Role::Specialist => "Especialista",
        }
    }

    pub fn from_code(code: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|r| r.code() == code)
    }
}

/// Which of the two daily queues a door cutoff applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QueueType {
    WorkingDay,
    Holiday,
}

/// Shift/time-window code. Four 6-hour windows plus the holiday marker.
///
/// Source sheets spell these inconsistently ("20-02", "20 a 02", "20a02",
/// "Festivo 2"), so construction goes through [`ShiftCode::from_raw`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ShiftCode {
    Night02_08,
    Morning08_14,
    Afternoon14_20,
    Evening20_02,
    Holiday,
}

impl ShiftCode {
    pub const ALL: [ShiftCode; 5] = [
        ShiftCode::Night02_08,
        ShiftCode::Morning08_14,
        ShiftCode::Afternoon14_20,
        ShiftCode::Evening20_02,
        ShiftCode::Holiday,
    ];

    /// Canonical spelling, used for persistence and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftCode::Night02_08 => "02-08",
            ShiftCode::Morning08_14 => "08-14",
            ShiftCode::Afternoon14_20 => "14-20",
            ShiftCode::Evening20_02 => "20-02",
            ShiftCode::Holiday => "Festivo",
        }
    }

    pub fn from_canonical(s: &str) -> Option<ShiftCode> {
        ShiftCode::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    /// Tolerant match against the raw cell value: whitespace stripped,
    /// case-insensitive, separator may be "-", "a" or absent.
    pub fn from_raw(raw: &str) -> Option<ShiftCode> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if cleaned.is_empty() {
            return None;
        }
        if cleaned.contains("festivo") {
            return Some(ShiftCode::Holiday);
        }
        for code in [
            ShiftCode::Night02_08,
            ShiftCode::Morning08_14,
            ShiftCode::Afternoon14_20,
            ShiftCode::Evening20_02,
        ] {
            let canon = code.as_str();
            let (start, end) = (&canon[..2], &canon[3..]);
            let joined = format!("{start}{end}");
            let dashed = format!("{start}-{end}");
            let lettered = format!("{start}a{end}");
            if cleaned.contains(&dashed) || cleaned.contains(&lettered) || cleaned.contains(&joined)
            {
                return Some(code);
            }
        }
        None
    }

    pub fn queue_type(&self) -> QueueType {
        match self {
            ShiftCode::Holiday => QueueType::Holiday,
            _ => QueueType::WorkingDay,
        }
    }
}

/// Provenance of a schedule assignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Origin {
    Csv,
    Manual,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Csv => "csv",
            Origin::Manual => "manual",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Origin> {
        match s {
            "csv" => Some(Origin::Csv),
            "manual" => Some(Origin::Manual),
            _ => None,
        }
    }
}

/// Availability status tiers in the census. The ordinal (0..=4) comes from
/// the source sheet; the tiers are opaque beyond their ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusColor {
    Red,
    Orange,
    Yellow,
    Blue,
    Green,
}

impl StatusColor {
    pub fn from_code(code: i64) -> Option<StatusColor> {
        match code {
            0 => Some(StatusColor::Red),
            1 => Some(StatusColor::Orange),
            2 => Some(StatusColor::Yellow),
            3 => Some(StatusColor::Blue),
            4 => Some(StatusColor::Green),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            StatusColor::Red => 0,
            StatusColor::Orange => 1,
            StatusColor::Yellow => 2,
            StatusColor::Blue => 3,
            StatusColor::Green => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusColor::Red => "red",
            StatusColor::Orange => "orange",
            StatusColor::Yellow => "yellow",
            StatusColor::Blue => "blue",
            StatusColor::Green => "green",
        }
    }
}

/// One worker's assignment to one shift on one date ("jornal").
///
/// Worker ids stay strings end to end so leading zeros and legacy ids
/// round-trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleAssignment {
    pub date: NaiveDate,
    pub worker_id: String,
    pub role: Role,
    pub shift: ShiftCode,
    pub company: String,
    pub vessel: String,
    pub batch_number: String,
    pub origin: Origin,
}

/// A worker's slot in the rotation census. `position` is always the
/// recomputed traversal index, never a value read from the sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub position: i64,
    pub worker_id: String,
    pub color: StatusColor,
}

/// Door cutoffs reported for one shift: the last roster position called in
/// the primary sub-range and in the secondary/overflow sub-range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoorCutoff {
    pub shift: ShiftCode,
    pub primary: Option<i64>,
    pub secondary: Option<i64>,
}

/// Positions remaining until a worker is called, per queue. `None` means no
/// applicable cutoff was reported, i.e. unknown rather than zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QueueDistances {
    pub working_day: Option<i64>,
    pub holiday: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_spellings_all_resolve() {
        for raw in ["20-02", "20 a 02", "20a02", " 20A02 ", "20 - 02"] {
            assert_eq!(
                ShiftCode::from_raw(raw),
                Some(ShiftCode::Evening20_02),
                "failed on {raw:?}"
            );
        }
        assert_eq!(ShiftCode::from_raw("Festivo 2"), Some(ShiftCode::Holiday));
        assert_eq!(ShiftCode::from_raw("festivo"), Some(ShiftCode::Holiday));
        assert_eq!(ShiftCode::from_raw("09-15"), None);
        assert_eq!(ShiftCode::from_raw(""), None);
    }

    #[test]
    fn canonical_round_trip() {
        for code in ShiftCode::ALL {
            assert_eq!(ShiftCode::from_canonical(code.as_str()), Some(code));
        }
        for role in Role::ALL {
            assert_eq!(Role::from_code(role.code()), Some(role));
        }
    }

    #[test]
    fn queue_type_split() {
        assert_eq!(ShiftCode::Holiday.queue_type(), QueueType::Holiday);
        assert_eq!(ShiftCode::Night02_08.queue_type(), QueueType::WorkingDay);
    }

    #[test]
    fn color_codes() {
        assert_eq!(StatusColor::from_code(0), Some(StatusColor::Red));
        assert_eq!(StatusColor::from_code(4), Some(StatusColor::Green));
        assert_eq!(StatusColor::from_code(5), None);
        assert_eq!(StatusColor::from_code(-1), None);
        assert_eq!(StatusColor::Blue.label(), "blue");
    }
}
