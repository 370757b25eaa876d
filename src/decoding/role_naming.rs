//! Display names for per-unit telemetry.
//!
//! Amplifier and power-supply fields arrive as one row per unit. A single row
//! describes a standalone system. With several rows, row 0 is the combiner,
//! row 1 the master and every later row a slave numbered from 1.

use std::fmt;

/// Hardware unit a matrix column refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    PowerAmplifier,
    PowerSupply,
}

impl UnitKind {
    pub fn prefix(self) -> &'static str {
        match self {
            UnitKind::PowerAmplifier => "PA",
            UnitKind::PowerSupply => "PS",
        }
    }

    /// Columns decoded per row.
    pub fn width(self) -> usize {
        match self {
            UnitKind::PowerAmplifier => 4,
            UnitKind::PowerSupply => 2,
        }
    }
}

/// How the combiner row of a multi-unit field is reported.
///
/// The combiner row yields its entries once. Repeated names come only from
/// `RowPair` fields, whose rows are all kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinerPolicy {
    /// One `CMBNR <suffix>` entry holding the row's first value.
    ByRow,
    /// `CMBNR <suffix> 1` and `CMBNR <suffix> 2` from the first two values.
    PerColumnPair,
    /// No combiner entry.
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRole {
    Single,
    Combiner,
    Master,
    /// Slave number, starting at 1.
    Slave(usize),
}

impl UnitRole {
    pub fn for_row(row: usize, rows: usize) -> Self {
        match row {
            0 if rows == 1 => UnitRole::Single,
            0 => UnitRole::Combiner,
            1 => UnitRole::Master,
            n => UnitRole::Slave(n - 1),
        }
    }
}

impl fmt::Display for UnitRole {
    /// Label prefix including its trailing space; empty for a single unit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRole::Single => Ok(()),
            UnitRole::Combiner => f.write_str("CMBNR "),
            UnitRole::Master => f.write_str("MSTR "),
            UnitRole::Slave(n) => write!(f, "SLV_{} ", n),
        }
    }
}

/// `"[role ]<UNIT><column+1> <suffix>"`
pub fn unit_label(role: UnitRole, unit: UnitKind, column: usize, suffix: &str) -> String {
    format!("{}{}{} {}", role, unit.prefix(), column + 1, suffix)
}

/// Label of a per-system scalar, `"[role ]<suffix>"`.
pub fn system_label(role: UnitRole, suffix: &str) -> String {
    format!("{}{}", role, suffix)
}

pub fn combiner_label(suffix: &str) -> String {
    system_label(UnitRole::Combiner, suffix)
}

/// `"CMBNR <suffix> <n>"`, `n` starting at 1.
pub fn combiner_column_label(suffix: &str, column: usize) -> String {
    format!("{} {}", combiner_label(suffix), column + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_by_row() {
        assert_eq!(UnitRole::for_row(0, 1), UnitRole::Single);
        assert_eq!(UnitRole::for_row(0, 3), UnitRole::Combiner);
        assert_eq!(UnitRole::for_row(1, 3), UnitRole::Master);
        assert_eq!(UnitRole::for_row(2, 3), UnitRole::Slave(1));
        assert_eq!(UnitRole::for_row(5, 6), UnitRole::Slave(4));
    }

    #[test]
    fn test_labels() {
        let pa = UnitKind::PowerAmplifier;
        assert_eq!(unit_label(UnitRole::Single, pa, 0, "Alarm"), "PA1 Alarm");
        assert_eq!(
            unit_label(UnitRole::Master, UnitKind::PowerSupply, 1, "DC Voltage"),
            "MSTR PS2 DC Voltage"
        );
        assert_eq!(
            unit_label(UnitRole::Slave(2), pa, 3, "Fan Speed"),
            "SLV_2 PA4 Fan Speed"
        );
        assert_eq!(combiner_label("Alarm"), "CMBNR Alarm");
        assert_eq!(
            combiner_column_label("Heatsink Temp", 1),
            "CMBNR Heatsink Temp 2"
        );
        assert_eq!(system_label(UnitRole::Single, "DFS BIAS"), "DFS BIAS");
        assert_eq!(system_label(UnitRole::Slave(1), "DFS BIAS"), "SLV_1 DFS BIAS");
    }
}
