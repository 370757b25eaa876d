//! Field tables of the known telemetry message types.
//!
//! Each entry maps one payload key to its JSON layout, its value kind and the
//! display names it produces. Entries are decoded in table order, which is
//! also the column order of the query output.

use super::role_naming::{CombinerPolicy, UnitKind};

use CombinerPolicy::{Break, ByRow, PerColumnPair};
use Layout::{FirstElement, Pair, RowPair, Scalar, UnitList};
use UnitKind::{PowerAmplifier as PA, PowerSupply as PS};
use ValueKind::{Float, Int, Text};

/// Name of the column holding the event receipt time. The trailing spaces pad
/// the column to the width of the rendered instant.
pub const TIMESTAMP_COLUMN: &str = "Timestamp (UTC)      ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Scalar(&'static str),
    /// Array; element 0 when non-empty.
    FirstElement(&'static str),
    /// Array; elements 0 and 1 when non-empty.
    Pair(&'static str, &'static str),
    /// Matrix; elements 0 and 1 of every row.
    RowPair(&'static str, &'static str),
    /// Matrix with one row per unit, named by role.
    UnitMatrix {
        unit: UnitKind,
        combiner: CombinerPolicy,
        suffix: &'static str,
    },
    /// Array with one value per unit, named by role.
    UnitList(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub layout: Layout,
    pub kind: ValueKind,
}

const fn field(key: &'static str, layout: Layout, kind: ValueKind) -> FieldSpec {
    FieldSpec { key, layout, kind }
}

const fn units(unit: UnitKind, combiner: CombinerPolicy, suffix: &'static str) -> Layout {
    Layout::UnitMatrix {
        unit,
        combiner,
        suffix,
    }
}

pub const FM_FIELDS: &[FieldSpec] = &[
    field("rs", Scalar("DFS State"), Int),
    field("ec[]", FirstElement("DFS Error"), Int),
    field("ll[]", RowPair("DFS Line Lvl 1", "DFS Line Lvl 2"), Float),
    field("paa[]", units(PA, ByRow, "Alarm"), Int),
    field("saa[]", units(PS, Break, "Alarm"), Int),
];

pub const CC_FIELDS: &[FieldSpec] = &[
    field("cf", Scalar("DFS Centre Freq"), Int),
    field("sl", Scalar("DFS Src LSB"), Int),
    field("su", Scalar("DFS Src USB"), Int),
    field("cl", Scalar("DFS Carrier Lvl"), Int),
    field("la", Scalar("DFS Lvl Adj"), Float),
    field("f[]", Pair("DFS Tone 1 Freq", "DFS Tone 2 Freq"), Float),
    field("t[]", Pair("DFS Tone 1 Time", "DFS Tone 2 Time"), Float),
    field("km[]", FirstElement("DFS Key Mask"), Int),
    field("pl", Scalar("DFS Power Lvl"), Int),
    field("vd", Scalar("DFS VDAC"), Int),
    field("zr", Scalar("DFS Amp z-Ratio"), Int),
    field("lm", Scalar("DFS Lvl Max"), Float),
];

pub const HC_FIELDS: &[FieldSpec] = &[
    field("u1fv[]", FirstElement("DFS U1 Firmware V"), Text),
    field("u1sn[]", FirstElement("DFS Serial Num"), Int),
    field("u2p[]", FirstElement("DFS U2 Comm Errors"), Int),
    field("u2fv[]", FirstElement("DFS U2 Firmware V"), Text),
    field("u2pafv[]", units(PA, ByRow, "Firmware V"), Text),
    field("u2pasn[]", units(PA, ByRow, "Serial Num"), Int),
    field("u2psp[]", units(PS, Break, "Comm Errors"), Int),
    field("u2pssn[]", units(PS, Break, "Serial Num"), Text),
];

pub const SM_FIELDS: &[FieldSpec] = &[
    field("is[]", units(PS, Break, "Supply Current"), Int),
    field("vs[]", units(PS, Break, "DC Voltage"), Int),
    field("ts[]", units(PS, Break, "Heatsink Temp"), Int),
    field("ia[]", units(PA, ByRow, "Supply Current"), Int),
    field("ta[]", units(PA, PerColumnPair, "Heatsink Temp"), Int),
    field("fa[]", units(PA, Break, "Fan Speed"), Int),
    field("pa[]", units(PA, Break, "RF Lvl Out"), Int),
    field("vc[]", units(PA, Break, "RF Lvl Comb."), Int),
    field("om[]", units(PA, ByRow, "Main On-Time"), Int),
    field("ob[]", units(PA, ByRow, "BIAS On-Time"), Int),
    field("of[]", units(PA, ByRow, "Fan On-Time"), Int),
    field("bi[]", UnitList("DFS BIAS"), Int),
    field("me[]", UnitList("PA & PS Enable"), Int),
];
