use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Basin schemes
// ---------------------------------------------------------------------------

/// A basin-delineation taxonomy. Contributors report against one of the two
/// source schemes; merged and averaged products use the unified `Sheets`
/// scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasinGroup {
    Zwally,
    Rignot,
    Sheets,
}

impl BasinGroup {
    /// The two source schemes, in the order they are processed.
    pub const SOURCES: [BasinGroup; 2] = [BasinGroup::Zwally, BasinGroup::Rignot];

    pub fn is_source(self) -> bool {
        self != BasinGroup::Sheets
    }
}

impl fmt::Display for BasinGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasinGroup::Zwally => write!(f, "zwally"),
            BasinGroup::Rignot => write!(f, "rignot"),
            BasinGroup::Sheets => write!(f, "sheets"),
        }
    }
}

// ---------------------------------------------------------------------------
// Ice sheets and basin identifiers
// ---------------------------------------------------------------------------

/// Top-level region codes. The first four are ice sheets proper; `Ais` and
/// `All` are regions summed from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceSheet {
    #[serde(alias = "APIS")]
    Apis,
    #[serde(alias = "EAIS")]
    Eais,
    #[serde(alias = "WAIS")]
    Wais,
    #[serde(alias = "AIS")]
    Ais,
    #[serde(alias = "GrIS")]
    Gris,
    #[serde(alias = "ALL")]
    All,
}

impl IceSheet {
    /// Ice sheets that are built from sub-basins (not regional totals).
    pub const SHEETS: [IceSheet; 4] = [IceSheet::Apis, IceSheet::Eais, IceSheet::Wais, IceSheet::Gris];

    pub fn code(self) -> &'static str {
        match self {
            IceSheet::Apis => "APIS",
            IceSheet::Eais => "EAIS",
            IceSheet::Wais => "WAIS",
            IceSheet::Ais => "AIS",
            IceSheet::Gris => "GrIS",
            IceSheet::All => "ALL",
        }
    }
}

impl fmt::Display for IceSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Region a series describes: a whole ice sheet/region, or a sub-basin code
/// of one of the source schemes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BasinId {
    Sheet(IceSheet),
    Basin(String),
}

impl BasinId {
    pub fn basin(code: impl Into<String>) -> Self {
        BasinId::Basin(code.into())
    }

    pub fn sheet(&self) -> Option<IceSheet> {
        match self {
            BasinId::Sheet(s) => Some(*s),
            BasinId::Basin(_) => None,
        }
    }
}

impl From<IceSheet> for BasinId {
    fn from(sheet: IceSheet) -> Self {
        BasinId::Sheet(sheet)
    }
}

impl fmt::Display for BasinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasinId::Sheet(s) => write!(f, "{s}"),
            BasinId::Basin(code) => write!(f, "{code}"),
        }
    }
}

// ---------------------------------------------------------------------------
// BasinTaxonomy – which sub-basins make up each ice sheet
// ---------------------------------------------------------------------------

/// A reported region and the ice sheets whose series sum into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: IceSheet,
    pub sheets: Vec<IceSheet>,
}

/// Immutable basin configuration passed into every operation that needs to
/// know how basins compose ice sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinTaxonomy {
    /// scheme → ice sheet → sub-basin codes.
    pub schemes: BTreeMap<BasinGroup, BTreeMap<IceSheet, Vec<String>>>,
    /// Reported regions, in output order.
    pub regions: Vec<Region>,
}

impl BasinTaxonomy {
    /// Sub-basin codes composing `sheet` in `scheme` (empty when unknown).
    pub fn basins(&self, scheme: BasinGroup, sheet: IceSheet) -> &[String] {
        self.schemes
            .get(&scheme)
            .and_then(|sheets| sheets.get(&sheet))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The ice sheet a sub-basin belongs to.
    pub fn sheet_of(&self, scheme: BasinGroup, code: &str) -> Option<IceSheet> {
        self.schemes.get(&scheme)?.iter().find_map(|(sheet, codes)| {
            codes.iter().any(|c| c == code).then_some(*sheet)
        })
    }

    /// Whether `basin` is a valid identifier in `scheme`. Ice-sheet and
    /// region codes are valid in every scheme; sub-basin codes only in the
    /// source scheme that defines them.
    pub fn contains(&self, scheme: BasinGroup, basin: &BasinId) -> bool {
        match basin {
            BasinId::Sheet(_) => true,
            BasinId::Basin(code) => self.sheet_of(scheme, code).is_some(),
        }
    }
}

impl Default for BasinTaxonomy {
    fn default() -> Self {
        fn codes(list: &[&str]) -> Vec<String> {
            list.iter().map(|c| c.to_string()).collect()
        }
        fn numbered(range: impl Iterator<Item = u32>) -> Vec<String> {
            range.map(|n| n.to_string()).collect()
        }

        let mut zwally = BTreeMap::new();
        zwally.insert(IceSheet::Apis, numbered(24..=27));
        zwally.insert(IceSheet::Eais, numbered(2..=17));
        let mut wais = numbered(std::iter::once(1));
        wais.extend(numbered(18..=23));
        zwally.insert(IceSheet::Wais, wais);
        zwally.insert(
            IceSheet::Gris,
            codes(&[
                "1.1", "1.2", "1.3", "1.4", "2.1", "2.2", "3.1", "3.2", "3.3", "4.1", "4.2",
                "4.3", "5.0", "6.1", "6.2", "7.1", "7.2", "8.1", "8.2",
            ]),
        );

        let mut rignot = BTreeMap::new();
        rignot.insert(IceSheet::Apis, codes(&["Hp-I", "I-Ipp", "Ipp-J"]));
        rignot.insert(
            IceSheet::Eais,
            codes(&[
                "A-Ap", "Ap-B", "B-C", "C-Cp", "Cp-D", "D-Dp", "Dp-E", "E-Ep", "Jpp-K", "K-A",
            ]),
        );
        rignot.insert(IceSheet::Wais, codes(&["Ep-F", "F-G", "G-H", "H-Hp", "J-Jpp"]));
        rignot.insert(IceSheet::Gris, codes(&["NO", "NE", "CE", "SE", "SW", "CW", "NW"]));

        let mut schemes = BTreeMap::new();
        schemes.insert(BasinGroup::Zwally, zwally);
        schemes.insert(BasinGroup::Rignot, rignot);

        let regions = vec![
            Region { id: IceSheet::Eais, sheets: vec![IceSheet::Eais] },
            Region { id: IceSheet::Apis, sheets: vec![IceSheet::Apis] },
            Region { id: IceSheet::Wais, sheets: vec![IceSheet::Wais] },
            Region {
                id: IceSheet::Ais,
                sheets: vec![IceSheet::Apis, IceSheet::Eais, IceSheet::Wais],
            },
            Region { id: IceSheet::Gris, sheets: vec![IceSheet::Gris] },
            Region {
                id: IceSheet::All,
                sheets: vec![IceSheet::Apis, IceSheet::Eais, IceSheet::Wais, IceSheet::Gris],
            },
        ];

        BasinTaxonomy { schemes, regions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_taxonomy_resolves_basins() {
        let tax = BasinTaxonomy::default();
        assert_eq!(tax.basins(BasinGroup::Zwally, IceSheet::Apis).len(), 4);
        assert_eq!(tax.sheet_of(BasinGroup::Zwally, "19"), Some(IceSheet::Wais));
        assert_eq!(tax.sheet_of(BasinGroup::Rignot, "NW"), Some(IceSheet::Gris));
        assert_eq!(tax.sheet_of(BasinGroup::Rignot, "19"), None);
        assert!(tax.basins(BasinGroup::Sheets, IceSheet::Gris).is_empty());
    }

    #[test]
    fn sheet_codes_valid_in_every_scheme() {
        let tax = BasinTaxonomy::default();
        assert!(tax.contains(BasinGroup::Sheets, &IceSheet::Ais.into()));
        assert!(tax.contains(BasinGroup::Zwally, &BasinId::basin("5.0")));
        assert!(!tax.contains(BasinGroup::Sheets, &BasinId::basin("5.0")));
    }

    #[test]
    fn basin_id_deserializes_sheet_or_code() {
        let sheet: BasinId = serde_json::from_str("\"gris\"").unwrap();
        assert_eq!(sheet, BasinId::Sheet(IceSheet::Gris));
        let code: BasinId = serde_json::from_str("\"K-A\"").unwrap();
        assert_eq!(code, BasinId::basin("K-A"));
        assert_eq!(code.sheet(), None);
    }

    #[test]
    fn display_codes_parse_back() {
        for sheet in [IceSheet::Apis, IceSheet::Eais, IceSheet::Wais, IceSheet::Ais, IceSheet::Gris, IceSheet::All] {
            let id: BasinId = serde_json::from_str(&format!("\"{}\"", BasinId::from(sheet))).unwrap();
            assert_eq!(id.sheet(), Some(sheet));
        }
    }

    #[test]
    fn only_zwally_and_rignot_are_sources() {
        assert!(BasinGroup::SOURCES.iter().all(|g| g.is_source()));
        assert!(!BasinGroup::Sheets.is_source());
    }
}
