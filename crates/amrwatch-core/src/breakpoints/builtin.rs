use crate::breakpoints::schema::BreakpointTable;
use crate::breakpoints::validate_table;
use crate::error::AmrError;

const EUCAST_14_JSON: &str = include_str!("../../../../breakpoints/eucast-14.json");
const CLSI_34_JSON: &str = include_str!("../../../../breakpoints/clsi-34.json");

/// Available embedded breakpoint tables.
pub const PRESETS: &[&str] = &["eucast-14", "clsi-34"];

/// Version id used when no configuration names one.
pub const DEFAULT_PRESET: &str = "eucast-14";

/// Load an embedded breakpoint table by id.
pub fn load_preset(name: &str) -> Result<BreakpointTable, AmrError> {
    let json = match name {
        "eucast-14" => EUCAST_14_JSON,
        "clsi-34" => CLSI_34_JSON,
        _ => {
            return Err(AmrError::BreakpointInvalid(format!(
                "unknown preset '{}'. Available: {}",
                name,
                PRESETS.join(", ")
            )))
        }
    };
    let table: BreakpointTable = serde_json::from_str(json)?;
    validate_table(&table)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_load_eucast_preset() {
        let table = load_preset("eucast-14").unwrap();
        assert_eq!(table.standard, "EUCAST");
        assert!(!table.entries.is_empty());
        let cip = table.lookup("escherichia_coli", "ciprofloxacin").unwrap();
        assert_eq!(cip.susceptible_max, dec!(0.25));
        assert_eq!(cip.resistant_min, dec!(1));
    }

    #[test]
    fn test_load_clsi_preset() {
        let table = load_preset("clsi-34").unwrap();
        assert_eq!(table.label(), "CLSI 34");
    }

    #[test]
    fn test_all_presets_load() {
        for name in PRESETS {
            assert!(load_preset(name).is_ok(), "preset {name} failed to load");
        }
        assert!(PRESETS.contains(&DEFAULT_PRESET));
    }

    #[test]
    fn test_unknown_preset() {
        assert!(load_preset("xyz").is_err());
    }
}
