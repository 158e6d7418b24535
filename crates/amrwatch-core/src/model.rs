use crate::error::AmrError;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Categorical susceptibility call derived from a measured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SusceptibilityCall {
    Susceptible,
    Intermediate,
    Resistant,
    /// No breakpoint exists for the organism/antibiotic pair.
    NotEstablished,
}

impl SusceptibilityCall {
    pub fn code(&self) -> &'static str {
        match self {
            SusceptibilityCall::Susceptible => "S",
            SusceptibilityCall::Intermediate => "I",
            SusceptibilityCall::Resistant => "R",
            SusceptibilityCall::NotEstablished => "NE",
        }
    }

    pub fn from_code(s: &str) -> Option<SusceptibilityCall> {
        match s.trim().to_uppercase().as_str() {
            "S" | "SUSCEPTIBLE" => Some(SusceptibilityCall::Susceptible),
            "I" | "INTERMEDIATE" => Some(SusceptibilityCall::Intermediate),
            "R" | "RESISTANT" => Some(SusceptibilityCall::Resistant),
            "NE" => Some(SusceptibilityCall::NotEstablished),
            _ => None,
        }
    }

    /// One step towards Resistant (S -> I -> R). NotEstablished stays put.
    pub fn escalate(self) -> SusceptibilityCall {
        match self {
            SusceptibilityCall::Susceptible => SusceptibilityCall::Intermediate,
            SusceptibilityCall::Intermediate => SusceptibilityCall::Resistant,
            other => other,
        }
    }
}

impl fmt::Display for SusceptibilityCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SusceptibilityCall::Susceptible => write!(f, "Susceptible"),
            SusceptibilityCall::Intermediate => write!(f, "Intermediate"),
            SusceptibilityCall::Resistant => write!(f, "Resistant"),
            SusceptibilityCall::NotEstablished => write!(f, "Not established"),
        }
    }
}

/// A laboratory result for one antibiotic.
///
/// Serialized as the string a lab would print: `"0.5"`, `"<=0.25"`, `">32"` or `"R"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MeasuredValue {
    /// An on-scale MIC.
    Mic(Decimal),
    /// Off-scale low: the true MIC is at most this value.
    AtMost(Decimal),
    /// Off-scale high: the true MIC exceeds this value.
    Above(Decimal),
    /// A categorical call reported directly by the laboratory.
    Reported(SusceptibilityCall),
}

impl MeasuredValue {
    /// Returns the numeric bound, if the value is numeric.
    pub fn numeric(&self) -> Option<Decimal> {
        match self {
            MeasuredValue::Mic(v) | MeasuredValue::AtMost(v) | MeasuredValue::Above(v) => Some(*v),
            MeasuredValue::Reported(_) => None,
        }
    }
}

impl fmt::Display for MeasuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasuredValue::Mic(v) => write!(f, "{v}"),
            MeasuredValue::AtMost(v) => write!(f, "<={v}"),
            MeasuredValue::Above(v) => write!(f, ">{v}"),
            MeasuredValue::Reported(call) => write!(f, "{}", call.code()),
        }
    }
}

impl TryFrom<String> for MeasuredValue {
    type Error = AmrError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        crate::parsing::values::parse_value(&s)?
            .ok_or_else(|| AmrError::ParseError(format!("empty result value '{s}'")))
    }
}

impl From<MeasuredValue> for String {
    fn from(v: MeasuredValue) -> String {
        v.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecimenSource {
    Blood,
    Urine,
    Respiratory,
    Wound,
    Stool,
    Csf,
    Other,
}

impl fmt::Display for SpecimenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecimenSource::Blood => write!(f, "Blood"),
            SpecimenSource::Urine => write!(f, "Urine"),
            SpecimenSource::Respiratory => write!(f, "Respiratory"),
            SpecimenSource::Wound => write!(f, "Wound"),
            SpecimenSource::Stool => write!(f, "Stool"),
            SpecimenSource::Csf => write!(f, "CSF"),
            SpecimenSource::Other => write!(f, "Other"),
        }
    }
}

/// One pathogen recovery event as handed over by the ingestion layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Isolate {
    pub id: String,
    /// Organism as recorded; normalized at interpretation time.
    pub organism: String,
    #[serde(default)]
    pub specimen: Option<SpecimenSource>,
    pub collected: NaiveDate,
    #[serde(default)]
    pub ward: Option<String>,
    /// Antibiotic name (as recorded) -> laboratory result. Cells marked as
    /// not tested (`""`, `"-"`, `"n.a."`) are dropped when reading.
    #[serde(deserialize_with = "deserialize_results")]
    pub results: BTreeMap<String, MeasuredValue>,
}

fn deserialize_results<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, MeasuredValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    let mut results = BTreeMap::new();
    for (name, cell) in raw {
        let parsed = crate::parsing::values::parse_value(&cell)
            .map_err(|e| serde::de::Error::custom(format!("result '{name}': {e}")))?;
        if let Some(value) = parsed {
            results.insert(name, value);
        }
    }
    Ok(results)
}

/// An inclusive date range used as the time component of a surveillance key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Period, AmrError> {
        if start > end {
            return Err(AmrError::Validation(format!(
                "period start {start} is after end {end}"
            )));
        }
        Ok(Period { start, end })
    }

    pub fn year(year: i32) -> Option<Period> {
        Some(Period {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    pub fn quarter(year: i32, quarter: u32) -> Option<Period> {
        if !(1..=4).contains(&quarter) {
            return None;
        }
        let first_month = (quarter - 1) * 3 + 1;
        Some(Period {
            start: NaiveDate::from_ymd_opt(year, first_month, 1)?,
            end: last_day_of_month(year, first_month + 2)?,
        })
    }

    pub fn month(year: i32, month: u32) -> Option<Period> {
        Some(Period {
            start: NaiveDate::from_ymd_opt(year, month, 1)?,
            end: last_day_of_month(year, month)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Calendar months overlapping this period, in order.
    pub fn months(&self) -> Vec<Period> {
        let mut out = Vec::new();
        let (mut y, mut m) = (self.start.year(), self.start.month());
        let (end_y, end_m) = (self.end.year(), self.end.month());
        while (y, m) <= (end_y, end_m) {
            if let Some(p) = Period::month(y, m) {
                out.push(p);
            }
            if m == 12 {
                y += 1;
                m = 1;
            } else {
                m += 1;
            }
        }
        out
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sy, sm, sd) = (self.start.year(), self.start.month(), self.start.day());
        let same_year = sy == self.end.year();
        if sd == 1 && same_year && Some(self.end) == last_day_of_month(sy, self.end.month()) {
            let em = self.end.month();
            if sm == 1 && em == 12 {
                return write!(f, "{sy}");
            }
            if sm == em {
                return write!(f, "{sy}-{sm:02}");
            }
            if em == sm + 2 && (sm - 1) % 3 == 0 {
                return write!(f, "{sy}-Q{}", (sm - 1) / 3 + 1);
            }
        }
        write!(f, "{}..{}", self.start, self.end)
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

/// Bucket size for rate tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Month,
    Quarter,
    #[default]
    Year,
}

impl Granularity {
    pub fn bucket(&self, date: NaiveDate) -> Option<Period> {
        match self {
            Granularity::Month => Period::month(date.year(), date.month()),
            Granularity::Quarter => Period::quarter(date.year(), (date.month() - 1) / 3 + 1),
            Granularity::Year => Period::year(date.year()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Month => write!(f, "month"),
            Granularity::Quarter => write!(f, "quarter"),
            Granularity::Year => write!(f, "year"),
        }
    }
}

/// Identity of one surveillance cell: canonical organism, canonical antibiotic, period.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurveillanceKey {
    pub organism: String,
    pub antibiotic: String,
    pub period: Period,
}

impl SurveillanceKey {
    pub fn new(organism: impl Into<String>, antibiotic: impl Into<String>, period: Period) -> Self {
        Self {
            organism: organism.into(),
            antibiotic: antibiotic.into(),
            period,
        }
    }
}

impl fmt::Display for SurveillanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.organism, self.antibiotic, self.period)
    }
}
