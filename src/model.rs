use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Column order of the backing table.
pub const COLUMNS: [&str; 7] = [
    "id",
    "crop",
    "pests",
    "pesticides",
    "area_hectares",
    "cities",
    "created_at",
];

/// One cultivation entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    /// Unique, assigned as max existing id + 1
    pub id: u64,

    pub crop: String,

    /// Comma-separated pest names, stored raw
    pub pests: String,

    /// Comma-separated pesticide names, stored raw
    pub pesticides: String,

    /// Always > 0
    pub area_hectares: f64,

    /// Comma-separated city names, stored raw
    pub cities: String,

    /// Set once at registration
    pub created_at: DateTime<Utc>,
}

/// The text fields the engine can tokenize, filter and tabulate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Crop,
    Pests,
    Pesticides,
    Cities,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Crop, Field::Pests, Field::Pesticides, Field::Cities];

    pub fn name(self) -> &'static str {
        match self {
            Field::Crop => "crop",
            Field::Pests => "pests",
            Field::Pesticides => "pesticides",
            Field::Cities => "cities",
        }
    }

    /// Raw stored text of this field on `record`.
    pub fn raw(self, record: &Record) -> &str {
        match self {
            Field::Crop => &record.crop,
            Field::Pests => &record.pests,
            Field::Pesticides => &record.pesticides,
            Field::Cities => &record.cities,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ValidationError;

    /// Accepts the role names and the column names of the legacy
    /// Portuguese-language table.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crop" | "crops" | "cultivo" | "cultivos" => Ok(Field::Crop),
            "pest" | "pests" | "praga" | "pragas" => Ok(Field::Pests),
            "pesticide" | "pesticides" | "defensivo" | "defensivos" => Ok(Field::Pesticides),
            "city" | "cities" | "cidade" | "cidades" | "cidade_plantio" => Ok(Field::Cities),
            _ => Err(ValidationError::UnknownField(s.to_string())),
        }
    }
}

/// Unvalidated registration input, as typed by a user.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RecordDraft {
    pub crop: String,
    pub pests: String,
    pub pesticides: String,
    #[serde(deserialize_with = "area_as_text")]
    pub area_hectares: String,
    pub cities: String,
}

impl RecordDraft {
    /// Mutable access to a field's raw text.
    pub fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Crop => &mut self.crop,
            Field::Pests => &mut self.pests,
            Field::Pesticides => &mut self.pesticides,
            Field::Cities => &mut self.cities,
        }
    }

    pub fn validate(&self, id: u64, created_at: DateTime<Utc>) -> Result<Record, ValidationError> {
        let crop = self.crop.trim();
        if crop.is_empty() {
            return Err(ValidationError::EmptyCrop);
        }

        let area_hectares = parse_area(&self.area_hectares)?;

        Ok(Record {
            id,
            crop: crop.to_string(),
            pests: self.pests.trim().to_string(),
            pesticides: self.pesticides.trim().to_string(),
            area_hectares,
            cities: self.cities.trim().to_string(),
            created_at,
        })
    }
}

/// Parses a hectare figure. Non-finite values count as non-numeric.
pub fn parse_area(text: &str) -> Result<f64, ValidationError> {
    let text = text.trim();
    let area: f64 = text
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| ValidationError::AreaNotNumeric(text.to_string()))?;

    if area <= 0.0 {
        return Err(ValidationError::AreaNotPositive(area));
    }
    Ok(area)
}

// JSON clients send the area either as a number or as the raw form text.
fn area_as_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AreaInput {
        Number(f64),
        Text(String),
    }

    Ok(match AreaInput::deserialize(deserializer)? {
        AreaInput::Number(n) => n.to_string(),
        AreaInput::Text(s) => s,
    })
}
