//! CSV wire-form parsing
//!
//! Wire form, headerless:
//!
//! ```text
//! feature,procedure,observableproperty,epochMillis,value
//!     [,endMillis,quality,accuracy,status,processing,uncertml,comment,location,parameters]
//! ```
//!
//! The literal token `NotAValue` in the value field signals a null
//! observation. A value field that parses as a number yields a numerical
//! observation; anything else yields a categorical one.

use csv::StringRecord;

use crate::app::models::{ProcessingTrail, Puid, SemanticObservation};
use crate::constants::NOT_A_VALUE;
use crate::{Error, Result};

/// Field positions in the wire form
mod fields {
    pub const FEATURE: usize = 0;
    pub const PROCEDURE: usize = 1;
    pub const OBSERVABLE_PROPERTY: usize = 2;
    pub const TIME_START: usize = 3;
    pub const VALUE: usize = 4;
    pub const TIME_END: usize = 5;
    pub const QUALITY: usize = 6;
    pub const ACCURACY: usize = 7;
    pub const STATUS: usize = 8;
    pub const PROCESSING: usize = 9;
    pub const UNCERTML: usize = 10;
    pub const COMMENT: usize = 11;
    pub const LOCATION: usize = 12;
    pub const PARAMETERS: usize = 13;

    pub const REQUIRED: usize = 5;
}

/// Parse one wire record into a semantic observation.
///
/// Rejects records with missing required fields, unparseable timestamps, or
/// a reversed phenomenon time.
pub fn parse_record(record: &StringRecord) -> Result<SemanticObservation> {
    if record.len() < fields::REQUIRED {
        return Err(Error::observation_format(format!(
            "expected at least {} fields, found {}",
            fields::REQUIRED,
            record.len()
        )));
    }

    let puid = Puid::new(
        required(record, fields::FEATURE, "feature")?,
        required(record, fields::PROCEDURE, "procedure")?,
        required(record, fields::OBSERVABLE_PROPERTY, "observableproperty")?,
    );

    let time_start = parse_millis(required(record, fields::TIME_START, "epochMillis")?)?;
    let time_end = match optional(record, fields::TIME_END) {
        Some(raw) => parse_millis(raw)?,
        None => time_start,
    };

    let value = required(record, fields::VALUE, "value")?;
    let observation = if value == NOT_A_VALUE {
        SemanticObservation::numerical(puid, time_start, time_end, None)?
    } else if let Ok(numeric) = value.parse::<f64>() {
        SemanticObservation::numerical(puid, time_start, time_end, Some(numeric))?
    } else {
        SemanticObservation::categorical(puid, time_start, time_end, value)?
    };

    Ok(observation.with_trail(parse_trail(record)?))
}

fn parse_trail(record: &StringRecord) -> Result<ProcessingTrail> {
    let mut trail = ProcessingTrail::default();
    if let Some(raw) = optional(record, fields::QUALITY) {
        trail.quality = raw.parse().map_err(|_| {
            Error::observation_format(format!("quality field '{raw}' is not an integer"))
        })?;
    }
    if let Some(raw) = optional(record, fields::ACCURACY) {
        trail.accuracy = raw.parse().map_err(|_| {
            Error::observation_format(format!("accuracy field '{raw}' is not an integer"))
        })?;
    }
    trail.status = optional(record, fields::STATUS).unwrap_or_default().to_string();
    trail.processing = optional(record, fields::PROCESSING)
        .unwrap_or_default()
        .to_string();
    trail.uncertml = optional(record, fields::UNCERTML)
        .unwrap_or_default()
        .to_string();
    trail.comment = optional(record, fields::COMMENT)
        .unwrap_or_default()
        .to_string();
    trail.location = optional(record, fields::LOCATION)
        .unwrap_or_default()
        .to_string();
    trail.parameters = optional(record, fields::PARAMETERS)
        .unwrap_or_default()
        .to_string();
    Ok(trail)
}

fn required<'a>(record: &'a StringRecord, index: usize, name: &str) -> Result<&'a str> {
    match record.get(index).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::observation_format(format!(
            "missing required field '{name}'"
        ))),
    }
}

fn optional<'a>(record: &'a StringRecord, index: usize) -> Option<&'a str> {
    record
        .get(index)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_millis(raw: &str) -> Result<i64> {
    raw.parse::<i64>().map_err(|_| {
        Error::observation_format(format!("timestamp '{raw}' is not epoch milliseconds"))
    })
}
