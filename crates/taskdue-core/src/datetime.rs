use std::sync::OnceLock;

use chrono::{
  DateTime,
  Local,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Timelike
};
use regex::Regex;

use crate::error::ValidationError;
use crate::task::{
  Category,
  Task
};

pub const DATE_FORMAT: &str =
  "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const DEADLINE_FORMAT: &str =
  "%Y-%m-%dT%H:%M";
const DEADLINE_SECONDS_FORMAT: &str =
  "%Y-%m-%dT%H:%M:%S";
const DEADLINE_FRACTION_FORMAT: &str =
  "%Y-%m-%dT%H:%M:%S%.f";
const DISPLAY_FORMAT: &str =
  "%d/%m/%Y %H:%M";

// ASCII digits only; `\d` would admit
// other scripts.
const DATE_SHAPE: &str =
  r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$";
const TIME_SHAPE: &str =
  r"^[0-9]{2}:[0-9]{2}$";

/// Editable projection of a stored
/// task: the deadline split into a
/// calendar date and a wall-clock
/// time, both in local time.
#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct EditableFields {
  pub title:     String,
  pub category:  Category,
  pub date_text: String,
  pub time_text: String
}

#[must_use]
pub fn to_editable_fields(
  task: &Task
) -> EditableFields {
  EditableFields {
    title:     task.title.clone(),
    category:  task.category,
    date_text: task
      .deadline
      .format(DATE_FORMAT)
      .to_string(),
    time_text: task
      .deadline
      .format(TIME_FORMAT)
      .to_string()
  }
}

/// Joins a date and a time field back
/// into one deadline.
///
/// Seconds are always zero. Empty or
/// malformed fields are rejected rather
/// than coerced.
#[tracing::instrument]
pub fn from_editable_fields(
  date_text: &str,
  time_text: &str
) -> Result<NaiveDateTime, ValidationError>
{
  let date_text = date_text.trim();
  let time_text = time_text.trim();

  if date_text.is_empty() {
    return Err(
      ValidationError::Missing {
        field: "date"
      }
    );
  }
  if time_text.is_empty() {
    return Err(
      ValidationError::Missing {
        field: "time"
      }
    );
  }
  if !date_shape().is_match(date_text) {
    return Err(
      ValidationError::Malformed {
        field:    "date",
        value:    date_text.to_string(),
        expected: "YYYY-MM-DD"
      }
    );
  }
  if !time_shape().is_match(time_text) {
    return Err(
      ValidationError::Malformed {
        field:    "time",
        value:    time_text.to_string(),
        expected: "HH:MM"
      }
    );
  }

  let out_of_range = || {
    ValidationError::OutOfRange {
      date: date_text.to_string(),
      time: time_text.to_string()
    }
  };
  let date = NaiveDate::parse_from_str(
    date_text,
    DATE_FORMAT
  )
  .map_err(|_| out_of_range())?;
  let time = NaiveTime::parse_from_str(
    time_text,
    TIME_FORMAT
  )
  .map_err(|_| out_of_range())?;

  Ok(date.and_time(time))
}

/// Parses a deadline as exchanged with
/// the task store.
///
/// Accepts `YYYY-MM-DDTHH:MM` with
/// optional seconds (a space may stand
/// in for the `T`). Values carrying an
/// explicit offset are converted to
/// local time.
pub fn parse_deadline(
  raw: &str
) -> Result<NaiveDateTime, ValidationError>
{
  let token = raw.trim();
  if token.is_empty() {
    return Err(
      ValidationError::Missing {
        field: "deadline"
      }
    );
  }

  let normalized =
    token.replacen(' ', "T", 1);
  for fmt in [
    DEADLINE_FORMAT,
    DEADLINE_SECONDS_FORMAT,
    DEADLINE_FRACTION_FORMAT
  ] {
    if let Ok(parsed) =
      NaiveDateTime::parse_from_str(
        &normalized,
        fmt
      )
    {
      return Ok(parsed);
    }
  }

  if let Ok(parsed) =
    DateTime::parse_from_rfc3339(
      &normalized
    )
  {
    return Ok(
      parsed
        .with_timezone(&Local)
        .naive_local()
    );
  }

  Err(ValidationError::Malformed {
    field:    "deadline",
    value:    token.to_string(),
    expected: "YYYY-MM-DDTHH:MM"
  })
}

#[must_use]
pub fn format_deadline(
  dt: NaiveDateTime
) -> String {
  let fmt = if dt.nanosecond() != 0 {
    DEADLINE_FRACTION_FORMAT
  } else if dt.second() != 0 {
    DEADLINE_SECONDS_FORMAT
  } else {
    DEADLINE_FORMAT
  };
  dt.format(fmt).to_string()
}

/// Day-first rendering used by the task
/// table, e.g. `10/03/2024 14:30`.
#[must_use]
pub fn format_display(
  dt: NaiveDateTime
) -> String {
  dt.format(DISPLAY_FORMAT).to_string()
}

#[must_use]
pub fn local_now() -> NaiveDateTime {
  Local::now().naive_local()
}

fn date_shape() -> &'static Regex {
  static DATE_RE: OnceLock<Regex> =
    OnceLock::new();
  DATE_RE.get_or_init(|| {
    Regex::new(DATE_SHAPE)
      .expect("date shape pattern")
  })
}

fn time_shape() -> &'static Regex {
  static TIME_RE: OnceLock<Regex> =
    OnceLock::new();
  TIME_RE.get_or_init(|| {
    Regex::new(TIME_SHAPE)
      .expect("time shape pattern")
  })
}


pub mod deadline_serde {
  use chrono::NaiveDateTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &NaiveDateTime,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &super::format_deadline(*dt)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDateTime, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_deadline(&raw)
      .map_err(serde::de::Error::custom)
  }
}
