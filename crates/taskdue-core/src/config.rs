use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow,
  bail
};
use tracing::{
  debug,
  info,
  warn
};

const RC_ENV_VAR: &str = "TASKDUERC";
const RC_FILE_NAME: &str = ".taskduerc";
const DATA_DIR_NAME: &str = ".taskdue";

/// Settings read from the rc file and
/// `rc.` overrides.
///
/// Only three keys exist:
/// `data.location`, `color` and
/// `confirm.delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub data_location:  Option<PathBuf>,
  pub color:          bool,
  pub confirm_delete: bool,
  pub source:         Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_location:  None,
      color:          true,
      confirm_delete: true,
      source:         None
    }
  }
}

impl Config {
  /// Reads the rc file picked by
  /// `--taskduerc`, then `TASKDUERC`,
  /// then `~/.taskduerc`. No file means
  /// defaults.
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let Some(path) =
      locate_rc(rc_override)
    else {
      debug!("no rc file; using defaults");
      return Ok(cfg);
    };

    info!(rc = %path.display(), "loading rc file");
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    cfg.read_str(
      &text,
      &path.display().to_string()
    )?;
    cfg.source = Some(path);
    Ok(cfg)
  }

  /// Applies `key = value` lines. `#`
  /// starts a comment; blank lines are
  /// skipped.
  pub fn read_str(
    &mut self,
    text: &str,
    origin: &str
  ) -> anyhow::Result<()> {
    for (idx, raw) in
      text.lines().enumerate()
    {
      let line = raw
        .split('#')
        .next()
        .unwrap_or_default()
        .trim();
      if line.is_empty() {
        continue;
      }

      let Some((key, value)) =
        line.split_once('=')
      else {
        bail!(
          "{origin}:{}: expected \
           `key = value`, got {raw:?}",
          idx + 1
        );
      };
      self
        .set(key.trim(), value.trim())
        .with_context(|| {
          format!(
            "{origin}:{}",
            idx + 1
          )
        })?;
    }
    Ok(())
  }

  /// Command-line overrides; a leading
  /// `rc.` on the key is optional.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      let key = key
        .strip_prefix("rc.")
        .unwrap_or(&key);
      debug!(key, value = %value, "applying override");
      self
        .set(key, &value)
        .with_context(|| {
          format!("override rc.{key}")
        })?;
    }
    Ok(())
  }

  /// Unknown keys are logged and
  /// ignored; a known key with a bad
  /// value is an error.
  pub fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    match key {
      | "data.location" => {
        self.data_location =
          if value.is_empty() {
            None
          } else {
            Some(expand_home(value))
          };
      }
      | "color" => {
        self.color = parse_switch(value)?;
      }
      | "confirm.delete" => {
        self.confirm_delete =
          parse_switch(value)?;
      }
      | other => {
        warn!(key = other, "ignoring unknown setting");
      }
    }
    Ok(())
  }

  /// `--data` wins over
  /// `data.location`, which wins over
  /// `~/.taskdue`. The directory is
  /// created when missing.
  #[tracing::instrument(skip(self))]
  pub fn data_dir(
    &self,
    override_dir: Option<&Path>
  ) -> anyhow::Result<PathBuf> {
    let dir = match (
      override_dir,
      &self.data_location
    ) {
      | (Some(dir), _) => {
        dir.to_path_buf()
      }
      | (None, Some(dir)) => dir.clone(),
      | (None, None) => dirs::home_dir()
        .map(|home| {
          home.join(DATA_DIR_NAME)
        })
        .ok_or_else(|| {
          anyhow!(
            "cannot determine home \
             directory; pass --data"
          )
        })?
    };

    if !dir.is_dir() {
      info!(dir = %dir.display(), "creating data directory");
      fs::create_dir_all(&dir)
        .with_context(|| {
          format!(
            "failed to create {}",
            dir.display()
          )
        })?;
    }
    Ok(dir)
  }
}

fn locate_rc(
  rc_override: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = rc_override {
    return Some(path.to_path_buf());
  }

  match std::env::var_os(RC_ENV_VAR) {
    | Some(value)
      if value.is_empty()
        || value == "/dev/null" =>
    {
      None
    }
    | Some(value) => {
      Some(PathBuf::from(value))
    }
    | None => dirs::home_dir()
      .map(|home| home.join(RC_FILE_NAME))
      .filter(|path| path.is_file())
  }
}

fn expand_home(value: &str) -> PathBuf {
  let path = Path::new(value);
  match (
    path.strip_prefix("~"),
    dirs::home_dir()
  ) {
    | (Ok(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => path.to_path_buf()
  }
}

fn parse_switch(
  value: &str
) -> anyhow::Result<bool> {
  match value
    .to_ascii_lowercase()
    .as_str()
  {
    | "on" | "yes" | "y" | "true"
    | "1" => Ok(true),
    | "off" | "no" | "n" | "false"
    | "0" => Ok(false),
    | other => Err(anyhow!(
      "expected on/off, got {other:?}"
    ))
  }
}
