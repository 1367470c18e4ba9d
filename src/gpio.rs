use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::config::GpioConfig;
use crate::error::AppError;
use crate::report::{Outcome, Reporter, Summary};
use crate::sysfs::{CHIP_PREFIX, ResolveMethod, SysfsPaths};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDescriptor {
    pub name: String,
    pub module: String,
    pub line: u32,
    pub chip_path: PathBuf,
    pub direction: Direction,
}

/// What sysfs knows about one `/dev/gpiochipN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipInfo {
    pub path: PathBuf,
    pub name: String,
    pub sysfs_dir: Option<PathBuf>,
    pub method: Option<ResolveMethod>,
    pub base: Option<u32>,
    pub ngpio: Option<u32>,
    pub label: Option<String>,
}

impl ChipInfo {
    pub fn unresolved(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            sysfs_dir: None,
            method: None,
            base: None,
            ngpio: None,
            label: None,
        }
    }

    pub fn has_chip_name(&self) -> bool {
        self.name.starts_with(CHIP_PREFIX)
    }

    /// Directory name of the sysfs chip entry, e.g. `gpiochip512`.
    pub fn sysfs_name(&self) -> Option<String> {
        self.sysfs_dir
            .as_ref()
            .and_then(|d| d.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn gpio_number(&self, line: u32) -> Option<u32> {
        self.base.and_then(|base| base.checked_add(line))
    }
}

/// Pins sharing a chip path, in first-seen chip order.
pub fn group_by_chip(pins: &[PinDescriptor]) -> Vec<(&Path, Vec<&PinDescriptor>)> {
    let mut groups: Vec<(&Path, Vec<&PinDescriptor>)> = Vec::new();
    let mut index: FxHashMap<&Path, usize> = FxHashMap::default();

    for pin in pins {
        let chip = pin.chip_path.as_path();
        match index.get(chip) {
            Some(&i) => groups[i].1.push(pin),
            None => {
                index.insert(chip, groups.len());
                groups.push((chip, vec![pin]));
            }
        }
    }
    groups
}

pub struct GpioUnexporter {
    sysfs: SysfsPaths,
    dry_run: bool,
    chips: FxHashMap<PathBuf, ChipInfo>,
}

impl GpioUnexporter {
    pub fn new(sysfs: SysfsPaths) -> Self {
        Self {
            sysfs,
            dry_run: false,
            chips: FxHashMap::default(),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolves a chip once per run; later lookups hit the cache.
    pub fn chip_info(&mut self, chip_path: &Path) -> &ChipInfo {
        let sysfs = &self.sysfs;
        self.chips
            .entry(chip_path.to_path_buf())
            .or_insert_with(|| sysfs.resolve_chip(chip_path))
    }

    /// Loads the config at `config_path` and unexports every pin it names.
    pub fn run_from_file<W: Write>(
        &mut self,
        config_path: &Path,
        reporter: &mut Reporter<W>,
    ) -> Result<Summary, AppError> {
        if !config_path.exists() {
            return Err(AppError::ConfigNotFound(config_path.display().to_string()));
        }

        reporter.reading_config(config_path)?;
        let config = GpioConfig::load_from_file(config_path)?;
        let pins = config.collect_pins();

        if pins.is_empty() {
            reporter.no_pins()?;
            return Ok(Summary::default());
        }

        reporter.pins_found(pins.len())?;
        self.run(&pins, reporter)
    }

    pub fn run<W: Write>(
        &mut self,
        pins: &[PinDescriptor],
        reporter: &mut Reporter<W>,
    ) -> Result<Summary, AppError> {
        let mut summary = Summary::default();

        for (chip_path, chip_pins) in group_by_chip(pins) {
            let chip = self.chip_info(chip_path).clone();
            reporter.chip_header(&chip)?;

            if chip.base.is_none() {
                warn!(
                    "skipping {} pin(s) on {}: base not found",
                    chip_pins.len(),
                    chip_path.display()
                );
                if !chip.has_chip_name() {
                    reporter.invalid_chip_path(chip_path)?;
                }
                reporter.chip_unresolved(chip_path)?;
                for _ in &chip_pins {
                    summary.record(Outcome::ChipUnresolved);
                }
                continue;
            }

            reporter.chip_details(&chip)?;

            for pin in chip_pins {
                let outcome = self.unexport_pin(&chip, pin, reporter)?;
                summary.record(outcome);
            }

            reporter.chip_footer()?;
        }

        reporter.summary(&summary, self.dry_run)?;
        Ok(summary)
    }

    fn unexport_pin<W: Write>(
        &self,
        chip: &ChipInfo,
        pin: &PinDescriptor,
        reporter: &mut Reporter<W>,
    ) -> Result<Outcome, AppError> {
        let Some(gpio) = chip.gpio_number(pin.line) else {
            let err = AppError::Gpio(format!(
                "line {} overflows base {:?} of {}",
                pin.line,
                chip.base,
                chip.path.display()
            ));
            warn!("{err}");
            reporter.pin_overflow(pin, &err)?;
            return Ok(Outcome::Failed);
        };

        reporter.pin_header(pin, gpio)?;

        if !self.sysfs.is_exported(gpio) {
            debug!("GPIO {gpio} ({}) is not exported", pin.name);
            reporter.not_exported()?;
            return Ok(Outcome::NotExported);
        }

        if self.dry_run {
            reporter.would_unexport(gpio)?;
            return Ok(Outcome::Unexported);
        }

        match self.sysfs.unexport(gpio) {
            Ok(()) => {
                reporter.unexported(gpio)?;
                Ok(Outcome::Unexported)
            }
            Err(e) => {
                warn!("failed to unexport GPIO {gpio} ({}): {e}", pin.name);
                reporter.unexport_failed(gpio, &e)?;
                Ok(Outcome::Failed)
            }
        }
    }
}
