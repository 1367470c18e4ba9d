use std::io::{self, Write};
use std::path::Path;

use crate::error::AppError;
use crate::gpio::{ChipInfo, PinDescriptor};

const RULE_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unexported,
    NotExported,
    Failed,
    ChipUnresolved,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub unexported: usize,
    pub skipped: usize,
    pub errors: usize,
    pub unresolved: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Unexported => self.unexported += 1,
            Outcome::NotExported => self.skipped += 1,
            Outcome::Failed => self.errors += 1,
            Outcome::ChipUnresolved => self.unresolved += 1,
        }
    }

    /// Pins whose export node was looked at (or whose number could not be formed).
    pub fn checked(&self) -> usize {
        self.unexported + self.skipped + self.errors
    }
}

/// Human-readable progress output.
pub struct Reporter<W: Write> {
    out: W,
    verbose: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn reading_config(&mut self, path: &Path) -> io::Result<()> {
        writeln!(self.out, "Reading configuration from: {}", path.display())
    }

    pub fn no_pins(&mut self) -> io::Result<()> {
        writeln!(self.out, "No GPIO pins found in configuration")
    }

    pub fn pins_found(&mut self, count: usize) -> io::Result<()> {
        writeln!(self.out, "Found {count} GPIO pins in configuration\n")
    }

    pub fn chip_header(&mut self, chip: &ChipInfo) -> io::Result<()> {
        writeln!(self.out, "GPIO Chip: {}", chip.path.display())
    }

    pub fn invalid_chip_path(&mut self, chip_path: &Path) -> io::Result<()> {
        writeln!(self.out, "  Warning: Invalid chip path: {}", chip_path.display())
    }

    pub fn chip_unresolved(&mut self, chip_path: &Path) -> io::Result<()> {
        writeln!(
            self.out,
            "  Warning: Could not determine base for {}",
            chip_path.display()
        )?;
        writeln!(self.out, "  (sysfs interface may not be available)")
    }

    pub fn chip_details(&mut self, chip: &ChipInfo) -> io::Result<()> {
        if self.verbose {
            if let Some(name) = chip.sysfs_name() {
                writeln!(self.out, "  sysfs: {name}")?;
            }
            if let Some(base) = chip.base {
                writeln!(self.out, "  Base: {base}")?;
            }
            match chip.ngpio {
                Some(n) => writeln!(self.out, "  Lines: {n}")?,
                None => writeln!(self.out, "  Lines: unknown")?,
            }
            if let Some(label) = &chip.label {
                writeln!(self.out, "  Label: {label}")?;
            }
        }
        writeln!(self.out)
    }

    pub fn chip_footer(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn pin_header(&mut self, pin: &PinDescriptor, gpio: u32) -> io::Result<()> {
        writeln!(
            self.out,
            "  {} (line {} -> GPIO {gpio}):",
            pin.name, pin.line
        )
    }

    pub fn pin_overflow(&mut self, pin: &PinDescriptor, err: &AppError) -> io::Result<()> {
        writeln!(self.out, "  {} (line {}):", pin.name, pin.line)?;
        writeln!(self.out, "    Error: {err}")
    }

    pub fn not_exported(&mut self) -> io::Result<()> {
        writeln!(self.out, "    Not exported, skipping")
    }

    pub fn would_unexport(&mut self, gpio: u32) -> io::Result<()> {
        writeln!(self.out, "    [DRY-RUN] Would unexport GPIO {gpio}")
    }

    pub fn unexported(&mut self, gpio: u32) -> io::Result<()> {
        writeln!(self.out, "    Unexported GPIO {gpio}")
    }

    pub fn unexport_failed(&mut self, gpio: u32, err: &AppError) -> io::Result<()> {
        match err {
            AppError::PermissionDenied(_) => {
                writeln!(self.out, "    Error: Permission denied. Run with sudo.")
            }
            AppError::Gpio(msg) => writeln!(self.out, "    Error unexporting GPIO {gpio}: {msg}"),
            other => writeln!(self.out, "    Error unexporting GPIO {gpio}: {other}"),
        }
    }

    pub fn summary(&mut self, summary: &Summary, dry_run: bool) -> io::Result<()> {
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "Summary:")?;
        writeln!(self.out, "  Unexported: {}", summary.unexported)?;
        writeln!(self.out, "  Skipped (not exported): {}", summary.skipped)?;
        if summary.unresolved > 0 {
            writeln!(self.out, "  Skipped (chip unresolved): {}", summary.unresolved)?;
        }
        if summary.errors > 0 {
            writeln!(self.out, "  Errors: {}", summary.errors)?;
        }
        if dry_run {
            writeln!(self.out, "\n[DRY-RUN mode - no changes were made]")?;
        }
        self.out.flush()
    }
}
