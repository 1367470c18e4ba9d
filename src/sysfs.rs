//! Legacy sysfs GPIO interface.
//!
//! Chip directories under `/sys/class/gpio` are named after their base
//! number (`gpiochip512`), not after the `/dev/gpiochipN` minor, so mapping a
//! character device onto its sysfs chip takes some probing.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use nix::sys::stat::{major, minor};

use crate::error::AppError;
use crate::gpio::ChipInfo;

pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

pub(crate) const CHIP_PREFIX: &str = "gpiochip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveMethod {
    /// `bus/gpio/devices/<chip>` symlink, sibling `gpio/gpiochip*` directory.
    BusDevice,
    /// `dev` major:minor under `bus/gpio/devices` matches the chip node.
    DeviceNumber,
    /// `class/gpio/<chip>` with the same name as the device node.
    ClassPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsPaths {
    pub bus_devices: PathBuf,
    pub class_gpio: PathBuf,
}

impl Default for SysfsPaths {
    fn default() -> Self {
        Self::with_root(DEFAULT_SYSFS_ROOT)
    }
}

impl SysfsPaths {
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            bus_devices: root.join("bus").join("gpio").join("devices"),
            class_gpio: root.join("class").join("gpio"),
        }
    }

    pub fn unexport_path(&self) -> PathBuf {
        self.class_gpio.join("unexport")
    }

    pub fn export_node(&self, gpio: u32) -> PathBuf {
        self.class_gpio.join(format!("gpio{gpio}"))
    }

    pub fn is_exported(&self, gpio: u32) -> bool {
        self.export_node(gpio).exists()
    }

    /// Writes `gpio` to the unexport control file. The file is never created.
    pub fn unexport(&self, gpio: u32) -> Result<(), AppError> {
        let path = self.unexport_path();
        let payload = gpio.to_string();

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(unexport_error)?;
        file.write_all(payload.as_bytes())
            .map_err(unexport_error)?;

        debug!("wrote {payload} to {}", path.display());
        Ok(())
    }

    pub fn find_chip_dir(&self, chip_path: &Path) -> Option<(PathBuf, ResolveMethod)> {
        let chip_name = chip_path.file_name()?.to_str()?;

        self.via_bus_device(chip_name)
            .map(|d| (d, ResolveMethod::BusDevice))
            .or_else(|| {
                self.via_device_number(chip_path)
                    .map(|d| (d, ResolveMethod::DeviceNumber))
            })
            .or_else(|| {
                self.via_class_path(chip_name)
                    .map(|d| (d, ResolveMethod::ClassPath))
            })
    }

    pub fn resolve_chip(&self, chip_path: &Path) -> ChipInfo {
        let mut info = ChipInfo::unresolved(chip_path);

        if !info.has_chip_name() {
            warn!("Invalid chip path: {}", chip_path.display());
            return info;
        }

        let Some((dir, method)) = self.find_chip_dir(chip_path) else {
            debug!("no sysfs entry for {}", chip_path.display());
            return info;
        };
        debug!(
            "{} resolved to {} via {method:?}",
            chip_path.display(),
            dir.display()
        );

        info.base = read_number(&dir, "base");
        info.ngpio = read_number(&dir, "ngpio");
        info.label = read_attr(&dir, "label");
        info.method = Some(method);
        info.sysfs_dir = Some(dir);
        info
    }

    fn via_bus_device(&self, chip_name: &str) -> Option<PathBuf> {
        let device = self.bus_devices.join(chip_name);
        if !device.exists() {
            return None;
        }
        chip_dir_beside(&device)
    }

    fn via_device_number(&self, chip_path: &Path) -> Option<PathBuf> {
        let wanted = device_number(chip_path)?;

        chip_entries(&self.bus_devices)
            .into_iter()
            .filter(|entry| {
                read_attr(entry, "dev")
                    .and_then(|dev| parse_dev(&dev))
                    .is_some_and(|dev| dev == wanted)
            })
            .find_map(|entry| chip_dir_beside(&entry))
    }

    fn via_class_path(&self, chip_name: &str) -> Option<PathBuf> {
        let direct = self.class_gpio.join(chip_name);
        direct.exists().then_some(direct)
    }
}

fn unexport_error(e: io::Error) -> AppError {
    match e.kind() {
        ErrorKind::PermissionDenied => AppError::PermissionDenied(e.to_string()),
        _ => AppError::Gpio(e.to_string()),
    }
}

/// Follows a bus device link and looks for `../gpio/gpiochip*/base` next to it.
fn chip_dir_beside(device: &Path) -> Option<PathBuf> {
    let resolved = fs::canonicalize(device).ok()?;
    let gpio_dir = resolved.parent()?.join("gpio");
    if !gpio_dir.is_dir() {
        return None;
    }
    chip_entries(&gpio_dir)
        .into_iter()
        .find(|dir| dir.join("base").exists())
}

/// `gpiochip*` entries of `dir`, sorted by name. Unreadable dirs yield none.
fn chip_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut chips: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(CHIP_PREFIX))
        .map(|e| e.path())
        .collect();
    chips.sort();
    chips
}

fn device_number(chip_path: &Path) -> Option<(u64, u64)> {
    let rdev = fs::metadata(chip_path).ok()?.rdev();
    Some((u64::from(major(rdev)), u64::from(minor(rdev))))
}

fn parse_dev(content: &str) -> Option<(u64, u64)> {
    let (maj, min) = content.split_once(':')?;
    Some((maj.trim().parse().ok()?, min.trim().parse().ok()?))
}

fn read_attr(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name))
        .ok()
        .map(|s| s.trim().to_string())
}

fn read_number(dir: &Path, name: &str) -> Option<u32> {
    let raw = read_attr(dir, name)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("ignoring {}/{name} = {raw:?}: {e}", dir.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dev_attribute() {
        assert_eq!(parse_dev("254:0\n"), Some((254, 0)));
        assert_eq!(parse_dev("254"), None);
        assert_eq!(parse_dev("a:b"), None);
    }

    #[test]
    fn layout_follows_root() {
        let paths = SysfsPaths::with_root("/tmp/fake");
        assert_eq!(paths.bus_devices, PathBuf::from("/tmp/fake/bus/gpio/devices"));
        assert_eq!(paths.unexport_path(), PathBuf::from("/tmp/fake/class/gpio/unexport"));
        assert_eq!(paths.export_node(517), PathBuf::from("/tmp/fake/class/gpio/gpio517"));
    }

    #[test]
    fn permission_denied_write_maps_to_its_own_variant() {
        let err = unexport_error(io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(err, AppError::PermissionDenied(_)));

        let err = unexport_error(io::Error::from(ErrorKind::NotFound));
        assert!(matches!(err, AppError::Gpio(_)));
    }

    #[test]
    fn non_gpiochip_path_is_unresolved() {
        let info = SysfsPaths::with_root("/nonexistent").resolve_chip(Path::new("/dev/ttyS0"));
        assert_eq!(info.base, None);
        assert_eq!(info.sysfs_dir, None);
        assert_eq!(info.name, "ttyS0");
    }
}
