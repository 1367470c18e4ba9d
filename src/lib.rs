mod config;
mod error;
mod gpio;
mod report;
mod sysfs;

pub use config::{DEFAULT_CHIP_PATH, GpioConfig, ModuleConfig, PinEntry};
pub use error::AppError;
pub use gpio::{ChipInfo, Direction, GpioUnexporter, PinDescriptor, group_by_chip};
pub use report::{Outcome, Reporter, Summary};
pub use sysfs::{DEFAULT_SYSFS_ROOT, ResolveMethod, SysfsPaths};
