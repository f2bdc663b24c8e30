//! Core domain logic for the screen time keeper.
//!
//! This crate contains the fundamental types and logic for:
//! - Epoch conversion: the stores' 2001-01-01 reference epoch vs absolute time
//! - Categorization: mapping bundle identifiers to usage categories
//! - Records: normalized usage and device records with fallback values

pub mod category;
pub mod device;
pub mod epoch;
pub mod usage;

pub use category::{UsageCategory, categorize};
pub use device::{DeviceRecord, UNKNOWN_DEVICE_NAME, UNKNOWN_MODEL};
pub use epoch::{to_absolute, to_absolute_secs, to_epoch, to_epoch_secs};
pub use usage::{DailyBucket, HourlyBucket, SamplePolicy, TimeRange, UsageRecord, display_name_for};
