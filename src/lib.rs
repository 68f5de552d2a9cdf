pub mod algorithm;
pub mod device;
pub mod superblock;
pub mod dump;

pub use algorithm::{IntegrityAlgorithm, tag_size_from_name, key_size_from_name};
pub use device::{BlockDevice, StreamDevice};
pub use superblock::{IntegritySuperblock, IntegrityError, read_superblock, SECTOR_SIZE};
pub use dump::dump_superblock;
