//! System configuration and constants
//!
//! Storage keys, filesystem defaults, diagnostic buffer sizes and the
//! board constants for the STM32G474 target. Runtime options for
//! `LifecycleController::initialize` live in [`FsOptions`] and [`InitOptions`].

/// Durable store namespace owned by the lifecycle controller
///
/// NVS namespaces are case-sensitive; devices counted by earlier firmware
/// keep their count only under this exact name.
pub const STORE_NAMESPACE: &str = "SYSTEM";

/// Key of the persisted boot counter
pub const KEY_BOOTS: &str = "boots";

/// Maximum key length accepted by the durable store (NVS limit)
pub const MAX_KEY_LEN: usize = 15;

/// Default filesystem partition label
pub const DEFAULT_FS_PARTITION: &str = "fs";

/// Default filesystem mount point
pub const DEFAULT_FS_BASE_PATH: &str = "/littlefs";

/// Default number of simultaneously open files
pub const DEFAULT_FS_MAX_OPEN_FILES: u8 = 10;

/// Default label of the factory (recovery) application image
pub const DEFAULT_FACTORY_PARTITION: &str = "safeboot";

/// Maximum number of backtrace frames kept from a crash record
pub const MAX_BACKTRACE_DEPTH: usize = 16;

/// Panic reason buffer size in bytes
pub const PANIC_REASON_MAX_LEN: usize = 128;

/// Maximum task name length in a crash record
pub const TASK_NAME_MAX_LEN: usize = 16;

/// Length of one rendered backtrace token ("0x" + 8 hex digits)
pub const BACKTRACE_TOKEN_LEN: usize = 10;

/// Capacity of the rendered backtrace text (tokens plus separators)
pub const BACKTRACE_TEXT_LEN: usize = MAX_BACKTRACE_DEPTH * (BACKTRACE_TOKEN_LEN + 1);

/// Literal used when the panic reason cannot be read
pub const UNKNOWN_PANIC_REASON: &str = "Unknown";

/// Poll period of the delayed-restart timer in milliseconds
pub const RESTART_POLL_INTERVAL_MS: u64 = 10;

/// System clock frequency (STM32G474 @ 170MHz)
pub const SYSTEM_CLOCK_HZ: u32 = 170_000_000;

/// Chip model reported by the STM32 board binding
pub const STM32_CHIP_MODEL: &str = "STM32G474RE";

/// Heap reserved for the general-purpose allocator on the STM32 target
pub const STM32_HEAP_BYTES: usize = 16 * 1024;

/// Flash page size on the STM32G474 (dual-bank mode)
pub const STM32_FLASH_PAGE_SIZE: u32 = 2048;

/// Flash offset of the first of the two durable store pages
pub const STM32_STORE_OFFSET: u32 = 512 * 1024 - 2 * STM32_FLASH_PAGE_SIZE;

/// Number of key slots in the flash page store table
pub const FLASH_STORE_SLOTS: usize = 16;

/// Filesystem mount options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FsOptions {
    /// Partition label holding the filesystem
    pub partition_label: &'static str,
    /// Virtual path the filesystem is mounted at
    pub base_path: &'static str,
    /// Maximum number of simultaneously open files
    pub max_open_files: u8,
    /// Restart the device after a successful reformat instead of
    /// continuing in-process
    pub restart_after_format: bool,
}

impl FsOptions {
    /// Default options
    #[must_use]
    pub const fn new() -> Self {
        Self {
            partition_label: DEFAULT_FS_PARTITION,
            base_path: DEFAULT_FS_BASE_PATH,
            max_open_files: DEFAULT_FS_MAX_OPEN_FILES,
            restart_after_format: true,
        }
    }

    /// Set the partition label (returns new options)
    #[must_use]
    pub const fn with_partition(self, partition_label: &'static str) -> Self {
        Self {
            partition_label,
            ..self
        }
    }

    /// Set the mount point (returns new options)
    #[must_use]
    pub const fn with_base_path(self, base_path: &'static str) -> Self {
        Self { base_path, ..self }
    }

    /// Set the open file limit (returns new options)
    #[must_use]
    pub const fn with_max_open_files(self, max_open_files: u8) -> Self {
        Self {
            max_open_files,
            ..self
        }
    }

    /// Choose whether a successful reformat restarts the device
    #[must_use]
    pub const fn with_restart_after_format(self, restart_after_format: bool) -> Self {
        Self {
            restart_after_format,
            ..self
        }
    }
}

impl Default for FsOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for `LifecycleController::initialize`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitOptions {
    /// Mount the filesystem during startup
    pub mount_filesystem: bool,
    /// Filesystem mount options
    pub fs: FsOptions,
}

impl InitOptions {
    /// Mount the filesystem with default options
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mount_filesystem: true,
            fs: FsOptions::new(),
        }
    }

    /// Skip filesystem mounting
    #[must_use]
    pub const fn without_filesystem() -> Self {
        Self {
            mount_filesystem: false,
            fs: FsOptions::new(),
        }
    }

    /// Mount with the given filesystem options
    #[must_use]
    pub const fn with_fs(fs: FsOptions) -> Self {
        Self {
            mount_filesystem: true,
            fs,
        }
    }
}

impl Default for InitOptions {
    fn default() -> Self {
        Self::new()
    }
}
