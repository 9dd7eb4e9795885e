//! Names and fixed values shared across the build.

pub const APP_NAME: &str = "lrose-build";

/// Descriptor key listing the subdirectories a directory needs.
pub const SUB_DIRS_KEY: &str = "SUB_DIRS";

/// Descriptor filenames, in lookup order.
pub const DESCRIPTOR_NAMES: [&str; 2] = ["makefile", "Makefile"];

/// Directory names the trimmer never deletes or descends into.
pub const PROTECTED_DIRS: [&str; 5] = ["perl5", "scripts", "include", "images", "resources"];

/// Codebase subdirectories trimmed to their descriptors.
pub const TRIMMED_SUBDIRS: [&str; 2] = ["libs", "apps"];

/// Directory names the pruner always removes.
pub const PRUNED_DIRS: [&str; 2] = ["CVS", ".git"];

/// Stage name that runs without a log file.
pub const NO_LOGGING_STAGE: &str = "no-logging";

pub const CORE_REPO_URL: &str = "https://github.com/NCAR/lrose-core";
pub const NETCDF_REPO_URL: &str = "https://github.com/NCAR/lrose-netcdf";
pub const DISPLAYS_REPO_URL: &str = "https://github.com/NCAR/lrose-displays";

/// Job count handed to `make` for the core libs and apps.
pub const CORE_MAKE_JOBS: u32 = 8;

/// Install dir baked into the generated CMake files.
pub const CMAKE_INSTALL_DIR: &str = "/usr/local/lrose";
