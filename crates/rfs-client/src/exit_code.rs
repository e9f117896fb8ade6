//! Classification of helper exit statuses.
//!
//! The helper exits with 0 on success and with a code between 201 and 217
//! when start-up or its storage setup fails. Shell-style codes above 128
//! denote death by signal `code - 128`.

use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::sys::signal::Signal;

/// Named start-up failures of the helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitFailure {
    /// Locking an internal mutex failed.
    LockingMutex,
    /// Unlocking an internal mutex failed.
    UnlockingMutex,
    /// The home directory could not be determined.
    GettingHomeDir,
    /// The storage super directory could not be created.
    CreatingStorageSuperDir,
    /// The storage super directory is not accessible.
    AccessingStorageSuperDir,
    /// The storage directory could not be created.
    CreatingStorageDir,
    /// The storage directory is not accessible.
    AccessingStorageDir,
    /// The cache directory could not be created.
    CreatingCacheDir,
    /// The cache directory is not accessible.
    AccessingCacheDir,
    /// Growing the directory table ran out of memory.
    NoMemoryExpandingDirtab,
    /// Changing the working directory failed.
    FailedChdir,
    /// The lock file could not be opened.
    OpeningLockFile,
    /// The lock file is held by another helper.
    LockingLockFile,
    /// The directory table cache was opened twice.
    DirtabDoubleCacheOpen,
    /// A command-line argument was rejected.
    WrongArgument,
    /// Installing a signal handler failed.
    SettingSignalHandler,
    /// Registering the exit hook failed.
    SettingExitFunction,
}

impl ExitFailure {
    /// Every failure in exit-code order, starting at 201.
    pub const ALL: [Self; 17] = [
        Self::LockingMutex,
        Self::UnlockingMutex,
        Self::GettingHomeDir,
        Self::CreatingStorageSuperDir,
        Self::AccessingStorageSuperDir,
        Self::CreatingStorageDir,
        Self::AccessingStorageDir,
        Self::CreatingCacheDir,
        Self::AccessingCacheDir,
        Self::NoMemoryExpandingDirtab,
        Self::FailedChdir,
        Self::OpeningLockFile,
        Self::LockingLockFile,
        Self::DirtabDoubleCacheOpen,
        Self::WrongArgument,
        Self::SettingSignalHandler,
        Self::SettingExitFunction,
    ];

    /// The exit code of the first failure.
    pub const FIRST_CODE: i32 = 201;

    /// Looks up the failure for an exit code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        let index = usize::try_from(code.checked_sub(Self::FIRST_CODE)?).ok()?;
        Self::ALL.get(index).copied()
    }

    /// The process exit code.
    #[must_use]
    pub const fn code(self) -> i32 {
        Self::FIRST_CODE + self as i32
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::LockingMutex => "error locking mutex",
            Self::UnlockingMutex => "error unlocking mutex",
            Self::GettingHomeDir => "error getting home directory",
            Self::CreatingStorageSuperDir => "error creating storage super directory",
            Self::AccessingStorageSuperDir => "error accessing storage super directory",
            Self::CreatingStorageDir => "error creating storage directory",
            Self::AccessingStorageDir => "error accessing storage directory",
            Self::CreatingCacheDir => "error creating cache directory",
            Self::AccessingCacheDir => "error accessing cache directory",
            Self::NoMemoryExpandingDirtab => "out of memory expanding directory table",
            Self::FailedChdir => "error changing directory",
            Self::OpeningLockFile => "error opening lock file",
            Self::LockingLockFile => "another fs_server holds the lock file",
            Self::DirtabDoubleCacheOpen => "directory table cache opened twice",
            Self::WrongArgument => "wrong argument",
            Self::SettingSignalHandler => "error setting signal handler",
            Self::SettingExitFunction => "error setting exit function",
        }
    }
}

impl fmt::Display for ExitFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} (exit code {})", self.description(), self.code())
    }
}

/// How the helper process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerExit {
    /// Exit code 0.
    Success,
    /// One of the named start-up failures.
    Failure(ExitFailure),
    /// Terminated by the given signal number.
    Signal(i32),
    /// Any other exit code.
    Other(i32),
}

impl ServerExit {
    /// Classifies a numeric exit code.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            return Self::Success;
        }
        if let Some(failure) = ExitFailure::from_code(code) {
            return Self::Failure(failure);
        }
        if code > 128 {
            return Self::Signal(code - 128);
        }
        Self::Other(code)
    }

    /// Classifies the status of a reaped child.
    #[must_use]
    pub fn from_status(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::from_code(code),
            (None, Some(signal)) => Self::Signal(signal),
            (None, None) => Self::Other(-1),
        }
    }

    /// Whether the helper exited cleanly.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// The terminating signal, if it is one `nix` knows.
    #[must_use]
    pub fn signal(self) -> Option<Signal> {
        match self {
            Self::Signal(number) => Signal::try_from(number).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ServerExit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => formatter.write_str("success"),
            Self::Failure(failure) => write!(formatter, "{failure}"),
            Self::Signal(number) => match self.signal() {
                Some(signal) => write!(formatter, "killed by {signal}"),
                None => write!(formatter, "killed by signal {number}"),
            },
            Self::Other(code) => write!(formatter, "exit code {code}"),
        }
    }
}
