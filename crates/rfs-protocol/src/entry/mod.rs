//! Directory entry payloads.
//!
//! Listing, `stat` and `lstat` responses carry entries in the form
//!
//! ```text
//! name_len name type size mtime access device inode link_len link
//! ```
//!
//! for example `3 foo - 12 1700000000000 rw- 2049 131 0 `. The access
//! triple is computed for the user the helper runs as; symbolic links always
//! report `rwx`.

use std::fmt;

use crate::buffer::Buffer;
use crate::error::DecodeError;

/// File type as reported by the helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// A regular file (`-`).
    Regular,
    /// A directory (`d`).
    Directory,
    /// A symbolic link (`l`).
    Symlink,
    /// A character device (`c`).
    CharDevice,
    /// A block device (`b`).
    BlockDevice,
    /// A named pipe (`p`).
    Fifo,
    /// A socket (`s`).
    Socket,
    /// Anything the helper could not classify.
    Unknown(char),
}

impl FileType {
    /// Maps the wire character to a file type.
    #[must_use]
    pub const fn from_char(ch: char) -> Self {
        match ch {
            '-' => Self::Regular,
            'd' => Self::Directory,
            'l' => Self::Symlink,
            'c' => Self::CharDevice,
            'b' => Self::BlockDevice,
            'p' => Self::Fifo,
            's' => Self::Socket,
            other => Self::Unknown(other),
        }
    }

    /// The wire character for this type.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Regular => '-',
            Self::Directory => 'd',
            Self::Symlink => 'l',
            Self::CharDevice => 'c',
            Self::BlockDevice => 'b',
            Self::Fifo => 'p',
            Self::Socket => 's',
            Self::Unknown(other) => other,
        }
    }
}

/// Read, write and execute permission for the helper's user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Access {
    /// The file can be read.
    pub read: bool,
    /// The file can be written.
    pub write: bool,
    /// The file can be executed or the directory searched.
    pub execute: bool,
}

impl Access {
    /// Parses an `ls`-style triple such as `r-x`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidAccess`] unless the text is exactly three
    /// characters, each either its letter or `-`.
    pub fn parse(flags: &str) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::InvalidAccess {
            flags: flags.to_owned(),
        };
        let mut chars = flags.chars();
        let mut flag = |letter: char| match chars.next() {
            Some(ch) if ch == letter => Ok(true),
            Some('-') => Ok(false),
            _ => Err(invalid()),
        };
        let access = Self {
            read: flag('r')?,
            write: flag('w')?,
            execute: flag('x')?,
        };
        if chars.next().is_some() {
            return Err(invalid());
        }
        Ok(access)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pick = |set: bool, letter: char| if set { letter } else { '-' };
        write!(
            formatter,
            "{}{}{}",
            pick(self.read, 'r'),
            pick(self.write, 'w'),
            pick(self.execute, 'x')
        )
    }
}

/// One decoded directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    name: String,
    file_type: FileType,
    size: u64,
    mtime_millis: i64,
    access: Access,
    device: u64,
    inode: u64,
    link_target: Option<String>,
}

impl FsEntry {
    /// Decodes an entry payload (the part of an `f` record after the id).
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when a field is missing or malformed.
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        let mut buffer = Buffer::new(payload);
        if buffer.is_exhausted() {
            return Err(DecodeError::Truncated { field: "name" });
        }
        let name = buffer.get_string();
        let file_type = buffer
            .get_char()
            .map(FileType::from_char)
            .ok_or(DecodeError::Truncated { field: "type" })?;
        let size = unsigned(&mut buffer, "size")?;
        let mtime_millis = buffer
            .try_get_long()
            .ok_or(DecodeError::InvalidNumber { field: "mtime" })?;
        if buffer.is_exhausted() {
            return Err(DecodeError::Truncated { field: "access" });
        }
        let access = Access::parse(buffer.get_word())?;
        let device = unsigned(&mut buffer, "device")?;
        let inode = unsigned(&mut buffer, "inode")?;
        if buffer.is_exhausted() {
            return Err(DecodeError::Truncated { field: "link" });
        }
        let link = buffer.get_string();

        Ok(Self {
            name,
            file_type,
            size,
            mtime_millis,
            access,
            device,
            inode,
            link_target: (!link.is_empty()).then_some(link),
        })
    }

    /// Creates an entry directly; mainly useful for tests and fakes.
    #[must_use]
    pub fn new(name: impl Into<String>, file_type: FileType, size: u64) -> Self {
        Self {
            name: name.into(),
            file_type,
            size,
            mtime_millis: 0,
            access: Access::default(),
            device: 0,
            inode: 0,
            link_target: None,
        }
    }

    /// Base name of the entry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File type.
    #[must_use]
    pub const fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Modification time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn mtime_millis(&self) -> i64 {
        self.mtime_millis
    }

    /// Access flags for the helper's user.
    #[must_use]
    pub const fn access(&self) -> Access {
        self.access
    }

    /// Device number.
    #[must_use]
    pub const fn device(&self) -> u64 {
        self.device
    }

    /// Inode number.
    #[must_use]
    pub const fn inode(&self) -> u64 {
        self.inode
    }

    /// Target of a symbolic link, if any.
    #[must_use]
    pub fn link_target(&self) -> Option<&str> {
        self.link_target.as_deref()
    }

    /// Whether the entry is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }
}

fn unsigned(buffer: &mut Buffer<'_>, field: &'static str) -> Result<u64, DecodeError> {
    buffer
        .try_get_long()
        .and_then(|value| u64::try_from(value).ok())
        .ok_or(DecodeError::InvalidNumber { field })
}
