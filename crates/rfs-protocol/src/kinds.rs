//! Request and response kinds together with their wire characters.

use std::fmt;

use crate::error::DecodeError;

/// Operations understood by the helper process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Lists one directory.
    Ls,
    /// Lists a directory tree.
    RecursiveLs,
    /// `stat` of a path, following symbolic links.
    Stat,
    /// `lstat` of a path.
    Lstat,
    /// Copies a file, link or directory tree.
    Copy,
    /// Moves a plain file.
    Move,
    /// Asks the helper to exit.
    Quit,
    /// Makes the helper sleep; used for diagnostics.
    Sleep,
    /// Starts polling a directory for changes.
    AddWatch,
    /// Stops polling a directory for changes.
    RemoveWatch,
    /// Runs a refresh cycle and reports changed directories.
    Refresh,
    /// Deletes a file or directory tree.
    Delete,
    /// Schedules a file for deletion when the helper exits.
    DeleteOnDisconnect,
    /// Reports the helper version.
    ServerInfo,
    /// Prints the list of request kinds.
    Help,
    /// Sets a runtime option (`name=value`).
    Option,
}

impl RequestKind {
    /// Every request kind, in help order.
    pub const ALL: [Self; 16] = [
        Self::Ls,
        Self::RecursiveLs,
        Self::Stat,
        Self::Lstat,
        Self::Copy,
        Self::Move,
        Self::Quit,
        Self::Sleep,
        Self::AddWatch,
        Self::RemoveWatch,
        Self::Refresh,
        Self::Delete,
        Self::DeleteOnDisconnect,
        Self::ServerInfo,
        Self::Option,
        Self::Help,
    ];

    /// The character that introduces this request on the wire.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Ls => 'l',
            Self::RecursiveLs => 'r',
            Self::Stat => 'S',
            Self::Lstat => 's',
            Self::Copy => 'C',
            Self::Move => 'M',
            Self::Quit => 'q',
            Self::Sleep => 'P',
            Self::AddWatch => 'W',
            Self::RemoveWatch => 'w',
            Self::Refresh => 'R',
            Self::Delete => 'd',
            Self::DeleteOnDisconnect => 'D',
            Self::ServerInfo => 'i',
            Self::Help => '?',
            Self::Option => 'o',
        }
    }

    /// Human-readable operation name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ls => "ls",
            Self::RecursiveLs => "recursive-ls",
            Self::Stat => "stat",
            Self::Lstat => "lstat",
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Quit => "quit",
            Self::Sleep => "sleep",
            Self::AddWatch => "add-watch",
            Self::RemoveWatch => "remove-watch",
            Self::Refresh => "refresh",
            Self::Delete => "delete",
            Self::DeleteOnDisconnect => "delete-on-disconnect",
            Self::ServerInfo => "server-info",
            Self::Help => "help",
            Self::Option => "option",
        }
    }

    /// Whether the request carries a destination path after the source.
    #[must_use]
    pub const fn has_second_path(self) -> bool {
        matches!(self, Self::Copy | Self::Move)
    }

    /// Whether the request carries a path at all. The helper drops path
    /// requests whose path is empty without answering them.
    #[must_use]
    pub const fn takes_path(self) -> bool {
        !matches!(self, Self::Quit | Self::Help | Self::ServerInfo)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

impl TryFrom<char> for RequestKind {
    type Error = DecodeError;

    fn try_from(ch: char) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_char() == ch)
            .ok_or(DecodeError::UnknownRequestKind(ch))
    }
}

/// Record kinds written by the helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Header opening a directory listing.
    Ls,
    /// Header opening one directory of a recursive listing.
    RecursiveLs,
    /// One directory entry or `stat` result.
    Entry,
    /// Closes a listing or refresh.
    End,
    /// A directory changed.
    Change,
    /// The request failed; carries an errno and a message.
    Error,
    /// Header opening a refresh cycle.
    Refresh,
    /// Helper version.
    ServerInfo,
}

impl ResponseKind {
    /// Every response kind.
    pub const ALL: [Self; 8] = [
        Self::Ls,
        Self::RecursiveLs,
        Self::Entry,
        Self::End,
        Self::Change,
        Self::Error,
        Self::Refresh,
        Self::ServerInfo,
    ];

    /// The character that introduces this record on the wire.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Ls => 'l',
            Self::RecursiveLs => 'r',
            Self::Entry => 'f',
            Self::End => 'e',
            Self::Change => 'c',
            Self::Error => 'E',
            Self::Refresh => 'R',
            Self::ServerInfo => 'i',
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.as_char())
    }
}

impl TryFrom<char> for ResponseKind {
    type Error = DecodeError;

    fn try_from(ch: char) -> Result<Self, DecodeError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_char() == ch)
            .ok_or(DecodeError::UnknownResponseKind(ch))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::*;

    #[test]
    fn request_characters_are_unique() {
        let chars: HashSet<char> = RequestKind::ALL.iter().map(|kind| kind.as_char()).collect();
        assert_eq!(chars.len(), RequestKind::ALL.len());
    }

    #[test]
    fn response_characters_are_unique() {
        let chars: HashSet<char> = ResponseKind::ALL.iter().map(|kind| kind.as_char()).collect();
        assert_eq!(chars.len(), ResponseKind::ALL.len());
    }

    #[rstest]
    #[case('l', RequestKind::Ls)]
    #[case('S', RequestKind::Stat)]
    #[case('s', RequestKind::Lstat)]
    #[case('D', RequestKind::DeleteOnDisconnect)]
    #[case('?', RequestKind::Help)]
    fn parses_request_characters(#[case] ch: char, #[case] expected: RequestKind) {
        assert_eq!(RequestKind::try_from(ch), Ok(expected));
    }

    #[rstest]
    #[case('f', ResponseKind::Entry)]
    #[case('e', ResponseKind::End)]
    #[case('E', ResponseKind::Error)]
    #[case('c', ResponseKind::Change)]
    fn parses_response_characters(#[case] ch: char, #[case] expected: ResponseKind) {
        assert_eq!(ResponseKind::try_from(ch), Ok(expected));
    }

    #[test]
    fn rejects_unknown_characters() {
        assert_eq!(
            ResponseKind::try_from('z'),
            Err(DecodeError::UnknownResponseKind('z'))
        );
        assert_eq!(
            RequestKind::try_from('z'),
            Err(DecodeError::UnknownRequestKind('z'))
        );
    }

    #[test]
    fn only_copy_and_move_take_two_paths() {
        let two_path: Vec<RequestKind> = RequestKind::ALL
            .into_iter()
            .filter(|kind| kind.has_second_path())
            .collect();
        assert_eq!(two_path, vec![RequestKind::Copy, RequestKind::Move]);
    }

    #[rstest]
    #[case(RequestKind::Quit)]
    #[case(RequestKind::Help)]
    #[case(RequestKind::ServerInfo)]
    fn pathless_kinds(#[case] kind: RequestKind) {
        assert!(!kind.takes_path());
    }
}
