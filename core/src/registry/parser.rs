//! Registry text parser.
//!
//! One record per line:
//!
//! ```text
//! username::uid:gid::"home":"shell"::perms:dirAccess-
//! ```
//!
//! The default lenient mode never fails. A line that does not match the
//! layout still yields a record; its fields are whatever the delimiter
//! scan happens to cut out, and an over-long field spills into the next
//! one. Strict mode rejects such lines instead.

use alloc::string::String;
use alloc::vec::Vec;

use super::cursor::{Cursor, Token};
use super::user::{Capabilities, UserRecord};
use crate::config::{
    DIR_ACCESS_MAX, HOME_MAX, ID_MAX, MAX_USERS, PERMS_MAX, SHELL_MAX, USERNAME_MAX,
};
use crate::error::{ParseError, ParseErrorKind};

/// How malformed lines are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Extract whatever the layout yields; never fail.
    #[default]
    Lenient,
    /// Reject the first line that does not match the layout.
    Strict,
}

/// Parse `text` into `users`, stopping at end of input or once
/// [`MAX_USERS`] records exist. Returns the number of records added.
pub fn parse_users(
    text: &str,
    mode: ParseMode,
    users: &mut Vec<UserRecord>,
) -> Result<usize, ParseError> {
    let mut cursor = Cursor::new(text);
    let mut produced = 0;

    while !cursor.is_at_end() && users.len() < MAX_USERS {
        let line = produced + 1;
        let (record, next) =
            LineParser { mode }.record(cursor).map_err(|kind| ParseError { line, kind })?;
        users.push(record);
        produced += 1;
        cursor = next;
    }

    if users.len() == MAX_USERS && !cursor.is_at_end() {
        log::warn!("[KEEL Users] Registry full, ignoring remaining input");
    }

    Ok(produced)
}

struct LineParser {
    mode: ParseMode,
}

impl LineParser {
    fn strict(&self) -> bool {
        self.mode == ParseMode::Strict
    }

    fn record<'a>(&self, cursor: Cursor<'a>) -> Result<(UserRecord, Cursor<'a>), ParseErrorKind> {
        let (username, cursor) = self.field(cursor, b':', USERNAME_MAX, "username")?;
        let cursor = self.literal(cursor, b':')?;

        let (uid, cursor) = self.field(cursor, b':', ID_MAX, "uid")?;
        let (gid, cursor) = self.field(cursor, b':', ID_MAX, "gid")?;
        let cursor = self.literal(cursor, b':')?;

        let cursor = self.quote(cursor)?;
        let (home, cursor) = self.field(cursor, b'"', HOME_MAX, "home")?;
        let cursor = self.literal(cursor, b':')?;

        let cursor = self.quote(cursor)?;
        let (shell, cursor) = self.field(cursor, b'"', SHELL_MAX, "shell")?;
        let cursor = self.literal(cursor, b':')?;
        let cursor = self.literal(cursor, b':')?;

        let (perms, cursor) = self.field(cursor, b':', PERMS_MAX, "perms")?;

        let (dir, cursor) = cursor.take_until_lossy(b'-', DIR_ACCESS_MAX);
        if self.strict() {
            self.check(&dir, b'-', "dirAccess")?;
        }
        let cursor = self.line_end(cursor)?;

        let record = UserRecord::new(
            String::from(username),
            String::from(uid),
            String::from(gid),
            String::from(home),
            String::from(shell),
            Capabilities::from_perm_str(perms),
            String::from(dir.value),
        );
        Ok((record, cursor))
    }

    fn field<'a>(
        &self,
        cursor: Cursor<'a>,
        delim: u8,
        max: usize,
        name: &'static str,
    ) -> Result<(&'a str, Cursor<'a>), ParseErrorKind> {
        let (token, next) = cursor.take_until(delim, max);
        if self.strict() {
            self.check(&token, delim, name)?;
        }
        Ok((token.value, next))
    }

    fn check(&self, token: &Token<'_>, delim: u8, name: &'static str) -> Result<(), ParseErrorKind> {
        if token.truncated {
            Err(ParseErrorKind::FieldTooLong(name))
        } else if !token.terminated {
            Err(ParseErrorKind::UnexpectedEnd)
        } else if token.value.contains('\n') {
            Err(ParseErrorKind::MissingDelimiter(delim as char))
        } else {
            Ok(())
        }
    }

    /// A separator byte. Lenient mode steps over whatever is there.
    fn literal<'a>(&self, cursor: Cursor<'a>, byte: u8) -> Result<Cursor<'a>, ParseErrorKind> {
        if !self.strict() {
            return Ok(cursor.skip(1));
        }
        match cursor.skip_if(byte) {
            (true, next) => Ok(next),
            (false, _) if cursor.is_at_end() => Err(ParseErrorKind::UnexpectedEnd),
            (false, _) => Err(ParseErrorKind::MissingDelimiter(byte as char)),
        }
    }

    /// An opening quote. Optional unless strict.
    fn quote<'a>(&self, cursor: Cursor<'a>) -> Result<Cursor<'a>, ParseErrorKind> {
        if self.strict() {
            self.literal(cursor, b'"')
        } else {
            Ok(cursor.skip_if(b'"').1)
        }
    }

    /// The `-` terminator and the rest of the line.
    fn line_end<'a>(&self, cursor: Cursor<'a>) -> Result<Cursor<'a>, ParseErrorKind> {
        if !self.strict() {
            return Ok(cursor.skip_line());
        }
        let cursor = self.literal(cursor, b'-')?;
        let cursor = cursor.skip_if(b'\r').1;
        match cursor.skip_if(b'\n') {
            (true, next) => Ok(next),
            (false, next) if next.is_at_end() => Ok(next),
            (false, _) => Err(ParseErrorKind::MissingDelimiter('\n')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<UserRecord> {
        let mut users = Vec::new();
        parse_users(text, ParseMode::Lenient, &mut users).unwrap();
        users
    }

    #[test]
    fn test_single_line() {
        let users = parse("alice::1000:1000::\"/home/alice\":\"/bin/sh\"::rwxs:/home-\n");
        assert_eq!(users.len(), 1);

        let alice = &users[0];
        assert_eq!(alice.username(), "alice");
        assert_eq!(alice.uid(), "1000");
        assert_eq!(alice.gid(), "1000");
        assert_eq!(alice.home(), "/home/alice");
        assert_eq!(alice.shell(), "/bin/sh");
        assert_eq!(alice.dir_access(), "/home");
        assert_eq!(
            alice.capabilities(),
            Capabilities::READ | Capabilities::WRITE | Capabilities::EXECUTE | Capabilities::USE_SHELL
        );
    }

    #[test]
    fn test_missing_final_newline() {
        let users = parse("root::0:0::\"/root\":\"/bin/sh\"::rwxa:/-");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].dir_access(), "/");
        assert!(users[0].is_admin());
    }

    #[test]
    fn test_unquoted_paths_accepted_leniently() {
        let users = parse("bob::1001:1001::/home/bob\":/bin/sh\"::r:/tmp-\n");
        assert_eq!(users[0].home(), "/home/bob");
        assert_eq!(users[0].shell(), "/bin/sh");
    }

    #[test]
    fn test_oversized_username_spills() {
        let mut text = String::new();
        for _ in 0..130 {
            text.push('a');
        }
        text.push_str("::1:1::\"/h\":\"/s\"::r:/d-\n");

        let users = parse(&text);
        assert_eq!(users[0].username().len(), USERNAME_MAX);
        // The cursor was left inside the name, so the next field picked up
        // the tail of it.
        assert_ne!(users[0].uid(), "1");
    }

    #[test]
    fn test_dir_access_excess_dropped() {
        let mut long = String::from("/");
        for _ in 0..(DIR_ACCESS_MAX + 50) {
            long.push('d');
        }
        let text = alloc::format!("u::1:1::\"/h\":\"/s\"::r:{}-\nv::2:2::\"/h\":\"/s\"::w:/v-\n", long);

        let users = parse(&text);
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].dir_access().len(), DIR_ACCESS_MAX);
        assert_eq!(users[1].username(), "v");
    }

    #[test]
    fn test_strict_rejects_missing_terminator() {
        let text = "alice::1000:1000::\"/home/alice\":\"/bin/sh\"::rwxs:/home\n";
        let mut users = Vec::new();

        let err = parse_users(text, ParseMode::Strict, &mut users).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(users.is_empty());

        assert_eq!(parse_users(text, ParseMode::Lenient, &mut users), Ok(1));
    }

    #[test]
    fn test_strict_reports_line_number() {
        let text = "a::1:1::\"/a\":\"/s\"::r:/a-\nb:1:1::\"/b\":\"/s\"::r:/b-\n";
        let mut users = Vec::new();

        let err = parse_users(text, ParseMode::Strict, &mut users).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_strict_field_too_long() {
        let text = "u::12345678:1::\"/h\":\"/s\"::r:/d-\n";
        let mut users = Vec::new();
        let err = parse_users(text, ParseMode::Strict, &mut users).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::FieldTooLong("uid"));
    }
}
