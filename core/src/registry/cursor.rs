//! Cursor over the registry text.
//!
//! Every operation consumes the cursor and hands back the extracted value
//! together with the advanced cursor, so the parser threads positions
//! explicitly instead of mutating an index.

/// A token cut from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Stored text, at most the requested number of bytes.
    pub value: &'a str,
    /// Scanning stopped on the delimiter.
    pub terminated: bool,
    /// Scanning stopped on the length limit with more token text left.
    pub truncated: bool,
}

/// Read position in an immutable string view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Start at the beginning of `input`. A NUL byte ends the input.
    pub fn new(input: &'a str) -> Self {
        let end = input.find('\0').unwrap_or(input.len());
        Self {
            input: &input[..end],
            pos: 0,
        }
    }

    /// Byte offset into the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Next byte, if any.
    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn at(self, pos: usize) -> Self {
        Self { pos, ..self }
    }

    /// Smallest char boundary at or after `pos`.
    fn ceil_boundary(&self, mut pos: usize) -> usize {
        let len = self.input.len();
        if pos >= len {
            return len;
        }
        while !self.input.is_char_boundary(pos) {
            pos += 1;
        }
        pos
    }

    /// Largest char boundary at or before `pos`.
    fn floor_boundary(&self, mut pos: usize) -> usize {
        while !self.input.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    /// End of the run of non-`delim` bytes starting here.
    fn scan(&self, delim: u8) -> usize {
        self.input.as_bytes()[self.pos..]
            .iter()
            .position(|&b| b == delim)
            .map(|off| self.pos + off)
            .unwrap_or(self.input.len())
    }

    /// Advance `n` bytes, stopping at the end of input.
    pub fn skip(self, n: usize) -> Self {
        let pos = self.ceil_boundary(self.pos.saturating_add(n));
        self.at(pos)
    }

    /// Skip one byte if it equals `byte`. Reports whether it did.
    pub fn skip_if(self, byte: u8) -> (bool, Self) {
        if self.peek() == Some(byte) {
            (true, self.at(self.pos + 1))
        } else {
            (false, self)
        }
    }

    /// Skip through the next newline, or to the end of input.
    pub fn skip_line(self) -> Self {
        let end = self.scan(b'\n');
        self.at(end).skip_if(b'\n').1
    }

    /// Take up to `max` bytes before `delim` and consume the delimiter.
    ///
    /// When the limit is hit first, the cursor is left just after the
    /// stored bytes, inside the token; the delimiter is not consumed.
    pub fn take_until(self, delim: u8, max: usize) -> (Token<'a>, Self) {
        let run_end = self.scan(delim);

        if run_end - self.pos > max {
            let end = self.floor_boundary(self.pos + max);
            let token = Token {
                value: &self.input[self.pos..end],
                terminated: false,
                truncated: true,
            };
            return (token, self.at(end));
        }

        let value = &self.input[self.pos..run_end];
        let next = self.at(run_end);
        let (terminated, next) = next.skip_if(delim);
        let token = Token {
            value,
            terminated,
            truncated: false,
        };
        (token, next)
    }

    /// Take up to `max` bytes before `delim`, consuming and dropping any
    /// excess. The delimiter itself is left in place.
    pub fn take_until_lossy(self, delim: u8, max: usize) -> (Token<'a>, Self) {
        let run_end = self.scan(delim);
        let truncated = run_end - self.pos > max;
        let end = if truncated {
            self.floor_boundary(self.pos + max)
        } else {
            run_end
        };

        let token = Token {
            value: &self.input[self.pos..end],
            terminated: run_end < self.input.len(),
            truncated,
        };
        (token, self.at(run_end))
    }
}
