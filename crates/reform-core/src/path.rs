use std::fmt;
use std::str::FromStr;

use crate::error::FormError;

/// One step of a parsed path: an object key or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A dot/bracket-addressable location inside a form's data, e.g.
/// `owner.addresses[0].street`. Parsing is strict: empty segments,
/// unterminated brackets, and non-numeric indices are configuration errors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn parse(raw: &str) -> Result<Self, FormError> {
        if raw.is_empty() {
            return Err(FormError::config("field path must not be empty"));
        }
        let mut segments = Vec::new();
        let mut key = String::new();
        // `true` right after a closing bracket, where a '.' separator is
        // allowed without a pending key.
        let mut after_bracket = false;
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() && !after_bracket {
                        return Err(FormError::config(format!("empty segment in path `{raw}`")));
                    }
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    after_bracket = false;
                    if chars.peek().is_none() {
                        return Err(FormError::config(format!("trailing `.` in path `{raw}`")));
                    }
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(d) => digits.push(d),
                            None => {
                                return Err(FormError::config(format!(
                                    "unterminated `[` in path `{raw}`"
                                )));
                            }
                        }
                    }
                    let index = digits.parse::<usize>().map_err(|_| {
                        FormError::config(format!("non-numeric index `{digits}` in path `{raw}`"))
                    })?;
                    segments.push(Segment::Index(index));
                    after_bracket = true;
                }
                ']' => {
                    return Err(FormError::config(format!("stray `]` in path `{raw}`")));
                }
                c => {
                    key.push(c);
                    after_bracket = false;
                }
            }
        }
        if !key.is_empty() {
            segments.push(Segment::Key(key));
        }
        if segments.is_empty() {
            return Err(FormError::config(format!("path `{raw}` has no segments")));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The notification relation: true when either path is a segment-prefix
    /// of the other. A write to `a.b` touches bindings on `a`, `a.b`, and
    /// `a.b[0].c`; it does not touch `a.c`.
    pub fn overlaps(&self, other: &Path) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| a == b)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Segment::Key(k) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(k)?;
                }
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}
