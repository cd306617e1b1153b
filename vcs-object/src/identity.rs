//! `Name <email> <epoch-seconds> <±HHMM>` identity lines, shared by commit
//! author/committer and tag tagger fields.

use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("identity line is malformed: {0:?}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub seconds: i64,
    /// Offset from UTC in minutes, may be negative; `+0000` is `0`.
    pub offset_minutes: i32,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>, seconds: i64, offset_minutes: i32) -> Self {
        Identity {
            name: name.into(),
            email: email.into(),
            seconds,
            offset_minutes,
        }
    }

    pub fn parse(line: &str) -> Result<Self, Error> {
        let lt = line.find('<').ok_or_else(|| Error::Malformed(line.to_owned()))?;
        let gt = line.find('>').ok_or_else(|| Error::Malformed(line.to_owned()))?;
        if gt < lt {
            return Err(Error::Malformed(line.to_owned()));
        }
        let name = line[..lt].trim_end().to_owned();
        let email = line[lt + 1..gt].to_owned();
        let rest = line[gt + 1..].trim();
        let mut parts = rest.split_whitespace();
        let seconds: i64 = parts
            .next()
            .ok_or_else(|| Error::Malformed(line.to_owned()))?
            .parse()
            .map_err(|_| Error::Malformed(line.to_owned()))?;
        let tz = parts.next().ok_or_else(|| Error::Malformed(line.to_owned()))?;
        let offset_minutes = parse_offset(tz).ok_or_else(|| Error::Malformed(line.to_owned()))?;
        Ok(Identity {
            name,
            email,
            seconds,
            offset_minutes,
        })
    }
}

fn parse_offset(tz: &str) -> Option<i32> {
    if tz.len() != 5 {
        return None;
    }
    let sign = match &tz[..1] {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };
    let hours: i32 = tz[1..3].parse().ok()?;
    let minutes: i32 = tz[3..5].parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let abs = self.offset_minutes.abs();
        write!(
            f,
            "{} <{}> {} {}{:02}{:02}",
            self.name,
            self.email,
            self.seconds,
            sign,
            abs / 60,
            abs % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_display_and_parse() {
        let id = Identity::new("A U Thor", "a@x.example", 1_700_000_000, -330);
        let line = id.to_string();
        assert_eq!(line, "A U Thor <a@x.example> 1700000000 -0530");
        assert_eq!(Identity::parse(&line).unwrap(), id);
    }

    #[test]
    fn positive_offset_formats_with_plus() {
        let id = Identity::new("A", "a@x", 0, 0);
        assert_eq!(id.to_string(), "A <a@x> 0 +0000");
    }

    #[test]
    fn rejects_missing_angle_brackets() {
        assert!(Identity::parse("A a@x 0 +0000").is_err());
    }
}
