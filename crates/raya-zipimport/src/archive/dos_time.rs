//! MS-DOS packed timestamps
//!
//! ZIP records store modification times as two 16-bit fields:
//!
//! ```text
//! date: yyyyyyym mmmddddd   year since 1980, month 1-12, day 1-31
//! time: hhhhhmmm mmmsssss   hour 0-23, minute 0-59, seconds / 2
//! ```

/// Calendar fields decoded from a DOS date/time pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DosDateTime {
    /// Unpack a DOS date/time pair
    pub fn decode(date: u16, time: u16) -> Self {
        Self {
            year: 1980 + ((date >> 9) & 0x7f),
            month: ((date >> 5) & 0x0f) as u8,
            day: (date & 0x1f) as u8,
            hour: ((time >> 11) & 0x1f) as u8,
            minute: ((time >> 5) & 0x3f) as u8,
            second: ((time & 0x1f) * 2) as u8,
        }
    }

    /// Pack into `(date, time)`; seconds are truncated to 2-second resolution
    pub fn pack(&self) -> (u16, u16) {
        let date = ((self.year.saturating_sub(1980) & 0x7f) << 9)
            | ((self.month as u16 & 0x0f) << 5)
            | (self.day as u16 & 0x1f);
        let time = ((self.hour as u16 & 0x1f) << 11)
            | ((self.minute as u16 & 0x3f) << 5)
            | ((self.second as u16 / 2) & 0x1f);
        (date, time)
    }

    /// Whether every field is within its calendar range
    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }

    /// Seconds since the Unix epoch, reading the fields as UTC civil time
    pub fn to_unix(&self) -> Option<i64> {
        if !self.is_valid() {
            return None;
        }
        let days = days_from_civil(self.year as i64, self.month as i64, self.day as i64);
        Some(
            days * 86_400
                + self.hour as i64 * 3_600
                + self.minute as i64 * 60
                + self.second as i64,
        )
    }
}

/// Convert a DOS date/time pair to Unix seconds.
///
/// `utc_offset` is the offset (seconds east of UTC) of the clock that stamped
/// the archive; DOS fields carry no zone, so the caller supplies it.
pub fn dos_to_unix(date: u16, time: u16, utc_offset: i64) -> Option<i64> {
    DosDateTime::decode(date, time)
        .to_unix()
        .map(|secs| secs - utc_offset)
}

/// Days since 1970-01-01 for a proleptic Gregorian date
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = if year >= 0 { year } else { year - 399 } / 400;
    let yoe = year - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}
