/// Level of a GELF message.
///
/// GELF reuses the syslog severity scale: 0 is the most severe, 7 is debug
/// output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum Severity {
    EMERG = 0,
    ALERT = 1,
    CRIT = 2,
    ERR = 3,
    WARNING = 4,
    NOTICE = 5,
    INFO = 6,
    DEBUG = 7,
}

/// Convert a GELF level into a `Severity`.
///
/// Senders are free to put any integer into `level`, so anything outside
/// 0..7 is handed back to the caller untouched.
impl TryFrom<i32> for Severity {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let severity = match value {
            0 => Severity::EMERG,
            1 => Severity::ALERT,
            2 => Severity::CRIT,
            3 => Severity::ERR,
            4 => Severity::WARNING,
            5 => Severity::NOTICE,
            6 => Severity::INFO,
            7 => Severity::DEBUG,
            _ => return Err(value),
        };

        Ok(severity)
    }
}

impl Severity {
    /// Short lowercase name of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::EMERG => "emerg",
            Severity::ALERT => "alert",
            Severity::CRIT => "crit",
            Severity::ERR => "err",
            Severity::WARNING => "warning",
            Severity::NOTICE => "notice",
            Severity::INFO => "info",
            Severity::DEBUG => "debug",
        }
    }
}
